use crate::core::config::{IndexConfig, Similarity};

/// Statistics for one (term, document) pair within one field of one shard.
#[derive(Debug, Clone, Copy)]
pub struct TermStats {
    pub term_freq: u32,
    pub doc_freq: u32,        // docs in the shard containing the term in this field
    pub doc_count: u32,       // docs in the shard that have the field at all
    pub field_length: u32,    // tokens in this document's field
    pub avg_field_length: f32,
}

/// Scorer trait
pub trait Scorer: Send + Sync {
    fn score(&self, stats: &TermStats) -> f32;

    fn name(&self) -> &str;
}

/// Classic TF-IDF: sqrt(tf) * idf^2 * length norm
pub struct TfIdfScorer {
    pub normalize: bool,
}

impl TfIdfScorer {
    pub fn new(normalize: bool) -> Self {
        TfIdfScorer { normalize }
    }

    fn idf(doc_freq: u32, doc_count: u32) -> f32 {
        1.0 + ((doc_count as f32 + 1.0) / (doc_freq as f32 + 1.0)).ln()
    }
}

impl Scorer for TfIdfScorer {
    fn score(&self, stats: &TermStats) -> f32 {
        let tf = (stats.term_freq as f32).sqrt();
        let idf = Self::idf(stats.doc_freq, stats.doc_count);
        let norm = if self.normalize && stats.field_length > 0 {
            1.0 / (stats.field_length as f32).sqrt()
        } else {
            1.0
        };

        tf * idf * idf * norm
    }

    fn name(&self) -> &str {
        "tfidf"
    }
}

/// BM25 Scorer
pub struct BM25Scorer {
    pub k1: f32,  // Term frequency saturation (default: 1.2)
    pub b: f32,   // Length normalization strength (default: 0.75)
}

impl Default for BM25Scorer {
    fn default() -> Self {
        BM25Scorer {
            k1: 1.2,
            b: 0.75,
        }
    }
}

impl BM25Scorer {
    /// Always positive, even when every document contains the term.
    fn idf(doc_freq: u32, doc_count: u32) -> f32 {
        let n = doc_count as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }
}

impl Scorer for BM25Scorer {
    fn score(&self, stats: &TermStats) -> f32 {
        let tf = stats.term_freq as f32;
        let doc_len = stats.field_length as f32;
        let avg_doc_len = if stats.avg_field_length > 0.0 { stats.avg_field_length } else { 1.0 };

        let numerator = Self::idf(stats.doc_freq, stats.doc_count) * tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * (1.0 - self.b + self.b * (doc_len / avg_doc_len));

        numerator / denominator
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

pub fn scorer_for(config: &IndexConfig) -> Box<dyn Scorer> {
    match config.similarity {
        Similarity::Bm25 => {
            let b = if config.omit_norms { 0.0 } else { 0.75 };
            Box::new(BM25Scorer { b, ..BM25Scorer::default() })
        }
        Similarity::TfIdf => Box::new(TfIdfScorer::new(!config.omit_norms)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(term_freq: u32, field_length: u32) -> TermStats {
        TermStats {
            term_freq,
            doc_freq: 2,
            doc_count: 3,
            field_length,
            avg_field_length: 4.0 / 3.0,
        }
    }

    #[test]
    fn test_bm25_prefers_shorter_fields() {
        let scorer = BM25Scorer::default();
        assert!(scorer.score(&stats(1, 1)) > scorer.score(&stats(1, 2)));
    }

    #[test]
    fn test_bm25_idf_positive_when_term_everywhere() {
        let scorer = BM25Scorer::default();
        let s = TermStats { term_freq: 1, doc_freq: 1, doc_count: 1, field_length: 1, avg_field_length: 1.0 };
        assert!(scorer.score(&s) > 0.0);
    }

    #[test]
    fn test_omit_norms_ignores_length() {
        let config = IndexConfig { omit_norms: true, ..IndexConfig::default() };
        let scorer = scorer_for(&config);
        assert_eq!(scorer.score(&stats(1, 1)), scorer.score(&stats(1, 9)));

        let config = IndexConfig { omit_norms: true, similarity: Similarity::TfIdf, ..IndexConfig::default() };
        let scorer = scorer_for(&config);
        assert_eq!(scorer.name(), "tfidf");
        assert_eq!(scorer.score(&stats(1, 1)), scorer.score(&stats(1, 9)));
    }
}
