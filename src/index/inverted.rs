use std::collections::{BTreeMap, HashMap};
use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::Token;
use crate::core::config::IndexDetail;
use crate::core::error::Result;
use crate::core::types::{DocId, Document, FieldValue};
use crate::index::posting::{Posting, PostingList};
use crate::scoring::scorer::TermStats;
use crate::search::prefix::PrefixIndex;

/// Per-document term vectors: field -> term -> frequency
pub type TermVector = BTreeMap<String, BTreeMap<String, u32>>;

/// Inverted index for a single field
#[derive(Default)]
pub struct FieldIndex {
    postings: HashMap<String, PostingList>,
    terms: PrefixIndex,
    field_lengths: HashMap<DocId, u32>,
    doc_count: u32,
    total_tokens: u64,
    /// Stored values, for range queries
    values: Vec<(DocId, FieldValue)>,
}

impl FieldIndex {
    pub fn postings(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    pub fn terms(&self) -> &PrefixIndex {
        &self.terms
    }

    pub fn values(&self) -> &[(DocId, FieldValue)] {
        &self.values
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn field_length(&self, doc_id: DocId) -> u32 {
        self.field_lengths.get(&doc_id).copied().unwrap_or(0)
    }

    pub fn avg_field_length(&self) -> f32 {
        if self.doc_count == 0 {
            0.0
        } else {
            self.total_tokens as f32 / self.doc_count as f32
        }
    }

    /// Scoring statistics for `posting`, a member of a list of `doc_freq` postings.
    pub fn term_stats(&self, posting: &Posting, doc_freq: u32) -> TermStats {
        TermStats {
            term_freq: posting.term_freq,
            doc_freq,
            doc_count: self.doc_count,
            field_length: self.field_length(posting.doc_id),
            avg_field_length: self.avg_field_length(),
        }
    }
}

/// Inverted index over every field of a shard's documents
pub struct InvertedIndex {
    fields: BTreeMap<String, FieldIndex>,
    doc_count: u32,
    detail: IndexDetail,
    term_vectors: Option<BTreeMap<DocId, TermVector>>,
}

impl InvertedIndex {
    pub fn build(
        documents: &[Document],
        analyzer: &Analyzer,
        detail: IndexDetail,
        store_term_vectors: bool,
    ) -> Result<Self> {
        let mut index = InvertedIndex {
            fields: BTreeMap::new(),
            doc_count: documents.len() as u32,
            detail,
            term_vectors: store_term_vectors.then(BTreeMap::new),
        };

        if !detail.is_indexed() {
            return Ok(index);
        }

        let mut postings: BTreeMap<String, HashMap<String, PostingList>> = BTreeMap::new();

        for doc in documents {
            for (name, values) in &doc.fields {
                let tokens = analyzer.analyze_values(values);
                let field = index.fields.entry(name.clone()).or_default();
                field.values.extend(values.iter().map(|v| (doc.id, v.clone())));

                if tokens.is_empty() {
                    continue;
                }

                field.field_lengths.insert(doc.id, tokens.len() as u32);
                field.doc_count += 1;
                field.total_tokens += tokens.len() as u64;

                let mut grouped: BTreeMap<&str, Vec<&Token>> = BTreeMap::new();
                for token in &tokens {
                    grouped.entry(token.text.as_str()).or_default().push(token);
                }

                let field_postings = postings.entry(name.clone()).or_default();
                for (term, occurrences) in &grouped {
                    field_postings
                        .entry(term.to_string())
                        .or_default()
                        .add_posting(Self::posting(doc.id, occurrences, detail));
                }

                if let Some(vectors) = index.term_vectors.as_mut() {
                    let vector = vectors.entry(doc.id).or_default();
                    vector.insert(
                        name.clone(),
                        grouped.iter().map(|(t, occ)| (t.to_string(), occ.len() as u32)).collect(),
                    );
                }
            }
        }

        for (name, field_postings) in postings {
            if let Some(field) = index.fields.get_mut(&name) {
                field.terms = PrefixIndex::build(
                    field_postings.iter().map(|(term, list)| (term.clone(), list.doc_freq())),
                )?;
                field.postings = field_postings;
            }
        }

        Ok(index)
    }

    fn posting(doc_id: DocId, occurrences: &[&Token], detail: IndexDetail) -> Posting {
        Posting {
            doc_id,
            term_freq: if detail.has_freqs() { occurrences.len() as u32 } else { 1 },
            positions: if detail.has_positions() {
                occurrences.iter().map(|t| t.position).collect()
            } else {
                Vec::new()
            },
            offsets: if detail.has_offsets() {
                occurrences.iter().map(|t| (t.offset as u32, t.end_offset() as u32)).collect()
            } else {
                Vec::new()
            },
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldIndex> {
        self.fields.get(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn detail(&self) -> IndexDetail {
        self.detail
    }

    pub fn has_term_vectors(&self) -> bool {
        self.term_vectors.is_some()
    }

    pub fn term_vector(&self, doc_id: DocId) -> Option<&TermVector> {
        self.term_vectors.as_ref().and_then(|v| v.get(&doc_id))
    }

    pub fn term_vectors(&self) -> impl Iterator<Item = (&DocId, &TermVector)> {
        self.term_vectors.iter().flat_map(|v| v.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<Document> {
        vec![
            Document::new(DocId(0)).with_field("_1", "lucene"),
            Document::new(DocId(1)).with_field("_1", "spark"),
            Document::new(DocId(2)).with_field("_1", "lucene spark lucene"),
        ]
    }

    #[test]
    fn test_build_field_postings() {
        let index = InvertedIndex::build(
            &docs(), &Analyzer::standard(), IndexDetail::DocsAndFreqsAndPositionsAndOffsets, false,
        ).unwrap();

        let field = index.field("_1").unwrap();
        let lucene = field.postings("lucene").unwrap();
        assert_eq!(lucene.doc_freq(), 2);

        let posting = lucene.get(DocId(2)).unwrap();
        assert_eq!(posting.term_freq, 2);
        assert_eq!(posting.positions, vec![0, 2]);
        assert_eq!(posting.offsets[0], (0, 6));

        assert_eq!(field.doc_count(), 3);
        assert_eq!(field.field_length(DocId(2)), 3);
        assert!((field.avg_field_length() - 5.0 / 3.0).abs() < 1e-6);
        assert_eq!(field.terms().search_prefix("luc"), vec!["lucene"]);
    }

    #[test]
    fn test_docs_only_detail_drops_freqs_and_positions() {
        let index = InvertedIndex::build(&docs(), &Analyzer::standard(), IndexDetail::Docs, false).unwrap();
        let posting = index.field("_1").unwrap().postings("lucene").unwrap().get(DocId(2)).unwrap().clone();
        assert_eq!(posting.term_freq, 1);
        assert!(posting.positions.is_empty());
    }

    #[test]
    fn test_unindexed_detail_has_no_fields() {
        let index = InvertedIndex::build(&docs(), &Analyzer::standard(), IndexDetail::None, true).unwrap();
        assert!(index.field("_1").is_none());
        assert_eq!(index.doc_count(), 3);
    }

    #[test]
    fn test_term_vectors() {
        let index = InvertedIndex::build(&docs(), &Analyzer::standard(), IndexDetail::Docs, true).unwrap();
        assert!(index.has_term_vectors());
        let vector = index.term_vector(DocId(2)).unwrap();
        assert_eq!(vector["_1"]["lucene"], 2);
        assert_eq!(index.term_vectors().count(), 3);
    }
}
