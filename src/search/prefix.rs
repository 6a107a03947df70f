use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use regex::Regex;
use crate::core::error::Result;

/// FST-based term dictionary for one field, used to expand prefix,
/// wildcard and fuzzy queries into concrete terms.
pub struct PrefixIndex {
    /// term -> document frequency
    fst: Map<Vec<u8>>,
}

impl Default for PrefixIndex {
    fn default() -> Self {
        Self { fst: Map::default() }
    }
}

impl PrefixIndex {
    /// Build FST from terms
    pub fn build<I>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        let mut sorted_terms: Vec<(String, u32)> = terms.into_iter().collect();

        // FST requires sorted, deduplicated input
        sorted_terms.sort_by(|a, b| a.0.cmp(&b.0));
        sorted_terms.dedup_by(|a, b| a.0 == b.0);

        let mut builder = MapBuilder::memory();
        for (term, freq) in sorted_terms {
            builder.insert(term.as_bytes(), freq as u64)?;
        }

        Ok(Self { fst: builder.into_map() })
    }

    pub fn len(&self) -> usize {
        self.fst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fst.is_empty()
    }

    /// Find all terms with given prefix
    pub fn search_prefix(&self, prefix: &str) -> Vec<String> {
        let mut results = Vec::new();
        let prefix_bytes = prefix.as_bytes();

        let mut stream = self.fst.range().ge(prefix_bytes).into_stream();

        while let Some((term_bytes, _freq)) = stream.next() {
            if !term_bytes.starts_with(prefix_bytes) {
                break;
            }

            if let Ok(term) = std::str::from_utf8(term_bytes) {
                results.push(term.to_string());
            }
        }

        results
    }

    /// Terms matching a `*` / `?` wildcard pattern
    pub fn search_wildcard(&self, pattern: &str) -> Result<Vec<String>> {
        // Simple case: prefix wildcard "prog*"
        if let Some(stem) = pattern.strip_suffix('*') {
            if !stem.contains(['*', '?']) {
                return Ok(self.search_prefix(stem));
            }
        }

        let regex = wildcard_regex(pattern)?;
        Ok(self.terms_where(|term| regex.is_match(term)))
    }

    /// Every term accepted by `predicate`, in lexicographic order.
    pub fn terms_where<F>(&self, mut predicate: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let mut results = Vec::new();
        let mut stream = self.fst.stream();

        while let Some((term_bytes, _)) = stream.next() {
            if let Ok(term) = std::str::from_utf8(term_bytes) {
                if predicate(term) {
                    results.push(term.to_string());
                }
            }
        }

        results
    }
}

/// Anchored regex for a wildcard pattern: `*` any run, `?` one char.
pub fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let mut regex_pattern = String::with_capacity(pattern.len() + 8);
    regex_pattern.push('^');

    for ch in pattern.chars() {
        match ch {
            '*' => regex_pattern.push_str(".*"),
            '?' => regex_pattern.push('.'),
            other => regex_pattern.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
        }
    }

    regex_pattern.push('$');
    Ok(Regex::new(&regex_pattern)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> PrefixIndex {
        PrefixIndex::build(vec![
            ("lucene".to_string(), 2),
            ("lucid".to_string(), 1),
            ("spark".to_string(), 3),
            ("sparkle".to_string(), 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_prefix_search() {
        let idx = index();
        assert_eq!(idx.search_prefix("luc"), vec!["lucene", "lucid"]);
        assert_eq!(idx.search_prefix("spark"), vec!["spark", "sparkle"]);
        assert!(idx.search_prefix("x").is_empty());
    }

    #[test]
    fn test_wildcard_search() {
        let idx = index();
        assert_eq!(idx.search_wildcard("sp?rk").unwrap(), vec!["spark"]);
        assert_eq!(idx.search_wildcard("*e").unwrap(), vec!["lucene", "sparkle"]);
        assert_eq!(idx.search_wildcard("luc*").unwrap(), vec!["lucene", "lucid"]);
    }

    #[test]
    fn test_wildcard_regex_escapes_metacharacters() {
        let re = wildcard_regex("a.b*").unwrap();
        assert!(re.is_match("a.bc"));
        assert!(!re.is_match("axbc"));
    }
}
