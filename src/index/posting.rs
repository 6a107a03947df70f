use crate::core::types::DocId;

#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: u32,            // 1 when frequencies are not indexed
    pub positions: Vec<u32>,       // Empty unless positions are indexed
    pub offsets: Vec<(u32, u32)>,  // (start, end) byte offsets, when indexed
}

/// Posting list for a term
/// Note: Sorted by doc_id
#[derive(Debug, Clone, Default)]
pub struct PostingList {
    pub postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    pub fn add_posting(&mut self, posting: Posting) {
        match self.postings.binary_search_by_key(&posting.doc_id, |p| p.doc_id) {
            Ok(pos) => {
                self.postings[pos] = posting;
            }
            Err(pos) => {
                self.postings.insert(pos, posting);
            }
        }
    }

    pub fn get(&self, doc_id: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|pos| &self.postings[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Posting> {
        self.postings.iter()
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn total_freq(&self) -> u64 {
        self.postings.iter().map(|p| p.term_freq as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(doc: u32, freq: u32) -> Posting {
        Posting { doc_id: DocId(doc), term_freq: freq, positions: Vec::new(), offsets: Vec::new() }
    }

    #[test]
    fn test_postings_stay_sorted() {
        let mut list = PostingList::new();
        list.add_posting(posting(5, 1));
        list.add_posting(posting(1, 2));
        list.add_posting(posting(3, 1));
        let docs: Vec<u32> = list.iter().map(|p| p.doc_id.0).collect();
        assert_eq!(docs, vec![1, 3, 5]);
        assert_eq!(list.doc_freq(), 3);
        assert_eq!(list.total_freq(), 4);
    }

    #[test]
    fn test_get_and_replace() {
        let mut list = PostingList::new();
        list.add_posting(posting(2, 1));
        list.add_posting(posting(2, 7));
        assert_eq!(list.len(), 1);
        assert_eq!(list.get(DocId(2)).map(|p| p.term_freq), Some(7));
        assert!(list.get(DocId(9)).is_none());
    }
}
