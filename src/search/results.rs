use std::collections::BinaryHeap;
use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use crate::aggregate::monoid::Monoid;
use crate::core::types::DocId;

/// Document with relevance score, local to one engine
#[derive(Debug, Clone, Copy)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f32,
}

impl ScoredDoc {
    pub fn new(doc_id: DocId, score: f32) -> Self {
        ScoredDoc { doc_id, score }
    }

    /// `Less` means ranked first: higher score, then lower doc id.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other.score.total_cmp(&self.score)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

// Ord puts the worst-ranked document on top of the max-heap
impl PartialEq for ScoredDoc {
    fn eq(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredDoc {}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank_cmp(other)
    }
}

/// Top-K collector for efficient result collection
pub struct TopKCollector {
    heap: BinaryHeap<ScoredDoc>,
    k: usize,
    total_collected: usize,
}

impl TopKCollector {
    pub fn new(k: usize) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            k,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, scored_doc: ScoredDoc) {
        self.total_collected += 1;

        if self.k == 0 {
            return;
        }

        if self.heap.len() < self.k {
            self.heap.push(scored_doc);
        } else if let Some(worst) = self.heap.peek() {
            if scored_doc.rank_cmp(worst) == Ordering::Less {
                self.heap.pop();
                self.heap.push(scored_doc);
            }
        }
    }

    pub fn total_collected(&self) -> usize {
        self.total_collected
    }

    /// Best first
    pub fn into_sorted_vec(self) -> Vec<ScoredDoc> {
        self.heap.into_sorted_vec()
    }
}

/// A scored record tagged with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch<R> {
    pub score: f32,
    pub partition: u32,
    pub doc_id: DocId,
    pub record: R,
}

impl<R> ScoredMatch<R> {
    pub fn new(score: f32, partition: u32, doc_id: DocId, record: R) -> Self {
        ScoredMatch { score, partition, doc_id, record }
    }

    /// Total order used everywhere results are merged: score descending,
    /// then (partition, doc id) ascending.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other.score.total_cmp(&self.score)
            .then_with(|| self.partition.cmp(&other.partition))
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

/// Bounded, ordered collection of at most `top_k` scored records.
///
/// Combining two sets keeps the best `max(k1, k2)` elements of their union,
/// which is associative and commutative, so shard results may be merged in
/// any grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResults<R> {
    top_k: usize,
    matches: Vec<ScoredMatch<R>>,
}

impl<R> RankedResults<R> {
    pub fn new(top_k: usize) -> Self {
        RankedResults { top_k, matches: Vec::new() }
    }

    pub fn from_matches(top_k: usize, mut matches: Vec<ScoredMatch<R>>) -> Self {
        matches.sort_by(ScoredMatch::rank_cmp);
        matches.truncate(top_k);
        RankedResults { top_k, matches }
    }

    /// Bounded insert. Once full, an element is kept only if it ranks
    /// ahead of the current last element, which it then evicts.
    ///
    /// Ranking is the same total order `combine` uses, so an element with
    /// a score equal to the minimum still evicts the last one when its
    /// (partition, doc id) is smaller. Inserting and combining the same
    /// elements therefore keep the same set.
    pub fn insert(&mut self, item: ScoredMatch<R>) -> bool {
        if self.top_k == 0 {
            return false;
        }

        if self.matches.len() >= self.top_k {
            match self.matches.last() {
                Some(last) if item.rank_cmp(last) == Ordering::Less => {
                    self.matches.pop();
                }
                _ => return false,
            }
        }

        let pos = self.matches
            .binary_search_by(|existing| existing.rank_cmp(&item))
            .unwrap_or_else(|pos| pos);
        self.matches.insert(pos, item);
        true
    }

    /// Re-bound to `top_k`, dropping anything past it.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.matches.truncate(top_k);
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.matches.len() >= self.top_k
    }

    pub fn min_score(&self) -> Option<f32> {
        self.matches.last().map(|m| m.score)
    }

    pub fn max_score(&self) -> Option<f32> {
        self.matches.first().map(|m| m.score)
    }

    pub fn matches(&self) -> &[ScoredMatch<R>] {
        &self.matches
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredMatch<R>> {
        self.matches.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.matches.iter().map(|m| &m.record)
    }

    pub fn into_records(self) -> Vec<R> {
        self.matches.into_iter().map(|m| m.record).collect()
    }

    pub fn into_matches(self) -> Vec<ScoredMatch<R>> {
        self.matches
    }
}

impl<R> Monoid for RankedResults<R> {
    fn identity() -> Self {
        RankedResults::new(0)
    }

    fn combine(self, other: Self) -> Self {
        let top_k = self.top_k.max(other.top_k);
        let mut merged = Vec::with_capacity((self.matches.len() + other.matches.len()).min(top_k));

        let mut left = self.matches.into_iter().peekable();
        let mut right = other.matches.into_iter().peekable();

        while merged.len() < top_k {
            let take_left = match (left.peek(), right.peek()) {
                (Some(l), Some(r)) => l.rank_cmp(r) != Ordering::Greater,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            let next = if take_left { left.next() } else { right.next() };
            if let Some(item) = next {
                merged.push(item);
            }
        }

        RankedResults { top_k, matches: merged }
    }
}

impl<R> IntoIterator for RankedResults<R> {
    type Item = ScoredMatch<R>;
    type IntoIter = std::vec::IntoIter<ScoredMatch<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}
