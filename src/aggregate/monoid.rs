use std::collections::BTreeSet;

/// An associative combine with an identity element.
///
/// Per-shard partial results are folded with `combine` in whatever order
/// the worker pool finishes them, so implementations must also be
/// commutative for results to be deterministic.
pub trait Monoid: Sized {
    fn identity() -> Self;

    fn combine(self, other: Self) -> Self;

    fn combine_all<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        items.into_iter().fold(Self::identity(), Self::combine)
    }
}

/// Counts add up.
impl Monoid for usize {
    fn identity() -> Self {
        0
    }

    fn combine(self, other: Self) -> Self {
        self + other
    }
}

/// Field-name sets union.
impl Monoid for BTreeSet<String> {
    fn identity() -> Self {
        BTreeSet::new()
    }

    fn combine(mut self, mut other: Self) -> Self {
        if self.len() < other.len() {
            std::mem::swap(&mut self, &mut other);
        }
        self.extend(other);
        self
    }
}
