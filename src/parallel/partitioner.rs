use serde::{Deserialize, Serialize};

/// How records are spread over partitions when a dataset is built from a
/// flat record list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partitioner {
    /// Record i goes to partition i mod n
    #[default]
    RoundRobin,
    /// Consecutive runs of near-equal size
    Contiguous,
}

impl Partitioner {
    /// Always returns exactly `partitions` lists, some possibly empty.
    pub fn split<R>(&self, records: Vec<R>, partitions: usize) -> Vec<Vec<R>> {
        if partitions == 0 {
            return Vec::new();
        }

        let mut out: Vec<Vec<R>> = (0..partitions).map(|_| Vec::new()).collect();
        match self {
            Partitioner::RoundRobin => {
                for (i, record) in records.into_iter().enumerate() {
                    out[i % partitions].push(record);
                }
            }
            Partitioner::Contiguous => {
                let total = records.len();
                let base = total / partitions;
                let extra = total % partitions;
                let mut iter = records.into_iter();
                for (i, part) in out.iter_mut().enumerate() {
                    let size = base + usize::from(i < extra);
                    part.extend(iter.by_ref().take(size));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let parts = Partitioner::RoundRobin.split((0..5).collect(), 2);
        assert_eq!(parts, vec![vec![0, 2, 4], vec![1, 3]]);
    }

    #[test]
    fn test_contiguous() {
        let parts = Partitioner::Contiguous.split((0..5).collect(), 3);
        assert_eq!(parts, vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn test_more_partitions_than_records() {
        let parts = Partitioner::RoundRobin.split(vec!["a"], 3);
        assert_eq!(parts.len(), 3);
        assert!(parts[1].is_empty() && parts[2].is_empty());
        assert!(Partitioner::Contiguous.split(vec!["a"], 0).is_empty());
    }
}
