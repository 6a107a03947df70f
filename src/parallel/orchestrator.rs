use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;
use crate::aggregate::monoid::Monoid;
use crate::core::cancel::CancellationToken;
use crate::core::error::{Error, ErrorKind, Result};

/// Fans an operation out to every shard slot on a dedicated worker pool and
/// folds the per-shard results with their monoid.
pub struct Orchestrator {
    pool: ThreadPool,
    parallelism: usize,
}

impl Orchestrator {
    pub fn new(parallelism: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|i| format!("shard-worker-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal, format!("worker pool: {}", e)))?;

        debug!(parallelism, "Started shard worker pool");
        Ok(Orchestrator { pool, parallelism })
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Apply `op` to every slot and combine the results. The first shard
    /// error fails the whole query; no partial result is returned.
    /// A cancelled token fails the query even if every shard finished.
    pub fn query_all<S, M, F>(&self, slots: &[S], op: F) -> Result<M>
    where
        S: Sync,
        M: Monoid + Send,
        F: Fn(&S) -> Result<M> + Sync,
    {
        self.query_all_with(slots, op, &CancellationToken::new())
    }

    pub fn query_all_with<S, M, F>(&self, slots: &[S], op: F, token: &CancellationToken) -> Result<M>
    where
        S: Sync,
        M: Monoid + Send,
        F: Fn(&S) -> Result<M> + Sync,
    {
        if slots.is_empty() {
            return Err(Error::empty_dataset());
        }

        self.pool.install(|| {
            slots
                .par_iter()
                .map(|slot| {
                    token.check()?;
                    let partial = op(slot)?;
                    token.check()?;
                    Ok(partial)
                })
                .try_reduce(M::identity, |a, b| {
                    token.check()?;
                    Ok(a.combine(b))
                })
        })
        .and_then(|combined| {
            token.check()?;
            Ok(combined)
        })
    }

    /// True as soon as any slot answers true; remaining shards may be skipped.
    pub fn any<S, F>(&self, slots: &[S], predicate: F) -> Result<bool>
    where
        S: Sync,
        F: Fn(&S) -> Result<bool> + Sync,
    {
        if slots.is_empty() {
            return Err(Error::empty_dataset());
        }

        let found = self.pool.install(|| {
            slots
                .par_iter()
                .map(|slot| predicate(slot))
                .find_any(|answer| !matches!(answer, Ok(false)))
        });

        match found {
            Some(answer) => answer,
            None => Ok(false),
        }
    }

    /// Apply `f` to every slot, keeping slot order.
    pub fn map_all<S, T, F>(&self, slots: &[S], f: F) -> Result<Vec<T>>
    where
        S: Sync,
        T: Send,
        F: Fn(&S) -> Result<T> + Sync,
    {
        self.pool.install(|| slots.par_iter().map(|slot| f(slot)).collect())
    }
}
