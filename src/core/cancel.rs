use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use crate::core::error::{Error, Result};

/// Cooperative cancellation flag shared between a caller and the shard
/// workers of one query. Workers check it before a shard starts, between
/// query clauses and fields, and again before their result is combined.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::cancelled())
        } else {
            Ok(())
        }
    }
}
