pub mod orchestrator;
pub mod partitioner;

pub use crate::core::cancel::CancellationToken;
pub use orchestrator::Orchestrator;
pub use partitioner::Partitioner;
