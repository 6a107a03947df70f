pub mod handle;

pub use handle::{Dataset, DatasetBuilder, DatasetState, StorageLevel};
