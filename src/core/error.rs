use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Query text could not be parsed.
    QuerySyntax,
    /// Distributed operation over a dataset with zero partitions.
    EmptyDataset,
    ClosedShard,
    ClosedDataset,
    /// Unrecognized or inconsistent configuration value.
    Configuration,
    InvalidArgument,
    UnsupportedQuery,
    InvalidState,
    Cancelled,
    Internal,
}

#[derive(Debug, Error)]
#[error("{kind:?}: {context}")]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }

    pub fn query_syntax(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::QuerySyntax, context)
    }

    pub fn empty_dataset() -> Self {
        Error::new(ErrorKind::EmptyDataset, "dataset has no partitions")
    }

    pub fn closed_shard(partition: u32) -> Self {
        Error::new(ErrorKind::ClosedShard, format!("shard {} is closed", partition))
    }

    pub fn closed_dataset() -> Self {
        Error::new(ErrorKind::ClosedDataset, "dataset has been closed")
    }

    pub fn configuration(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Configuration, context)
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, context)
    }

    pub fn cancelled() -> Self {
        Error::new(ErrorKind::Cancelled, "query cancelled")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// None of these failures are retried by the core: a logic failure stays a
    /// failure, and lost partitions are recomputed by whoever schedules them.
    pub fn is_retriable(&self) -> bool {
        false
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::configuration(err.to_string())
    }
}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        Error::new(ErrorKind::Internal, format!("FST error: {}", err))
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::query_syntax(format!("invalid pattern: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
