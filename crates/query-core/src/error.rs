use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Cache configuration error: {0}")]
    CacheConfiguration(String),

    #[error("Executor closed: {0}")]
    ExecutorClosed(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Couldn't get a lock in {timeout_ms}ms for the key {key} at the cache {cache_id}")]
    LockTimeout {
        key: String,
        cache_id: String,
        timeout_ms: u64,
    },

    #[error("Result extraction error: {0}")]
    ResultExtraction(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl QueryError {
    /// Shorthand for a configuration failure raised while assembling a cache.
    pub fn config(message: impl Into<String>) -> Self {
        QueryError::CacheConfiguration(message.into())
    }

    /// Whether the error came from calling into a closed executor.
    pub fn is_closed(&self) -> bool {
        matches!(self, QueryError::ExecutorClosed(_))
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
