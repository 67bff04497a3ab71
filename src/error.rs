//! Error types for the timer engine and its persistence layer

use thiserror::Error;

/// Errors returned synchronously by engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// `start()` was called without a usable session identifier
    #[error("session id is missing")]
    MissingSessionId,

    /// A timestamp could not be parsed
    #[error("invalid {field} timestamp: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    /// The session ends before it starts
    #[error("session end time precedes its start time")]
    EndBeforeStart,

    /// The engine was constructed outside a Tokio runtime
    #[error("timer engine must be created inside a Tokio runtime")]
    NoRuntime,
}

/// Errors raised by a [`TimerStore`](crate::services::TimerStore) on write or delete
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
