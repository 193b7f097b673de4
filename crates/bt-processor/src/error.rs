use thiserror::Error;

use bt_transport::TransportError;

/// Failure of one aggregate-store write.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Why one message was not fully processed.  None of these stop a worker.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("republish failed: {0}")]
    Republish(#[from] TransportError),
}
