use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection-level failure; callers retry with backoff.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("partition {partition} does not exist on topic {topic:?} ({count} partitions)")]
    NoSuchPartition {
        topic:     String,
        partition: u32,
        count:     u32,
    },

    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// `true` for failures worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Unavailable(_))
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
