use thiserror::Error;

#[derive(Debug, Error)]
pub enum FanoutError {
    /// Writing to one observer failed; only that observer is affected.
    #[error("delivery to observer {observer} failed: {reason}")]
    Delivery { observer: String, reason: String },

    /// The client connected but never completed the WebSocket upgrade.
    #[error("WebSocket handshake with {observer} failed: {reason}")]
    Handshake { observer: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type FanoutResult<T> = Result<T, FanoutError>;
