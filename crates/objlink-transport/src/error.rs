/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// This endpoint has been closed locally.
    #[error("transport endpoint closed")]
    Closed,

    /// The remote endpoint is gone.
    #[error("peer endpoint disconnected")]
    Disconnected,

    /// An I/O error occurred on the underlying transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
