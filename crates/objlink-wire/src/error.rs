/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The `type` discriminant is not a known message kind.
    #[error("unknown message kind {0}")]
    UnknownKind(u8),

    /// A known kind arrived without a field it requires.
    #[error("message kind {kind} missing required field '{field}'")]
    MissingField {
        kind: u8,
        field: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, WireError>;
