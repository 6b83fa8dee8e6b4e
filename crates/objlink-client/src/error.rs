/// Errors surfaced to callers of the client layer.
///
/// Protocol anomalies in host traffic (unknown ids, unknown objects,
/// malformed messages) are deliberately *not* here: those are logged and
/// dropped by the dispatcher, which keeps running.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] objlink_transport::TransportError),

    /// Wire encode/decode error on an outbound message.
    #[error("wire error: {0}")]
    Wire(#[from] objlink_wire::WireError),

    /// The channel has been closed; no further traffic is possible.
    #[error("channel closed")]
    Closed,

    /// The object's metadata does not list this method.
    #[error("object '{object}' has no method '{method}'")]
    UnknownMethod { object: String, method: String },

    /// The object's metadata does not list this property.
    #[error("object '{object}' has no property '{property}'")]
    UnknownProperty { object: String, property: String },

    /// The object's metadata does not list this signal.
    #[error("object '{object}' has no signal '{signal}'")]
    UnknownSignal { object: String, signal: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;
