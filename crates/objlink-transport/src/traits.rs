use crate::error::Result;

/// Callback invoked with one inbound text payload per call.
pub type MessageHandler = Box<dyn FnMut(String)>;

/// The transport contract required by the object-synchronization layer.
///
/// Implementations must deliver inbound messages in FIFO order, one handler
/// invocation per message, and must not start delivering the next message
/// until the current invocation has returned. Outbound `send` is
/// fire-and-forget: it queues or writes the payload and returns without
/// waiting for any acknowledgement.
pub trait MessageTransport {
    /// Send one text payload to the remote side.
    fn send(&self, payload: &str) -> Result<()>;

    /// Install the inbound-message handler, replacing any previous one.
    ///
    /// Payloads that arrived while no handler was installed must be retained
    /// and delivered (in order) once a handler is present.
    fn set_on_message(&self, handler: MessageHandler);

    /// Remove the inbound-message handler, if any.
    fn clear_on_message(&self);
}
