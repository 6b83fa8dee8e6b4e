//! In-process loopback transport.
//!
//! Two endpoints joined back to back. Sending on one side enqueues the
//! payload on the other and drains that side's queue run-to-completion:
//! a message sent from inside a handler is queued and delivered only after
//! the current handler invocation returns. Single-threaded by construction.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::error::{Result, TransportError};
use crate::traits::{MessageHandler, MessageTransport};

/// Create a connected pair of loopback endpoints.
pub fn pair() -> (LoopbackEndpoint, LoopbackEndpoint) {
    let a = Rc::new(RefCell::new(EndpointState::default()));
    let b = Rc::new(RefCell::new(EndpointState::default()));
    a.borrow_mut().peer = Rc::downgrade(&b);
    b.borrow_mut().peer = Rc::downgrade(&a);
    (LoopbackEndpoint { state: a }, LoopbackEndpoint { state: b })
}

#[derive(Default)]
struct EndpointState {
    peer: Weak<RefCell<EndpointState>>,
    handler: Option<MessageHandler>,
    queue: VecDeque<String>,
    delivering: bool,
    closed: bool,
}

/// One side of an in-process transport pair.
///
/// Cloning yields another handle to the same endpoint.
#[derive(Clone)]
pub struct LoopbackEndpoint {
    state: Rc<RefCell<EndpointState>>,
}

impl LoopbackEndpoint {
    /// Close this endpoint. Further sends from either side fail and any
    /// queued undelivered payloads are discarded.
    pub fn close(&self) {
        let mut state = self.state.borrow_mut();
        state.closed = true;
        let dropped = state.queue.len();
        state.queue.clear();
        state.handler = None;
        if dropped > 0 {
            tracing::debug!(dropped, "loopback endpoint closed with queued payloads");
        }
    }

    /// Number of payloads queued but not yet delivered on this endpoint.
    pub fn queued(&self) -> usize {
        self.state.borrow().queue.len()
    }
}

impl MessageTransport for LoopbackEndpoint {
    fn send(&self, payload: &str) -> Result<()> {
        let peer = {
            let state = self.state.borrow();
            if state.closed {
                return Err(TransportError::Closed);
            }
            state.peer.upgrade().ok_or(TransportError::Disconnected)?
        };
        {
            let mut peer_state = peer.borrow_mut();
            if peer_state.closed {
                return Err(TransportError::Disconnected);
            }
            peer_state.queue.push_back(payload.to_string());
        }
        deliver(&peer);
        Ok(())
    }

    fn set_on_message(&self, handler: MessageHandler) {
        self.state.borrow_mut().handler = Some(handler);
        // Flush anything that arrived before a handler was installed.
        deliver(&self.state);
    }

    fn clear_on_message(&self) {
        self.state.borrow_mut().handler = None;
    }
}

/// Drain the endpoint's queue, one payload at a time.
///
/// The handler is taken out of the state while it runs so no `RefCell`
/// borrow is held across the invocation; the handler is therefore free to
/// send, close, or replace itself. The `delivering` flag makes nested calls
/// (from a send inside the handler) return immediately, which is what turns
/// synchronous echoes into queued FIFO deliveries.
fn deliver(state: &Rc<RefCell<EndpointState>>) {
    loop {
        let (mut handler, payload) = {
            let mut ep = state.borrow_mut();
            if ep.delivering || ep.closed {
                return;
            }
            let Some(handler) = ep.handler.take() else {
                return;
            };
            let Some(payload) = ep.queue.pop_front() else {
                ep.handler = Some(handler);
                return;
            };
            ep.delivering = true;
            (handler, payload)
        };

        handler(payload);

        let mut ep = state.borrow_mut();
        ep.delivering = false;
        // If the handler replaced itself mid-delivery, the replacement wins.
        if ep.handler.is_none() && !ep.closed {
            ep.handler = Some(handler);
        }
    }
}
