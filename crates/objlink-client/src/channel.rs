//! The channel: correlation, registry, and the single inbound dispatcher.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use objlink_transport::MessageTransport;
use objlink_wire::{Message, ObjectDescriptor};
use serde_json::Value;

use crate::error::{ClientError, Result};
use crate::proxy::ObjectProxy;

/// Completion callback for one correlated method invocation.
pub type ResponseCallback = Box<dyn FnOnce(Value)>;

type ReadyCallback = Box<dyn FnOnce(&Channel)>;

struct ChannelCore {
    transport: Rc<dyn MessageTransport>,
    /// Correlation id → completion callback. An entry is removed exactly
    /// once, when its response arrives, and removal happens before the
    /// callback runs.
    pending: HashMap<u64, ResponseCallback>,
    /// Pre-incremented; the first id on the wire is 1. Never reused.
    next_call_id: u64,
    objects: HashMap<String, ObjectProxy>,
    on_ready: Option<ReadyCallback>,
    ready: bool,
    closed: bool,
}

/// A session with a remote-object host over one transport.
///
/// Cloning yields another handle to the same session. All state lives on a
/// single logical thread of control: the dispatcher and outbound calls
/// never run concurrently, so no locking is involved.
#[derive(Clone)]
pub struct Channel {
    core: Rc<RefCell<ChannelCore>>,
}

/// Weak back-reference handed to proxies for their outbound traffic.
///
/// Weak so that a proxy kept alive by the application does not keep the
/// whole session alive; outbound operations after the channel is gone
/// report [`ClientError::Closed`].
#[derive(Clone)]
pub(crate) struct ChannelLink {
    core: Weak<RefCell<ChannelCore>>,
}

impl Channel {
    /// Open a channel: register as the transport's message handler and send
    /// the initialization request.
    ///
    /// `on_ready` fires exactly once, after the host's object map has been
    /// received and every proxy constructed. If the initial send fails the
    /// handler is unregistered again and construction is aborted.
    pub fn open(
        transport: Rc<dyn MessageTransport>,
        on_ready: impl FnOnce(&Channel) + 'static,
    ) -> Result<Channel> {
        let core = Rc::new(RefCell::new(ChannelCore {
            transport: transport.clone(),
            pending: HashMap::new(),
            next_call_id: 0,
            objects: HashMap::new(),
            on_ready: Some(Box::new(on_ready)),
            ready: false,
            closed: false,
        }));

        let weak = Rc::downgrade(&core);
        transport.set_on_message(Box::new(move |payload| {
            if let Some(core) = weak.upgrade() {
                Channel { core }.dispatch(&payload);
            }
        }));

        let channel = Channel { core };
        if let Err(err) = channel.send(&Message::InitRequest) {
            transport.clear_on_message();
            return Err(err);
        }
        Ok(channel)
    }

    /// True once the host's object map has been processed.
    pub fn is_ready(&self) -> bool {
        self.core.borrow().ready
    }

    /// Look up a proxy by object name.
    pub fn object(&self, name: &str) -> Option<ObjectProxy> {
        self.core.borrow().objects.get(name).cloned()
    }

    /// Names of all registered objects, sorted.
    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.core.borrow().objects.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tear the session down: unregister the transport handler, drop every
    /// pending call, and clear the object registry. Idempotent. Outbound
    /// operations afterwards return [`ClientError::Closed`].
    pub fn close(&self) {
        let (transport, dropped) = {
            let mut core = self.core.borrow_mut();
            if core.closed {
                return;
            }
            core.closed = true;
            core.objects.clear();
            core.on_ready = None;
            let pending = std::mem::take(&mut core.pending);
            (core.transport.clone(), pending.len())
        };
        transport.clear_on_message();
        if dropped > 0 {
            tracing::warn!(dropped, "channel closed with unresolved calls");
        }
    }

    pub(crate) fn link(&self) -> ChannelLink {
        ChannelLink {
            core: Rc::downgrade(&self.core),
        }
    }

    /// Allocate a correlation id and send a call-request.
    ///
    /// Without a callback no pending entry is created: the eventual
    /// response, if any, is dropped with the benign unknown-id warning.
    pub(crate) fn invoke_method(
        &self,
        object: &str,
        method: i32,
        args: Vec<Value>,
        callback: Option<ResponseCallback>,
    ) -> Result<()> {
        let id = {
            let mut core = self.core.borrow_mut();
            if core.closed {
                return Err(ClientError::Closed);
            }
            core.next_call_id += 1;
            let id = core.next_call_id;
            if let Some(callback) = callback {
                core.pending.insert(id, callback);
            }
            id
        };

        let message = Message::InvokeMethod {
            id,
            object: object.to_string(),
            method,
            args,
        };
        if let Err(err) = self.send(&message) {
            // A call that never left the process must not stay pending.
            self.core.borrow_mut().pending.remove(&id);
            return Err(err);
        }
        Ok(())
    }

    /// Send a property-write request. No correlation id, and no local cache
    /// mutation: confirmed state only ever arrives via update batches.
    pub(crate) fn set_property(&self, object: &str, property: &str, value: Value) -> Result<()> {
        if self.core.borrow().closed {
            return Err(ClientError::Closed);
        }
        self.send(&Message::PropertyWrite {
            object: object.to_string(),
            property: property.to_string(),
            value,
        })
    }

    fn send(&self, message: &Message) -> Result<()> {
        let transport = self.core.borrow().transport.clone();
        let text = message.encode()?;
        transport.send(&text)?;
        Ok(())
    }

    /// Handle one inbound payload. Invoked by the transport, one message at
    /// a time; anomalies are logged and dropped, never fatal.
    fn dispatch(&self, payload: &str) {
        let message = match Message::decode(payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::error!(error = %err, "dropping undecodable message");
                return;
            }
        };

        match message {
            Message::SignalEmission {
                object,
                signal,
                args,
            } => self.handle_signal(&object, signal, &args),
            Message::Response { id, data } => self.handle_response(id, data),
            Message::PropertyUpdateBatch { updates } => self.handle_property_updates(updates),
            Message::InitResponse { objects } => self.handle_init(objects),
            other => {
                tracing::warn!(kind = other.kind(), "dropping host-bound message kind");
            }
        }
    }

    fn handle_signal(&self, object: &str, signal: i32, args: &[Value]) {
        let proxy = self.core.borrow().objects.get(object).cloned();
        match proxy {
            Some(proxy) => proxy.signal_emitted(signal, args),
            None => tracing::warn!(object, signal, "signal for unknown object"),
        }
    }

    fn handle_response(&self, id: u64, data: Value) {
        let callback = self.core.borrow_mut().pending.remove(&id);
        match callback {
            Some(callback) => {
                tracing::trace!(id, "resolving call");
                callback(data);
            }
            None => tracing::warn!(id, "response for unknown call id"),
        }
    }

    fn handle_property_updates(&self, updates: HashMap<String, HashMap<String, Value>>) {
        for (name, properties) in updates {
            let proxy = self.core.borrow().objects.get(&name).cloned();
            match proxy {
                Some(proxy) => proxy.property_update(properties),
                None => tracing::warn!(object = %name, "property update for unknown object"),
            }
        }
    }

    fn handle_init(&self, objects: HashMap<String, ObjectDescriptor>) {
        let callback = {
            let mut core = self.core.borrow_mut();
            if core.ready {
                tracing::warn!("duplicate init response ignored");
                return;
            }
            let link = self.link();
            for (name, descriptor) in objects {
                let proxy = ObjectProxy::new(name.clone(), &descriptor, link.clone());
                core.objects.insert(name, proxy);
            }
            core.ready = true;
            tracing::debug!(objects = core.objects.len(), "channel initialized");
            core.on_ready.take()
        };
        if let Some(callback) = callback {
            callback(self);
        }
    }
}

impl ChannelLink {
    pub(crate) fn invoke_method(
        &self,
        object: &str,
        method: i32,
        args: Vec<Value>,
        callback: Option<ResponseCallback>,
    ) -> Result<()> {
        let core = self.core.upgrade().ok_or(ClientError::Closed)?;
        Channel { core }.invoke_method(object, method, args, callback)
    }

    pub(crate) fn set_property(&self, object: &str, property: &str, value: Value) -> Result<()> {
        let core = self.core.upgrade().ok_or(ClientError::Closed)?;
        Channel { core }.set_property(object, property, value)
    }

    /// A link with no live channel behind it, for tests.
    #[cfg(test)]
    pub(crate) fn detached() -> ChannelLink {
        ChannelLink { core: Weak::new() }
    }
}
