//! Local proxies for remote objects.
//!
//! A proxy is built once, from the metadata snapshot the host sends at
//! initialization, and never rebuilt. It holds a method table, a property
//! cache, and a signal subscriber table behind uniform accessors, which
//! preserves the call/read/write/subscribe semantics of the original
//! per-member design without dynamic attribute injection.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use objlink_wire::ObjectDescriptor;
use serde_json::Value;

use crate::channel::{ChannelLink, ResponseCallback};
use crate::error::{ClientError, Result};

/// Callback invoked with a signal's argument list on every emission.
pub type SignalCallback = Box<dyn FnMut(&[Value])>;

/// Identifies one signal registration on one proxy.
///
/// The same callback may be connected any number of times; every
/// registration gets its own id and is removed individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscriber table key: a host signal index, or the synthesized
/// `<property>Changed` key space used for property-change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SignalKey {
    Signal(i32),
    PropertyChanged(String),
}

struct ProxyState {
    name: String,
    link: ChannelLink,
    /// Method name → host-assigned wire index.
    methods: HashMap<String, i32>,
    /// Cache of confirmed property values. Seeded from the descriptor,
    /// overwritten only by inbound update batches, never by local writes.
    properties: HashMap<String, Value>,
    signals: HashMap<String, i32>,
    /// Insertion order is delivery order.
    subscribers: HashMap<SignalKey, Vec<(SubscriptionId, SignalCallback)>>,
    /// Ids whose lists are taken out for an in-flight delivery.
    in_flight: HashSet<SubscriptionId>,
    /// In-flight ids disconnected during that delivery; they are skipped by
    /// the delivery loop and dropped instead of re-merged.
    pending_disconnects: HashSet<SubscriptionId>,
    next_subscription: u64,
}

/// A live proxy for one remote object.
///
/// Cloning yields another handle to the same proxy. Reads are served from
/// the local cache; writes and calls are requests to the host, confirmed
/// asynchronously through the channel's dispatcher.
#[derive(Clone)]
pub struct ObjectProxy {
    state: Rc<RefCell<ProxyState>>,
}

impl ObjectProxy {
    pub(crate) fn new(name: String, descriptor: &ObjectDescriptor, link: ChannelLink) -> Self {
        let methods = descriptor
            .methods
            .iter()
            .map(|(method, index)| (method.clone(), *index))
            .collect();
        let properties = descriptor
            .properties
            .iter()
            .map(|(property, initial)| (property.clone(), initial.clone()))
            .collect();
        let signals = descriptor
            .signals
            .iter()
            .map(|(signal, index)| (signal.clone(), *index))
            .collect();

        Self {
            state: Rc::new(RefCell::new(ProxyState {
                name,
                link,
                methods,
                properties,
                signals,
                subscribers: HashMap::new(),
                in_flight: HashSet::new(),
                pending_disconnects: HashSet::new(),
                next_subscription: 0,
            })),
        }
    }

    /// The object's name, the routing key for all traffic addressed to it.
    pub fn name(&self) -> String {
        self.state.borrow().name.clone()
    }

    /// Invoke a host method, discarding the eventual return value.
    ///
    /// The response, if the host sends one, is dropped with a benign
    /// warning on arrival.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Result<()> {
        self.invoke(method, args, None)
    }

    /// Invoke a host method; `callback` receives the returned value once
    /// the host's response arrives.
    pub fn call_with(
        &self,
        method: &str,
        args: Vec<Value>,
        callback: impl FnOnce(Value) + 'static,
    ) -> Result<()> {
        self.invoke(method, args, Some(Box::new(callback)))
    }

    fn invoke(&self, method: &str, args: Vec<Value>, callback: Option<ResponseCallback>) -> Result<()> {
        let (name, index, link) = {
            let state = self.state.borrow();
            let Some(&index) = state.methods.get(method) else {
                return Err(ClientError::UnknownMethod {
                    object: state.name.clone(),
                    method: method.to_string(),
                });
            };
            (state.name.clone(), index, state.link.clone())
        };
        link.invoke_method(&name, index, args, callback)
    }

    /// The cached value of a property, or `None` for names the descriptor
    /// never listed and no update ever delivered.
    pub fn property(&self, name: &str) -> Option<Value> {
        self.state.borrow().properties.get(name).cloned()
    }

    /// Request a host-side property write.
    ///
    /// The local cache is *not* updated here: a read immediately after a
    /// write observes the old value until the host confirms the new one via
    /// an update batch. The cache holds confirmed state only.
    pub fn set_property(&self, name: &str, value: Value) -> Result<()> {
        let (object, link) = {
            let state = self.state.borrow();
            if !state.properties.contains_key(name) {
                return Err(ClientError::UnknownProperty {
                    object: state.name.clone(),
                    property: name.to_string(),
                });
            }
            (state.name.clone(), state.link.clone())
        };
        link.set_property(&object, name, value)
    }

    /// Subscribe to a host signal by name. Delivery order is registration
    /// order; connecting the same callback twice creates two independent
    /// registrations.
    pub fn connect(
        &self,
        signal: &str,
        callback: impl FnMut(&[Value]) + 'static,
    ) -> Result<SubscriptionId> {
        let index = {
            let state = self.state.borrow();
            match state.signals.get(signal) {
                Some(&index) => index,
                None => {
                    return Err(ClientError::UnknownSignal {
                        object: state.name.clone(),
                        signal: signal.to_string(),
                    })
                }
            }
        };
        Ok(self.subscribe(SignalKey::Signal(index), Box::new(callback)))
    }

    /// Subscribe to change notifications for a property.
    ///
    /// No descriptor check: update batches may carry properties the
    /// descriptor never listed, and those notify too.
    pub fn on_property_changed(
        &self,
        property: &str,
        callback: impl FnMut(&[Value]) + 'static,
    ) -> SubscriptionId {
        self.subscribe(
            SignalKey::PropertyChanged(property.to_string()),
            Box::new(callback),
        )
    }

    /// Remove exactly one registration. Returns `false` for ids already
    /// removed or never issued by this proxy. Duplicate registrations of
    /// the same callback are untouched.
    ///
    /// Works from inside a delivery too: a handler may disconnect itself or
    /// any other registration under the same signal, and the registration
    /// stays removed once the delivery finishes.
    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        for list in state.subscribers.values_mut() {
            if let Some(position) = list.iter().position(|(subscription, _)| *subscription == id) {
                list.remove(position);
                return true;
            }
        }
        // The registration may be out with an in-flight delivery.
        if state.in_flight.contains(&id) {
            return state.pending_disconnects.insert(id);
        }
        false
    }

    /// Method names from the descriptor, sorted.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.borrow().methods.keys().cloned().collect();
        names.sort();
        names
    }

    /// Property names currently cached, sorted.
    pub fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.borrow().properties.keys().cloned().collect();
        names.sort();
        names
    }

    /// Signal names from the descriptor, sorted.
    pub fn signal_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.borrow().signals.keys().cloned().collect();
        names.sort();
        names
    }

    /// Apply one confirmed per-object update map: overwrite the cache, then
    /// notify `<property>Changed` subscribers with the new value.
    ///
    /// Properties absent from the descriptor are still cached; the
    /// protocol does not require a strict schema match.
    pub(crate) fn property_update(&self, updates: HashMap<String, Value>) {
        for (property, value) in updates {
            self.state
                .borrow_mut()
                .properties
                .insert(property.clone(), value.clone());
            tracing::trace!(object = %self.state.borrow().name, %property, "property updated");
            let key = SignalKey::PropertyChanged(property);
            self.emit(&key, std::slice::from_ref(&value));
        }
    }

    /// Fan one signal emission out to its subscribers, in registration
    /// order. No subscribers is a silent no-op.
    pub(crate) fn signal_emitted(&self, signal: i32, args: &[Value]) {
        self.emit(&SignalKey::Signal(signal), args);
    }

    fn subscribe(&self, key: SignalKey, callback: SignalCallback) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        state.next_subscription += 1;
        let id = SubscriptionId(state.next_subscription);
        state.subscribers.entry(key).or_default().push((id, callback));
        id
    }

    /// Invoke every subscriber under `key` with `args`.
    ///
    /// The list is moved out while callbacks run so no borrow is held
    /// across user code; a `connect` performed inside a delivery lands
    /// behind the in-flight registrations. Disconnects issued during the
    /// delivery are collected in `pending_disconnects` and honored both by
    /// the delivery loop and by the re-merge.
    fn emit(&self, key: &SignalKey, args: &[Value]) {
        let mut handlers = {
            let mut state = self.state.borrow_mut();
            let list = match state.subscribers.get_mut(key) {
                Some(list) if !list.is_empty() => std::mem::take(list),
                _ => return,
            };
            for (id, _) in &list {
                state.in_flight.insert(*id);
            }
            list
        };

        for (id, callback) in handlers.iter_mut() {
            if self.state.borrow().pending_disconnects.contains(id) {
                continue;
            }
            callback(args);
        }

        let mut state = self.state.borrow_mut();
        for (id, _) in &handlers {
            state.in_flight.remove(id);
        }
        handlers.retain(|(id, _)| !state.pending_disconnects.remove(id));
        let list = state.subscribers.entry(key.clone()).or_default();
        let added_during_delivery = std::mem::replace(list, handlers);
        list.extend(added_during_delivery);
    }
}
