use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata snapshot describing one remote object.
///
/// The host assigns the method and signal indices; the client uses them
/// verbatim as wire identifiers and never recomputes them. Property entries
/// carry the initial value used to seed the local cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    /// `[name, index]` pairs for invokable methods.
    #[serde(default)]
    pub methods: Vec<(String, i32)>,
    /// `[name, initial value]` pairs for properties.
    #[serde(default)]
    pub properties: Vec<(String, Value)>,
    /// `[name, index]` pairs for signals.
    #[serde(default)]
    pub signals: Vec<(String, i32)>,
}

impl ObjectDescriptor {
    /// Create an empty descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a method entry.
    pub fn with_method(mut self, name: impl Into<String>, index: i32) -> Self {
        self.methods.push((name.into(), index));
        self
    }

    /// Add a property entry with its initial value.
    pub fn with_property(mut self, name: impl Into<String>, initial: Value) -> Self {
        self.properties.push((name.into(), initial));
        self
    }

    /// Add a signal entry.
    pub fn with_signal(mut self, name: impl Into<String>, index: i32) -> Self {
        self.signals.push((name.into(), index));
        self
    }

    /// Wire index for a method name, if the host exposes it.
    pub fn method_index(&self, name: &str) -> Option<i32> {
        self.methods
            .iter()
            .find(|(method, _)| method == name)
            .map(|&(_, index)| index)
    }

    /// Wire index for a signal name, if the host exposes it.
    pub fn signal_index(&self, name: &str) -> Option<i32> {
        self.signals
            .iter()
            .find(|(signal, _)| signal == name)
            .map(|&(_, index)| index)
    }

    /// Initial value for a property name, if the host exposes it.
    pub fn initial_property(&self, name: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(property, _)| property == name)
            .map(|(_, initial)| initial)
    }
}
