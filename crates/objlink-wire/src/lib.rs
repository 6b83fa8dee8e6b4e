//! Wire message schema for the objlink object-synchronization protocol.
//!
//! Every payload on the transport is one JSON object discriminated by an
//! integer `type` field. This crate defines the message kinds, a typed
//! [`Message`] enum with encode/decode, and the [`ObjectDescriptor`]
//! metadata shape the host sends at initialization.

pub mod descriptor;
pub mod error;
pub mod message;

pub use descriptor::ObjectDescriptor;
pub use error::{Result, WireError};
pub use message::{
    kind_name, Message, INIT, INVOKE_METHOD, PROPERTY_UPDATE, RESPONSE, SIGNAL,
};
