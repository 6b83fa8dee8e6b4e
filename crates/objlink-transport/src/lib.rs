//! Opaque text-message transport abstraction for objlink.
//!
//! The object-synchronization layer only needs two things from a transport:
//! a way to push one text payload to the host, and a notification hook that
//! delivers inbound payloads one at a time, in the order the host sent them.
//! This crate defines that contract and ships a single in-process
//! implementation used by tests and the demo CLI.
//!
//! Real transports (sockets, pipes, websockets) live outside this workspace;
//! reconnection and retry are their problem, not ours.

pub mod error;
pub mod loopback;
pub mod traits;

pub use error::{Result, TransportError};
pub use loopback::{pair, LoopbackEndpoint};
pub use traits::{MessageHandler, MessageTransport};
