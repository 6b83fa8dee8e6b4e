//! Remote-object protocol client.
//!
//! This is the "just works" layer of objlink. A [`Channel`] owns a
//! transport, sends the initialization request, and turns the host's
//! metadata into one [`ObjectProxy`] per remote object. Thereafter every
//! inbound message flows through the channel's single dispatcher: responses
//! resolve their correlated callbacks, property-update batches refresh the
//! proxy caches, and signal emissions fan out to local subscribers.
//!
//! The whole layer is single-threaded and event-driven: all work happens on
//! message arrival or in direct response to a caller, with no timers and no
//! background scheduling. Handles are `Rc`-based and cheap to clone.

pub mod channel;
pub mod error;
pub mod proxy;

pub use channel::{Channel, ResponseCallback};
pub use error::{ClientError, Result};
pub use proxy::{ObjectProxy, SignalCallback, SubscriptionId};
