//! Remote-object protocol client with live proxies over an opaque transport.
//!
//! objlink lets a front-end process interact with objects that live in a
//! separate host process: host methods become local callable stubs, host
//! properties become locally cached accessors, and host signals fan out to
//! local subscribers, all over a single in-order text-message transport.
//!
//! # Crate Structure
//!
//! - [`transport`]: the transport contract plus an in-process loopback pair
//! - [`wire`]: wire message schema and object metadata descriptors
//! - [`client`]: the core, `Channel` dispatch/correlation and `ObjectProxy`

/// Re-export transport types.
pub mod transport {
    pub use objlink_transport::*;
}

/// Re-export wire types.
pub mod wire {
    pub use objlink_wire::*;
}

/// Re-export client types.
pub mod client {
    pub use objlink_client::*;
}
