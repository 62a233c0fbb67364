//! wsdisque Core
//!
//! This crate contains the broker-agnostic building blocks of the bridge:
//! - Error types (`error`)
//! - Link options (`options`)
//! - Broker endpoint parsing (`endpoint`)
//! - TCP socket setup (`tcp`)
//! - Link health and monitor events (`monitor`)

#![deny(unsafe_code)]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
pub mod endpoint;
pub mod error;
pub mod monitor;
pub mod options;
pub mod tcp;

// Optional: a small prelude to make downstream crates ergonomic.
pub mod prelude {
    pub use crate::endpoint::BrokerEndpoint;
    pub use crate::error::{BridgeError, Result};
    pub use crate::monitor::{LinkEvent, LinkHealth, LinkMonitor};
    pub use crate::options::LinkOptions;
}
