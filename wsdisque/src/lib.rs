//! # wsdisque
//!
//! Carry WebSocket connection lifecycle events through a Disque job queue.
//!
//! A front-facing gateway enqueues connect / message / disconnect events as
//! jobs; the bridge on the other side drains them, acknowledges each batch
//! and replays the events into a session layer. Replies travel back the same
//! way, addressed by connection id.
//!
//! ## Architecture
//!
//! - **`wsdisque-core`**: errors, link options, endpoints, link health
//! - **`wsdisque-proto`**: RESP codec, broker links, envelope codec, job poller, publisher
//! - **`wsdisque`**: public API surface (this crate)
//!
//! ## Protocols (feature-gated)
//!
//! - **`disque`** (default) - the ADDJOB / GETJOB / FASTACK bridge
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "disque")]
//! # fn example() -> wsdisque::error::Result<()> {
//! use wsdisque::prelude::*;
//!
//! struct Gateway {
//!     publisher: Option<PublisherHandle>,
//! }
//!
//! impl SessionSink for Gateway {
//!     fn on_connected(&mut self, id: &ConnectionId, _data: Bytes) {
//!         println!("{id} connected");
//!     }
//!
//!     fn on_message(&mut self, id: &ConnectionId, data: MessageData) {
//!         // Echo back to the sender
//!         if let Some(publisher) = &self.publisher {
//!             publisher.publish(data.as_bytes(), id.as_str());
//!         }
//!     }
//!
//!     fn on_disconnected(&mut self, id: &ConnectionId, _data: Bytes, reason: DisconnectReason) {
//!         println!("{id} gone: {reason}");
//!     }
//! }
//!
//! impl ServerContext for Gateway {
//!     fn set_publisher(&mut self, publisher: PublisherHandle) {
//!         self.publisher = Some(publisher);
//!     }
//! }
//!
//! let config = BridgeConfig::new("gateway-1");
//! let mut bridge = DisqueBridge::connect(&config)?;
//! bridge.set_context(Gateway { publisher: None });
//!
//! let mut host = TickHost::new();
//! bridge.register(&mut host);
//! host.run(std::time::Duration::from_millis(10));
//! # Ok(())
//! # }
//! ```
//!
//! ## Failure model
//!
//! Only link construction fails loudly. Afterwards a broken link disables
//! itself and every operation on it becomes a logged no-op; nothing
//! reconnects on its own. Watch [`monitor::LinkEvent`]s or
//! [`DisqueBridge::health`] to notice.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export core types
pub use bytes::Bytes;
pub use wsdisque_core::{endpoint, error, monitor, options};

pub mod dev_tracing;
pub mod host;

#[cfg(feature = "disque")]
pub mod bridge;
#[cfg(feature = "disque")]
pub mod config;

/// Disque protocol building blocks (links, codec, poller, publisher).
#[cfg(feature = "disque")]
pub use wsdisque_proto as proto;

pub use host::{TickFn, TickHost, TickRegistry, TickStop};

#[cfg(feature = "disque")]
pub use bridge::{BridgeHealth, BridgeShutdown, DisqueBridge, PublisherHandle, ServerContext};
#[cfg(feature = "disque")]
pub use config::BridgeConfig;
#[cfg(feature = "disque")]
pub use wsdisque_proto::{
    ChannelSink, ConnectionId, DataMode, DisconnectReason, MessageData, SessionEvent, SessionSink,
};

/// Everything needed to wire a gateway to the bridge.
pub mod prelude {
    pub use crate::host::{TickHost, TickRegistry};
    pub use bytes::Bytes;

    #[cfg(feature = "disque")]
    pub use crate::bridge::{DisqueBridge, PublisherHandle, ServerContext};
    #[cfg(feature = "disque")]
    pub use crate::config::BridgeConfig;
    #[cfg(feature = "disque")]
    pub use wsdisque_proto::{
        ConnectionId, DataMode, DisconnectReason, MessageData, SessionEvent, SessionSink,
    };
}
