//! # wsdisque proto
//!
//! Disque side of the WebSocket bridge.
//!
//! ## Overview
//!
//! - **codec**: RESP multi-bulk command encoding and reply sigils
//! - **command**: ADDJOB / GETJOB / FASTACK option tokens
//! - **link**: [`BrokerLink`], one blocking connection with byte-level reply reads
//! - **envelope**: the `kind | state | connection id | payload` job body
//! - **session**: [`SessionSink`] callbacks and envelope dispatch
//! - **poller**: [`JobPoller`], the drain / acknowledge / dispatch cycle
//! - **publisher**: [`Publisher`], fire-and-forget enqueue
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wsdisque_core::prelude::*;
//! use wsdisque_proto::{BrokerLink, DataMode, JobPoller, Publisher, SessionEvent};
//! use wsdisque_proto::command::{AddJobOptions, GetJobOptions};
//!
//! fn main() -> Result<()> {
//!     let endpoint = BrokerEndpoint::default();
//!     let options = LinkOptions::default();
//!
//!     let producer = BrokerLink::connect("producer", &endpoint, options.clone())?;
//!     let consumer = BrokerLink::connect("consumer", &endpoint, options.clone())?;
//!     let acker = BrokerLink::connect("acker", &endpoint, options)?;
//!
//!     let mut publisher = Publisher::new(producer, &AddJobOptions::default(), DataMode::Binary);
//!     let mut poller = JobPoller::new(consumer, acker, &GetJobOptions::new("gateway"));
//!
//!     publisher.publish(b"hello", "gateway");
//!
//!     let mut events: Vec<SessionEvent> = Vec::new();
//!     poller.poll(&mut events);
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]

pub mod codec;
pub mod command;
pub mod envelope;
pub mod link;
pub mod poller;
pub mod publisher;
pub mod session;
pub mod stream;

#[cfg(test)]
mod testing;

pub use envelope::{ConnectionId, ConnectionState, DisconnectReason, Envelope, EnvelopeError, Kind};
pub use link::{BrokerLink, SimpleReply};
pub use poller::{JobPoller, PollReport};
pub use publisher::{DataMode, Publisher, UnknownDataMode};
pub use session::{dispatch, ChannelSink, MessageData, SessionEvent, SessionSink};
pub use stream::LinkStream;
