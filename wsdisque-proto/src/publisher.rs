//! Producer path: fire-and-forget ADDJOB on the producer link.
//!
//! The target connection id is the queue name. The broker's immediate
//! reply, when one is already waiting, is read and logged; nothing is
//! reported back to the caller.

use std::borrow::Cow;
use std::fmt;
use std::net::TcpStream;
use std::str::FromStr;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::command::{AddJobOptions, ADDJOB};
use crate::link::{BrokerLink, SimpleReply};
use crate::stream::LinkStream;

/// How outbound payload bytes are put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DataMode {
    /// Bytes are sent verbatim.
    #[default]
    Binary,
    /// Bytes are sent as their UTF-8 text, invalid sequences replaced.
    String,
}

impl DataMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "disque_binary",
            Self::String => "disque_string",
        }
    }
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown data mode {0:?}, expected disque_binary or disque_string")]
pub struct UnknownDataMode(pub String);

impl FromStr for DataMode {
    type Err = UnknownDataMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disque_binary" => Ok(Self::Binary),
            "disque_string" => Ok(Self::String),
            other => Err(UnknownDataMode(other.to_string())),
        }
    }
}

pub struct Publisher<S = TcpStream>
where
    S: LinkStream,
{
    link: BrokerLink<S>,
    add_tokens: Vec<String>,
    mode: DataMode,
}

impl<S> Publisher<S>
where
    S: LinkStream,
{
    pub fn new(link: BrokerLink<S>, options: &AddJobOptions, mode: DataMode) -> Self {
        Self {
            link,
            add_tokens: options.tokens(),
            mode,
        }
    }

    #[inline]
    pub const fn link(&self) -> &BrokerLink<S> {
        &self.link
    }

    #[inline]
    pub const fn mode(&self) -> DataMode {
        self.mode
    }

    /// Enqueue `payload` on the queue named `target`.
    ///
    /// An empty target is a no-op.
    pub fn publish(&mut self, payload: &[u8], target: &str) {
        if target.is_empty() {
            trace!("[ADDJOB] Empty target, nothing published");
            return;
        }

        let body: Cow<'_, [u8]> = match self.mode {
            DataMode::Binary => Cow::Borrowed(payload),
            DataMode::String => match String::from_utf8_lossy(payload) {
                Cow::Borrowed(text) => Cow::Borrowed(text.as_bytes()),
                Cow::Owned(text) => Cow::Owned(text.into_bytes()),
            },
        };

        let available = self.link.send_command(ADDJOB, target, &body, &self.add_tokens);
        trace!(%target, len = body.len(), available, "[ADDJOB] Sent");
        if available == 0 {
            return;
        }

        let reply = self
            .link
            .read_first_byte()
            .and_then(|sigil| self.link.read_simple_reply(sigil));
        match reply {
            Ok(SimpleReply::Status(job_id)) => debug!(%target, %job_id, "[ADDJOB] Queued"),
            Ok(SimpleReply::Error(message)) => warn!(%target, reply = %message, "[ADDJOB] Broker error"),
            Ok(SimpleReply::Integer(n)) => debug!(%target, value = n, "[ADDJOB] Integer reply"),
            Ok(SimpleReply::Unrecognized(sigil)) => trace!(sigil, "[ADDJOB] Unexpected reply byte"),
            Err(e) => warn!(%target, error = %e, "[ADDJOB] Reading reply failed"),
        }
    }

    /// Enqueue a text message.
    pub fn publish_text(&mut self, text: &str, target: &str) {
        self.publish(text.as_bytes(), target);
    }

    pub fn close(&mut self) {
        self.link.close();
    }
}

impl<S> fmt::Debug for Publisher<S>
where
    S: LinkStream,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("link", &self.link)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
