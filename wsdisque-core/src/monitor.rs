//! Link health and event monitoring.
//!
//! A link never reconnects by itself. It reports its state through
//! [`LinkHealth`] and, when a monitor is attached, emits [`LinkEvent`]s so a
//! supervising component can alarm or rebuild the link.

use std::fmt;

/// Current state of a broker link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkHealth {
    /// Socket established and usable.
    Connected,

    /// Socket failed; every further operation is a no-op.
    Disabled(String),

    /// Socket released by an explicit close.
    Closed,
}

impl LinkHealth {
    /// Returns true if the link can still carry commands.
    #[inline]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for LinkHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Disabled(reason) => write!(f, "disabled ({reason})"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Link lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Link connected to the broker.
    Connected { label: String, endpoint: String },

    /// Link hit an I/O failure and disabled itself.
    Disabled { label: String, reason: String },

    /// Link was closed explicitly.
    Closed { label: String },
}

impl fmt::Display for LinkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { label, endpoint } => write!(f, "{label} connected to {endpoint}"),
            Self::Disabled { label, reason } => write!(f, "{label} disabled: {reason}"),
            Self::Closed { label } => write!(f, "{label} closed"),
        }
    }
}

/// Handle for receiving link events.
pub type LinkMonitor = flume::Receiver<LinkEvent>;

/// Sender half handed to links.
pub type LinkEventSender = flume::Sender<LinkEvent>;

/// Creates a new monitoring channel pair.
#[must_use]
pub fn create_monitor() -> (LinkEventSender, LinkMonitor) {
    flume::unbounded()
}
