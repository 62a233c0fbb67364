/// wsdisque Error Types
///
/// Errors shared by every broker link and the protocol layers above them.

use std::io;
use thiserror::Error;

/// Main error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// IO error during socket operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The broker could not be reached when a link was constructed
    #[error("failed to connect to disque @:{endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    /// The reply stream did not follow the expected shape
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// A bulk body was announced but its bytes (plus CRLF) are not buffered
    #[error("Protocol violation: bulk body needs {needed} bytes, only {available} available")]
    InsufficientBytes { needed: usize, available: usize },

    /// The link was disabled by an earlier I/O failure or closed
    #[error("Link {label} is disabled")]
    LinkDisabled { label: String },

    /// Endpoint string could not be parsed
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Create a protocol violation with a message
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    /// Create a disabled-link error
    pub fn link_disabled(label: impl Into<String>) -> Self {
        Self::LinkDisabled {
            label: label.into(),
        }
    }

    /// Check if this error means the link can no longer be used
    #[must_use]
    pub const fn is_link_failure(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Connect { .. } | Self::LinkDisabled { .. }
        )
    }

    /// Check if this error left the reply stream out of sync
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation(_) | Self::InsufficientBytes { .. }
        )
    }
}
