//! Broker endpoint addressing.
//!
//! Parses the broker address the bridge links connect to.

use std::fmt;
use std::str::FromStr;

/// Default Disque host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default Disque port.
pub const DEFAULT_PORT: u16 = 7711;

/// Address of a Disque node.
///
/// The host is kept as text so hostnames resolve at connect time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrokerEndpoint {
    host: String,
    port: u16,
}

impl BrokerEndpoint {
    /// Create an endpoint from a host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse an endpoint from a string.
    ///
    /// Supported formats:
    /// - `tcp://127.0.0.1:7711`
    /// - `disque://localhost:7711`
    /// - `127.0.0.1:7711`
    /// - `tcp://[::1]:7711` (IPv6)
    ///
    /// # Examples
    ///
    /// ```
    /// use wsdisque_core::endpoint::BrokerEndpoint;
    ///
    /// let endpoint = BrokerEndpoint::parse("disque://10.0.0.2:7712").unwrap();
    /// assert_eq!(endpoint.host(), "10.0.0.2");
    /// assert_eq!(endpoint.port(), 7712);
    /// ```
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        s.parse()
    }

    /// Host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// `host:port` form accepted by `ToSocketAddrs`.
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for BrokerEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl FromStr for BrokerEndpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr = if let Some(rest) = s.strip_prefix("tcp://") {
            rest
        } else if let Some(rest) = s.strip_prefix("disque://") {
            rest
        } else if s.contains("://") {
            return Err(EndpointError::InvalidScheme(s.to_string()));
        } else {
            s
        };

        let (host, port) = if let Some(bracketed) = addr.strip_prefix('[') {
            let (host, rest) = bracketed
                .split_once(']')
                .ok_or_else(|| EndpointError::InvalidAddress(addr.to_string()))?;
            let port = rest
                .strip_prefix(':')
                .ok_or_else(|| EndpointError::InvalidAddress(addr.to_string()))?;
            (host, port)
        } else {
            addr.rsplit_once(':')
                .ok_or_else(|| EndpointError::InvalidAddress(addr.to_string()))?
        };

        if host.is_empty() {
            return Err(EndpointError::InvalidAddress(addr.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| EndpointError::InvalidPort(port.to_string()))?;

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for BrokerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tcp://{}", self.authority())
    }
}

/// Errors that can occur when parsing endpoints.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("Invalid scheme in endpoint: {0} (expected tcp:// or disque://)")]
    InvalidScheme(String),

    #[error("Invalid broker address: {0}")]
    InvalidAddress(String),

    #[error("Invalid broker port: {0}")]
    InvalidPort(String),
}

impl From<EndpointError> for crate::error::BridgeError {
    fn from(e: EndpointError) -> Self {
        Self::InvalidEndpoint(e.to_string())
    }
}
