//! Broker link configuration options
//!
//! This module provides configuration for a single broker link: the TCP
//! socket settings applied on connect and the bounds used while reading
//! replies back from the broker.

use std::time::Duration;

/// Default upper bound for a single reply line (bytes).
pub const DEFAULT_LINE_CAPACITY: usize = 1024;

/// Default size of one non-blocking read from the socket (bytes).
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8192;

/// Default time a bulk body may take to finish arriving.
pub const DEFAULT_BODY_GRACE: Duration = Duration::from_millis(100);

/// Link configuration options.
///
/// # Examples
///
/// ```
/// use wsdisque_core::options::LinkOptions;
/// use std::time::Duration;
///
/// let opts = LinkOptions::default()
///     .with_send_timeout(Duration::from_secs(5))
///     .with_reply_wait(Duration::from_millis(20));
/// ```
#[derive(Debug, Clone)]
pub struct LinkOptions {
    /// Send timeout (SO_SNDTIMEO)
    ///
    /// - `None`: Block indefinitely (default)
    /// - `Some(duration)`: A send that stalls longer fails and disables the link
    pub send_timeout: Option<Duration>,

    /// Connection timeout
    ///
    /// - Default: 0 (use OS default)
    pub connect_timeout: Duration,

    /// How long a command waits for the first reply byte before the number
    /// of available bytes is sampled.
    ///
    /// - `None`: Sample immediately after the write (default)
    /// - `Some(duration)`: Wait up to duration for the reply to start
    pub reply_wait: Option<Duration>,

    /// How long a bulk read waits for its announced body to be buffered.
    ///
    /// - Default: 100ms
    /// - `Duration::ZERO`: Strict pre-check, fail at once when short
    pub body_grace: Duration,

    /// Maximum length of one reply line.
    ///
    /// - Default: 1024 bytes
    pub line_capacity: usize,

    /// Size of each read pulled from the socket into the link buffer.
    ///
    /// - Default: 8192 (8KB)
    pub read_chunk_size: usize,

    /// Enable TCP keepalive (SO_KEEPALIVE)
    ///
    /// - `false` (default): OS default
    pub tcp_keepalive: bool,

    /// Keepalive idle time before the first probe, when keepalive is enabled.
    pub tcp_keepalive_idle: Option<Duration>,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            send_timeout: None, // Block indefinitely
            connect_timeout: Duration::ZERO,
            reply_wait: None,
            body_grace: DEFAULT_BODY_GRACE,
            line_capacity: DEFAULT_LINE_CAPACITY,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            tcp_keepalive: false,
            tcp_keepalive_idle: None,
        }
    }
}

impl LinkOptions {
    /// Create new link options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set send timeout.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Set connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Wait up to `wait` for a reply before sampling available bytes.
    pub fn with_reply_wait(mut self, wait: Duration) -> Self {
        self.reply_wait = Some(wait);
        self
    }

    /// Set the bulk body grace period.
    ///
    /// # Examples
    ///
    /// ```
    /// use wsdisque_core::options::LinkOptions;
    /// use std::time::Duration;
    ///
    /// // Fail as soon as a body is not fully buffered
    /// let opts = LinkOptions::new().with_body_grace(Duration::ZERO);
    /// assert!(opts.body_grace.is_zero());
    /// ```
    pub fn with_body_grace(mut self, grace: Duration) -> Self {
        self.body_grace = grace;
        self
    }

    /// Set the maximum reply line length.
    pub fn with_line_capacity(mut self, capacity: usize) -> Self {
        self.line_capacity = capacity.max(1);
        self
    }

    /// Set the socket read chunk size.
    pub fn with_read_chunk_size(mut self, size: usize) -> Self {
        self.read_chunk_size = size.max(1);
        self
    }

    /// Enable TCP keepalive with an optional idle time.
    pub fn with_tcp_keepalive(mut self, idle: Option<Duration>) -> Self {
        self.tcp_keepalive = true;
        self.tcp_keepalive_idle = idle;
        self
    }
}
