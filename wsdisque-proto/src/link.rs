//! Broker link: one persistent connection to the Disque node.
//!
//! A link owns exactly one stream plus the buffers used to frame commands
//! and to read replies back byte by byte. Its lifecycle is
//! connect-or-fail, use, close. An I/O failure does not surface as an error
//! from [`BrokerLink::send_command`]: the link closes its socket, records
//! [`LinkHealth::Disabled`] and answers every later call with "nothing
//! sent". It never reconnects.
//!
//! A broker that hangs up right after replying leaves its reply readable:
//! the link disables itself on end of stream but keeps what it already
//! buffered, and only reads that need more than that fail.
//!
//! Reads never wait on the broker unless they must: the reply stream is
//! consumed inside a tight drain loop, so "how much is already delivered"
//! ([`BrokerLink::available`]) bounds line reads and gates bulk reads.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Instant;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace, warn};
use wsdisque_core::endpoint::BrokerEndpoint;
use wsdisque_core::error::{BridgeError, Result};
use wsdisque_core::monitor::{LinkEvent, LinkEventSender, LinkHealth};
use wsdisque_core::options::LinkOptions;
use wsdisque_core::tcp;

use crate::codec::{encode_command_into, parse_decimal, ReplyKind};
use crate::stream::LinkStream;

/// Deepest array nesting [`BrokerLink::skip_value`] follows.
pub const MAX_SKIP_DEPTH: usize = 32;

/// A reply that fits on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleReply {
    Status(String),
    Error(String),
    Integer(i64),
    /// First byte did not match a line reply; nothing else was consumed.
    Unrecognized(u8),
}

pub struct BrokerLink<S = TcpStream>
where
    S: LinkStream,
{
    /// Name used in logs and monitor events
    label: String,

    /// Underlying stream - None once disabled or closed
    stream: Option<S>,

    /// Bytes received from the broker and not yet consumed
    recv: BytesMut,

    /// Reusable command encoding buffer
    write_buf: BytesMut,

    options: LinkOptions,

    health: LinkHealth,

    monitor: Option<LinkEventSender>,
}

impl BrokerLink<TcpStream> {
    /// Connect a new link to the broker.
    ///
    /// This is the only fallible constructor: a link without an established
    /// socket has nothing useful to do.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connect`] when no connection could be made.
    pub fn connect(
        label: impl Into<String>,
        endpoint: &BrokerEndpoint,
        options: LinkOptions,
    ) -> Result<Self> {
        Self::connect_inner(label.into(), endpoint, options, None)
    }

    /// Connect a new link that reports lifecycle events to `monitor`.
    pub fn connect_with_monitor(
        label: impl Into<String>,
        endpoint: &BrokerEndpoint,
        options: LinkOptions,
        monitor: LinkEventSender,
    ) -> Result<Self> {
        Self::connect_inner(label.into(), endpoint, options, Some(monitor))
    }

    fn connect_inner(
        label: String,
        endpoint: &BrokerEndpoint,
        options: LinkOptions,
        monitor: Option<LinkEventSender>,
    ) -> Result<Self> {
        let stream = tcp::connect(endpoint, &options).map_err(|source| {
            warn!(link = %label, %endpoint, error = %source, "[LINK] Failed to connect to disque");
            BridgeError::Connect {
                endpoint: endpoint.to_string(),
                source,
            }
        })?;
        debug!(link = %label, %endpoint, "[LINK] Connected");

        let mut link = Self::from_stream(label, stream, options);
        link.monitor = monitor;
        link.emit(LinkEvent::Connected {
            label: link.label.clone(),
            endpoint: endpoint.to_string(),
        });
        Ok(link)
    }
}

impl<S> BrokerLink<S>
where
    S: LinkStream,
{
    /// Wrap an already connected stream.
    pub fn from_stream(label: impl Into<String>, stream: S, options: LinkOptions) -> Self {
        let read_capacity = options.read_chunk_size;
        Self {
            label: label.into(),
            stream: Some(stream),
            recv: BytesMut::with_capacity(read_capacity),
            write_buf: BytesMut::with_capacity(256),
            options,
            health: LinkHealth::Connected,
            monitor: None,
        }
    }

    /// Attach a monitor channel (builder-style).
    #[must_use]
    pub fn with_monitor(mut self, monitor: LinkEventSender) -> Self {
        self.monitor = Some(monitor);
        self
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub const fn health(&self) -> &LinkHealth {
        &self.health
    }

    #[inline]
    pub const fn is_usable(&self) -> bool {
        self.stream.is_some()
    }

    #[inline]
    pub const fn options(&self) -> &LinkOptions {
        &self.options
    }

    /// Number of received bytes not yet consumed, without touching the socket.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.recv.len()
    }

    /// Encode and send one command.
    ///
    /// Returns the number of reply bytes available right after the write,
    /// or 0 when the link is disabled or the write failed. A failed write
    /// disables the link.
    pub fn send_command<T: AsRef<[u8]>>(
        &mut self,
        command: &str,
        primary: &str,
        payload: &[u8],
        options: &[T],
    ) -> usize {
        if self.stream.is_none() {
            return 0;
        }

        self.write_buf.clear();
        encode_command_into(&mut self.write_buf, command, primary, payload, options);
        trace!(link = %self.label, command, bytes = self.write_buf.len(), "[LINK] Sending command");

        let written = match self.stream.as_mut() {
            Some(stream) => stream
                .write_all(&self.write_buf)
                .and_then(|()| stream.flush()),
            None => return 0,
        };
        if let Err(e) = written {
            self.disable(format!("send failed: {e}"));
            return 0;
        }

        if let Some(wait) = self.options.reply_wait {
            if self.recv.is_empty() {
                let waited = match self.stream.as_mut() {
                    Some(stream) => stream.wait_readable(wait),
                    None => return 0,
                };
                if let Err(e) = waited {
                    self.disable(format!("receive failed: {e}"));
                    return 0;
                }
            }
        }

        self.available().unwrap_or(0)
    }

    /// Bytes delivered by the broker and not yet consumed.
    ///
    /// Pulls whatever the socket already holds into the link buffer without
    /// blocking.
    pub fn available(&mut self) -> Result<usize> {
        self.pull_available()?;
        Ok(self.recv.len())
    }

    /// Read exactly one byte, blocking until it arrives.
    ///
    /// Used to discriminate the reply type by its sigil.
    pub fn read_first_byte(&mut self) -> Result<u8> {
        self.next_byte()
    }

    /// Read one reply line.
    ///
    /// Stops at a bare `\n`; every `\r` is dropped. The read also stops once
    /// it has consumed as many bytes as were available when it started, or
    /// the configured line capacity, whichever is smaller. Such a truncated
    /// line is returned as is.
    pub fn read_line(&mut self) -> Result<Bytes> {
        if self.recv.is_empty() {
            self.ensure_usable()?;
        }
        if self.available()? == 0 {
            self.fill_blocking()?;
        }

        let limit = self.recv.len().min(self.options.line_capacity);
        let mut line = BytesMut::with_capacity(limit.min(128));
        let mut consumed = 0;
        loop {
            let byte = self.next_byte()?;
            consumed += 1;
            match byte {
                b'\n' => break,
                b'\r' => {}
                other => line.put_u8(other),
            }
            if consumed >= limit {
                trace!(link = %self.label, limit, "[LINK] Line read stopped at limit");
                break;
            }
        }
        Ok(line.freeze())
    }

    /// Read a bulk body of `length` bytes and drop its trailing CRLF.
    ///
    /// The body and its terminator must already be buffered, or arrive
    /// within the configured body grace period.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InsufficientBytes`] if fewer than `length + 2` bytes
    /// are available.
    pub fn read_exact(&mut self, length: usize) -> Result<Bytes> {
        let needed = length + 2;
        let mut available = self.available()?;

        if available < needed && !self.options.body_grace.is_zero() {
            let deadline = Instant::now() + self.options.body_grace;
            while available < needed {
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let waited = match self.stream.as_mut() {
                    Some(stream) => stream.wait_readable(deadline - now),
                    None => return Err(BridgeError::link_disabled(&self.label)),
                };
                match waited {
                    Ok(true) => available = self.available()?,
                    Ok(false) => break,
                    Err(e) => return Err(self.fail("receive", e)),
                }
            }
        }

        if available < needed {
            return Err(BridgeError::InsufficientBytes { needed, available });
        }

        let body = self.recv.split_to(length).freeze();
        self.recv.advance(2);
        Ok(body)
    }

    /// Read the remainder of a reply whose sigil was already consumed.
    ///
    /// Status, error and integer replies consume their line; anything else
    /// consumes nothing more.
    pub fn read_simple_reply(&mut self, sigil: u8) -> Result<SimpleReply> {
        let reply = match ReplyKind::from_sigil(sigil) {
            ReplyKind::Status => SimpleReply::Status(lossy(&self.read_line()?)),
            ReplyKind::Error => SimpleReply::Error(lossy(&self.read_line()?)),
            ReplyKind::Integer => SimpleReply::Integer(parse_decimal(&self.read_line()?)?),
            ReplyKind::Bulk | ReplyKind::Array | ReplyKind::Unrecognized(_) => {
                SimpleReply::Unrecognized(sigil)
            }
        };
        Ok(reply)
    }

    /// Skip one complete reply value of any type, nested arrays included.
    ///
    /// Arrays nested deeper than [`MAX_SKIP_DEPTH`] are a protocol violation.
    pub fn skip_value(&mut self) -> Result<()> {
        self.skip_nested(0)
    }

    fn skip_nested(&mut self, depth: usize) -> Result<()> {
        if depth > MAX_SKIP_DEPTH {
            return Err(BridgeError::protocol(format!(
                "reply nested deeper than {MAX_SKIP_DEPTH} arrays"
            )));
        }
        let sigil = self.read_first_byte()?;
        match ReplyKind::from_sigil(sigil) {
            ReplyKind::Status | ReplyKind::Error | ReplyKind::Integer => {
                self.read_line()?;
            }
            ReplyKind::Bulk => {
                let len = parse_decimal(&self.read_line()?)?;
                if let Ok(len) = usize::try_from(len) {
                    self.read_exact(len)?;
                }
            }
            ReplyKind::Array => {
                let count = parse_decimal(&self.read_line()?)?;
                for _ in 0..count.max(0) {
                    self.skip_nested(depth + 1)?;
                }
            }
            ReplyKind::Unrecognized(other) => {
                return Err(BridgeError::protocol(format!(
                    "unexpected reply byte 0x{other:02x}"
                )));
            }
        }
        Ok(())
    }

    /// Drop every buffered byte. Returns how many were dropped.
    pub fn discard_buffered(&mut self) -> usize {
        let n = self.recv.len();
        self.recv.clear();
        n
    }

    /// Release the socket. Later operations are no-ops.
    pub fn close(&mut self) {
        self.recv.clear();
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown() {
                trace!(link = %self.label, error = %e, "[LINK] Shutdown error ignored");
            }
            self.health = LinkHealth::Closed;
            debug!(link = %self.label, "[LINK] Closed");
            self.emit(LinkEvent::Closed {
                label: self.label.clone(),
            });
        }
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.stream.is_none() {
            return Err(BridgeError::link_disabled(&self.label));
        }
        Ok(())
    }

    fn next_byte(&mut self) -> Result<u8> {
        if self.recv.is_empty() {
            self.fill_blocking()?;
        }
        Ok(self.recv.get_u8())
    }

    /// Pull everything the socket already holds, never blocking.
    fn pull_available(&mut self) -> Result<()> {
        let chunk = self.options.read_chunk_size;
        loop {
            let start = self.recv.len();
            self.recv.resize(start + chunk, 0);
            let result = match self.stream.as_mut() {
                Some(stream) => stream.read_nonblocking(&mut self.recv[start..]),
                None => {
                    self.recv.truncate(start);
                    if start > 0 {
                        return Ok(());
                    }
                    return Err(BridgeError::link_disabled(&self.label));
                }
            };
            match result {
                Ok(0) => {
                    self.recv.truncate(start);
                    if start == 0 {
                        return Err(self.fail("receive", eof()));
                    }
                    // Hung up after replying: what is buffered stays readable.
                    self.shut_off(format!("receive failed: {}", eof()));
                    return Ok(());
                }
                Ok(n) => {
                    self.recv.truncate(start + n);
                    if n < chunk {
                        return Ok(());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.recv.truncate(start);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    self.recv.truncate(start);
                }
                Err(e) => {
                    self.recv.truncate(start);
                    return Err(self.fail("receive", e));
                }
            }
        }
    }

    /// Block until at least one more byte is buffered.
    fn fill_blocking(&mut self) -> Result<()> {
        let chunk = self.options.read_chunk_size;
        loop {
            let start = self.recv.len();
            self.recv.resize(start + chunk, 0);
            let result = match self.stream.as_mut() {
                Some(stream) => stream.read(&mut self.recv[start..]),
                None => {
                    self.recv.truncate(start);
                    return Err(BridgeError::link_disabled(&self.label));
                }
            };
            match result {
                Ok(0) => {
                    self.recv.truncate(start);
                    return Err(self.fail("receive", eof()));
                }
                Ok(n) => {
                    self.recv.truncate(start + n);
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    self.recv.truncate(start);
                }
                Err(e) => {
                    self.recv.truncate(start);
                    return Err(self.fail("receive", e));
                }
            }
        }
    }

    fn fail(&mut self, op: &str, e: io::Error) -> BridgeError {
        self.disable(format!("{op} failed: {e}"));
        BridgeError::Io(e)
    }

    fn disable(&mut self, reason: String) {
        self.recv.clear();
        self.shut_off(reason);
    }

    /// Drop the stream and mark the link disabled, keeping buffered bytes.
    fn shut_off(&mut self, reason: String) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown();
        }
        warn!(link = %self.label, %reason, "[LINK] Disabling link");
        self.emit(LinkEvent::Disabled {
            label: self.label.clone(),
            reason: reason.clone(),
        });
        self.health = LinkHealth::Disabled(reason);
    }

    fn emit(&self, event: LinkEvent) {
        if let Some(monitor) = &self.monitor {
            // A dropped monitor receiver only means nobody is watching.
            let _ = monitor.send(event);
        }
    }
}

impl<S> Drop for BrokerLink<S>
where
    S: LinkStream,
{
    fn drop(&mut self) {
        self.close();
    }
}

impl<S> fmt::Debug for BrokerLink<S>
where
    S: LinkStream,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerLink")
            .field("label", &self.label)
            .field("health", &self.health)
            .field("buffered", &self.recv.len())
            .finish_non_exhaustive()
    }
}

fn eof() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "broker closed the connection")
}

fn lossy(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}
