//! Disque wire codec.
//!
//! Requests are RESP multi-bulk frames:
//!
//! ```text
//! *<N>\r\n
//! $<len>\r\n<bytes>\r\n      (repeated N times)
//! ```
//!
//! The first token is always the command name, followed by the primary
//! token (queue name) and the payload when they are non-empty, then the
//! option tokens in the order given. That order is part of the contract
//! with the broker.
//!
//! Replies are discriminated by their first byte; the byte-level reads live
//! on [`BrokerLink`](crate::link::BrokerLink).

use bytes::{BufMut, Bytes, BytesMut};
use wsdisque_core::error::{BridgeError, Result};

pub const CRLF: &[u8] = b"\r\n";

/// Reply sigils
pub const SIGIL_STATUS: u8 = b'+';
pub const SIGIL_ERROR: u8 = b'-';
pub const SIGIL_INTEGER: u8 = b':';
pub const SIGIL_BULK: u8 = b'$';
pub const SIGIL_ARRAY: u8 = b'*';

/// Reply type announced by the first byte of a broker reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// `+` simple status line
    Status,
    /// `-` error line
    Error,
    /// `:` integer line
    Integer,
    /// `$` bulk string
    Bulk,
    /// `*` array
    Array,
    /// Anything else; ignored by callers
    Unrecognized(u8),
}

impl ReplyKind {
    #[inline]
    #[must_use]
    pub const fn from_sigil(byte: u8) -> Self {
        match byte {
            SIGIL_STATUS => Self::Status,
            SIGIL_ERROR => Self::Error,
            SIGIL_INTEGER => Self::Integer,
            SIGIL_BULK => Self::Bulk,
            SIGIL_ARRAY => Self::Array,
            other => Self::Unrecognized(other),
        }
    }
}

/// Number of tokens a command will carry.
#[inline]
#[must_use]
pub fn token_count(primary: &str, payload: &[u8], options: usize) -> usize {
    1 + usize::from(!primary.is_empty()) + usize::from(!payload.is_empty()) + options
}

/// Encode a command into a fresh buffer.
///
/// # Examples
///
/// ```
/// use wsdisque_proto::codec::encode_command;
///
/// let frame = encode_command("FASTACK", "", b"", &["D-1", "D-2"]);
/// assert_eq!(&frame[..], b"*3\r\n$7\r\nFASTACK\r\n$3\r\nD-1\r\n$3\r\nD-2\r\n");
/// ```
pub fn encode_command<T: AsRef<[u8]>>(
    command: &str,
    primary: &str,
    payload: &[u8],
    options: &[T],
) -> Bytes {
    let mut out = BytesMut::with_capacity(encoded_len(command, primary, payload, options));
    encode_command_into(&mut out, command, primary, payload, options);
    out.freeze()
}

/// Encode a command, appending to `dst`.
pub fn encode_command_into<T: AsRef<[u8]>>(
    dst: &mut BytesMut,
    command: &str,
    primary: &str,
    payload: &[u8],
    options: &[T],
) {
    dst.reserve(encoded_len(command, primary, payload, options));

    dst.put_u8(SIGIL_ARRAY);
    put_decimal(dst, token_count(primary, payload, options.len()));
    dst.extend_from_slice(CRLF);

    put_bulk(dst, command.as_bytes());
    if !primary.is_empty() {
        put_bulk(dst, primary.as_bytes());
    }
    if !payload.is_empty() {
        put_bulk(dst, payload);
    }
    for option in options {
        put_bulk(dst, option.as_ref());
    }
}

/// Exact size of the encoded command.
fn encoded_len<T: AsRef<[u8]>>(command: &str, primary: &str, payload: &[u8], options: &[T]) -> usize {
    let count = token_count(primary, payload, options.len());
    let mut len = 1 + decimal_width(count) + 2;
    len += bulk_len(command.len());
    if !primary.is_empty() {
        len += bulk_len(primary.len());
    }
    if !payload.is_empty() {
        len += bulk_len(payload.len());
    }
    for option in options {
        len += bulk_len(option.as_ref().len());
    }
    len
}

#[inline]
fn bulk_len(body: usize) -> usize {
    1 + decimal_width(body) + 2 + body + 2
}

#[inline]
fn decimal_width(mut n: usize) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}

/// Helper: `$<len>\r\n<bytes>\r\n`
#[inline]
fn put_bulk(dst: &mut BytesMut, body: &[u8]) {
    dst.put_u8(SIGIL_BULK);
    put_decimal(dst, body.len());
    dst.extend_from_slice(CRLF);
    dst.extend_from_slice(body);
    dst.extend_from_slice(CRLF);
}

#[inline]
fn put_decimal(dst: &mut BytesMut, n: usize) {
    dst.extend_from_slice(n.to_string().as_bytes());
}

/// Parse the decimal body of a count or length line.
///
/// Surrounding whitespace is tolerated; anything else is a protocol violation.
pub fn parse_decimal(line: &[u8]) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .map(str::trim)
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            BridgeError::protocol(format!(
                "expected decimal, got {:?}",
                String::from_utf8_lossy(line)
            ))
        })
}

/// Parse a bulk length line into a byte count.
pub fn parse_length(line: &[u8]) -> Result<usize> {
    let n = parse_decimal(line)?;
    usize::try_from(n).map_err(|_| BridgeError::protocol(format!("negative bulk length {n}")))
}
