//! Envelope codec.
//!
//! Every job payload is an envelope that multiplexes one connection
//! lifecycle event and its bytes into a single queue message:
//!
//! ```text
//! +------+-------+----------------------+-----------------+
//! | kind | state | connection id (36B)  | payload ...     |
//! +------+-------+----------------------+-----------------+
//!   0      1       2..38                  38..
//! ```
//!
//! `kind` and `state` are single ASCII markers. The connection id is the
//! textual UUID of the gateway connection.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const CONNECTION_ID_LEN: usize = 36;

/// Size of the fixed envelope header.
pub const HEADER_LEN: usize = 2 + CONNECTION_ID_LEN;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("envelope too short: {len} bytes, need at least {HEADER_LEN}")]
    TooShort { len: usize },

    #[error("unknown envelope kind 0x{0:02x}")]
    UnknownKind(u8),

    #[error("connection id must be {CONNECTION_ID_LEN} ASCII bytes")]
    InvalidConnectionId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    Binary,
    Control,
}

impl Kind {
    #[inline]
    #[must_use]
    pub const fn marker(self) -> u8 {
        match self {
            Self::String => b's',
            Self::Binary => b'b',
            Self::Control => b'c',
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_marker(byte: u8) -> Option<Self> {
        match byte {
            b's' => Some(Self::String),
            b'b' => Some(Self::Binary),
            b'c' => Some(Self::Control),
            _ => None,
        }
    }
}

/// Connection lifecycle state carried by an envelope.
///
/// States outside the known set survive decoding as `Unrecognized` so that
/// newer producers never break older consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connect,
    StringMessage,
    BinaryMessage,
    DisconnectIntentional,
    DisconnectAccidental,
    DisconnectAckFailed,
    DisconnectSendFailed,
    Unrecognized(u8),
}

impl ConnectionState {
    #[must_use]
    pub const fn marker(self) -> u8 {
        match self {
            Self::Connect => b'1',
            Self::StringMessage => b'2',
            Self::BinaryMessage => b'3',
            Self::DisconnectIntentional => b'4',
            Self::DisconnectAccidental => b'5',
            Self::DisconnectAckFailed => b'6',
            Self::DisconnectSendFailed => b'7',
            Self::Unrecognized(byte) => byte,
        }
    }

    #[must_use]
    pub const fn from_marker(byte: u8) -> Self {
        match byte {
            b'1' => Self::Connect,
            b'2' => Self::StringMessage,
            b'3' => Self::BinaryMessage,
            b'4' => Self::DisconnectIntentional,
            b'5' => Self::DisconnectAccidental,
            b'6' => Self::DisconnectAckFailed,
            b'7' => Self::DisconnectSendFailed,
            other => Self::Unrecognized(other),
        }
    }

    /// Disconnect reason for the disconnect states.
    #[must_use]
    pub const fn disconnect_reason(self) -> Option<DisconnectReason> {
        match self {
            Self::DisconnectIntentional => Some(DisconnectReason::Intentional),
            Self::DisconnectAccidental => Some(DisconnectReason::Accidental),
            Self::DisconnectAckFailed => Some(DisconnectReason::AckFailed),
            Self::DisconnectSendFailed => Some(DisconnectReason::SendFailed),
            Self::Connect
            | Self::StringMessage
            | Self::BinaryMessage
            | Self::Unrecognized(_) => None,
        }
    }
}

/// Why a connection went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// The client closed the connection.
    Intentional,
    /// The connection dropped without a close handshake.
    Accidental,
    /// The broker failed to acknowledge a prior send.
    AckFailed,
    /// Delivery to the client failed.
    SendFailed,
}

impl DisconnectReason {
    /// Human readable tag handed to the session layer.
    ///
    /// `Accidental` and `AckFailed` share a tag; gateways match on these
    /// exact strings, spelling included.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Intentional => "intentional disconnect.",
            Self::Accidental | Self::AckFailed => "accidential disconnect.",
            Self::SendFailed => "send failed to client. disconnect.",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// 36-byte ASCII connection id (UUID text form).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId([u8; CONNECTION_ID_LEN]);

impl ConnectionId {
    /// # Errors
    ///
    /// [`EnvelopeError::InvalidConnectionId`] unless `bytes` is exactly 36
    /// ASCII bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let id: [u8; CONNECTION_ID_LEN] = bytes
            .try_into()
            .map_err(|_| EnvelopeError::InvalidConnectionId)?;
        if !id.is_ascii() {
            return Err(EnvelopeError::InvalidConnectionId);
        }
        Ok(Self(id))
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; CONNECTION_ID_LEN] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl std::str::FromStr for ConnectionId {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub kind: Kind,
    pub state: ConnectionState,
    pub connection_id: ConnectionId,
    pub payload: Bytes,
}

impl Envelope {
    pub fn new(
        kind: Kind,
        state: ConnectionState,
        connection_id: ConnectionId,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            kind,
            state,
            connection_id,
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }

    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_u8(self.kind.marker());
        dst.put_u8(self.state.marker());
        dst.extend_from_slice(self.connection_id.as_bytes());
        dst.extend_from_slice(&self.payload);
    }

    /// Decode a job payload.
    ///
    /// The payload is sliced out of `data` without copying. An unknown
    /// state is not an error.
    pub fn decode(data: &Bytes) -> Result<Self, EnvelopeError> {
        if data.len() < HEADER_LEN {
            return Err(EnvelopeError::TooShort { len: data.len() });
        }
        let kind = Kind::from_marker(data[0]).ok_or(EnvelopeError::UnknownKind(data[0]))?;
        let state = ConnectionState::from_marker(data[1]);
        let connection_id = ConnectionId::from_bytes(&data[2..HEADER_LEN])?;

        Ok(Self {
            kind,
            state,
            connection_id,
            payload: data.slice(HEADER_LEN..),
        })
    }
}
