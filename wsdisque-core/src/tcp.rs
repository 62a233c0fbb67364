//! TCP utilities for broker links.
//!
//! Opens the blocking TCP stream a link owns and applies the socket-level
//! settings from [`LinkOptions`] through `socket2`.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};

use socket2::{SockRef, TcpKeepalive};
use tracing::{debug, trace};

use crate::endpoint::BrokerEndpoint;
use crate::options::LinkOptions;

/// Enable TCP_NODELAY on a stream.
///
/// Commands are small and each one waits for its own reply, so Nagle's
/// algorithm would only add latency.
///
/// # Errors
///
/// Returns an error if the socket option cannot be set.
#[inline]
pub fn enable_tcp_nodelay(stream: &TcpStream) -> io::Result<()> {
    SockRef::from(stream).set_nodelay(true)
}

/// Apply keepalive settings when the options ask for them.
pub fn configure_tcp_keepalive(stream: &TcpStream, options: &LinkOptions) -> io::Result<()> {
    if !options.tcp_keepalive {
        return Ok(());
    }
    let sock = SockRef::from(stream);
    match options.tcp_keepalive_idle {
        Some(idle) => sock.set_tcp_keepalive(&TcpKeepalive::new().with_time(idle)),
        None => sock.set_keepalive(true),
    }
}

/// Connect to the broker and configure the stream for link use.
///
/// Every resolved address is tried in order; the last failure is returned
/// when none of them accepts the connection.
pub fn connect(endpoint: &BrokerEndpoint, options: &LinkOptions) -> io::Result<TcpStream> {
    let authority = endpoint.authority();
    let mut last_err = None;

    for addr in authority.to_socket_addrs()? {
        trace!(%addr, "[TCP] Connecting");
        let attempt = if options.connect_timeout.is_zero() {
            TcpStream::connect(addr)
        } else {
            TcpStream::connect_timeout(&addr, options.connect_timeout)
        };
        match attempt {
            Ok(stream) => {
                configure_stream(&stream, options)?;
                debug!(%addr, "[TCP] Connected");
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{authority} did not resolve to any address"),
        )
    }))
}

/// Apply nodelay, send timeout and keepalive to a connected stream.
pub fn configure_stream(stream: &TcpStream, options: &LinkOptions) -> io::Result<()> {
    enable_tcp_nodelay(stream)?;
    // A zero timeout is rejected by the OS, treat it as "no timeout".
    let send_timeout = options.send_timeout.filter(|t| !t.is_zero());
    stream.set_write_timeout(send_timeout)?;
    configure_tcp_keepalive(stream, options)?;
    Ok(())
}
