//! Transport abstraction under a [`BrokerLink`](crate::link::BrokerLink).
//!
//! A link needs three things from its stream beyond blocking `Read` and
//! `Write`: a read that never blocks (to learn what the broker has already
//! delivered), a bounded wait for readability, and shutdown.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

pub trait LinkStream: Read + Write {
    /// Read whatever is already delivered without blocking.
    ///
    /// Returns `Err(WouldBlock)` when nothing is pending and `Ok(0)` at EOF.
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Wait up to `timeout` for at least one byte to become readable.
    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Release the underlying socket.
    fn shutdown(&mut self) -> io::Result<()>;
}

impl LinkStream for TcpStream {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.set_nonblocking(true)?;
        let result = self.read(buf);
        self.set_nonblocking(false)?;
        result
    }

    fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        if timeout.is_zero() {
            return Ok(false);
        }
        self.set_read_timeout(Some(timeout))?;
        let mut probe = [0u8; 1];
        let result = self.peek(&mut probe);
        self.set_read_timeout(None)?;
        match result {
            Ok(n) => Ok(n > 0),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn shutdown(&mut self) -> io::Result<()> {
        match TcpStream::shutdown(self, Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}
