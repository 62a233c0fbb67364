//! Scripted in-memory stream standing in for a broker connection.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::time::Duration;

use crate::stream::LinkStream;

#[derive(Default)]
struct Script {
    inbound: VecDeque<u8>,
    replies: VecDeque<Vec<u8>>,
    outbound: Vec<u8>,
    writes: usize,
    fail_writes: bool,
    hang_up: bool,
    shut_down: bool,
}

/// Cloneable handle: the test keeps one clone, the link owns the other.
#[derive(Clone, Default)]
pub(crate) struct ScriptedStream {
    script: Rc<RefCell<Script>>,
}

impl ScriptedStream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bytes readable right away.
    pub(crate) fn preload(&self, bytes: &[u8]) -> &Self {
        self.script.borrow_mut().inbound.extend(bytes);
        self
    }

    /// Bytes released after the next write, like a broker answering a command.
    pub(crate) fn reply(&self, bytes: &[u8]) -> &Self {
        self.script.borrow_mut().replies.push_back(bytes.to_vec());
        self
    }

    /// Report end of stream once every released byte has been read.
    pub(crate) fn hang_up_when_drained(&self) -> &Self {
        self.script.borrow_mut().hang_up = true;
        self
    }

    pub(crate) fn fail_writes(&self) {
        self.script.borrow_mut().fail_writes = true;
    }

    pub(crate) fn written(&self) -> Vec<u8> {
        self.script.borrow().outbound.clone()
    }

    pub(crate) fn writes(&self) -> usize {
        self.script.borrow().writes
    }

    pub(crate) fn unread(&self) -> usize {
        self.script.borrow().inbound.len()
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        self.script.borrow().shut_down
    }
}

impl Read for ScriptedStream {
    // An empty script reads as EOF so a test never hangs on a blocking read.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut script = self.script.borrow_mut();
        let n = buf.len().min(script.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(script.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut script = self.script.borrow_mut();
        if script.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure"));
        }
        script.outbound.extend_from_slice(buf);
        script.writes += 1;
        if let Some(reply) = script.replies.pop_front() {
            script.inbound.extend(reply);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LinkStream for ScriptedStream {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let script = self.script.borrow();
        if script.inbound.is_empty() && !script.hang_up {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        drop(script);
        self.read(buf)
    }

    fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        let script = self.script.borrow();
        Ok(!script.inbound.is_empty() || script.hang_up)
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.script.borrow_mut().shut_down = true;
        Ok(())
    }
}
