#![no_main]

//! Feed arbitrary bytes to the poller as if the broker sent them.

use std::io::{self, Read, Write};
use std::time::Duration;

use libfuzzer_sys::fuzz_target;
use wsdisque_core::options::LinkOptions;
use wsdisque_proto::command::GetJobOptions;
use wsdisque_proto::{BrokerLink, JobPoller, LinkStream, SessionEvent};

/// Replays a fixed reply stream; EOF once it is consumed.
struct Replay {
    data: Vec<u8>,
    pos: usize,
}

impl Read for Replay {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for Replay {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LinkStream for Replay {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.data.len() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        self.read(buf)
    }

    fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(self.pos < self.data.len())
    }

    fn shutdown(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let options = LinkOptions::default().with_body_grace(Duration::ZERO);
    let consumer = BrokerLink::from_stream(
        "consumer",
        Replay {
            data: data.to_vec(),
            pos: 0,
        },
        options.clone(),
    );
    let acker = BrokerLink::from_stream(
        "acker",
        Replay {
            data: b":1\r\n".to_vec(),
            pos: 0,
        },
        options,
    );

    let mut poller = JobPoller::new(consumer, acker, &GetJobOptions::new("fuzz"));
    let mut events: Vec<SessionEvent> = Vec::new();
    let report = poller.poll_once(&mut events);
    assert!(report.dispatched <= report.jobs);
    assert!(poller.poll(&mut events));
});
