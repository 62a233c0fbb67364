//! Job poller: drain, acknowledge, dispatch.
//!
//! One poll cycle:
//!
//! 1. Send `GETJOB` on the consumer link until a request finds no reply
//!    bytes waiting, the broker answers with an empty batch, or the batch
//!    bound is reached.
//! 2. Collect `(id, payload)` for every job, in reply order.
//! 3. Send one `FASTACK` with every collected id on the acknowledger link.
//!    The id list is dropped afterwards whatever the broker answers.
//! 4. Decode each payload as an [`Envelope`] and dispatch it to the sink,
//!    in the same order.
//!
//! A protocol violation while draining stops the drain. Jobs already read
//! completely are still acknowledged and dispatched; the half-read batch
//! is discarded from the consumer buffer.

use std::net::TcpStream;

use bytes::Bytes;
use tracing::{debug, error, trace, warn};
use wsdisque_core::error::{BridgeError, Result};

use crate::codec::{parse_decimal, parse_length, ReplyKind, SIGIL_ARRAY, SIGIL_BULK};
use crate::command::{GetJobOptions, FASTACK, GETJOB};
use crate::envelope::Envelope;
use crate::link::{BrokerLink, SimpleReply};
use crate::session::{dispatch, SessionSink};
use crate::stream::LinkStream;

/// Elements of one job entry in a GETJOB reply: queue, id, body.
const JOB_ELEMENTS: i64 = 3;

/// What one poll cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// GETJOB requests answered during the drain
    pub rounds: usize,
    /// Jobs read completely
    pub jobs: usize,
    /// Ids carried by the FASTACK request
    pub acked: usize,
    /// Envelopes handed to the sink
    pub dispatched: usize,
    /// Payloads that did not decode as an envelope
    pub malformed: usize,
    /// Envelopes with a state the sink has no callback for
    pub ignored: usize,
    /// `-` replies to GETJOB
    pub broker_errors: usize,
    /// The drain stopped on a malformed reply
    pub protocol_violation: bool,
}

/// Jobs collected during one cycle.
#[derive(Debug, Default)]
struct Batch {
    ids: Vec<String>,
    payloads: Vec<Bytes>,
}

pub struct JobPoller<S = TcpStream>
where
    S: LinkStream,
{
    consumer: BrokerLink<S>,
    acker: BrokerLink<S>,
    get_tokens: Vec<String>,
    max_rounds: Option<usize>,
}

impl<S> JobPoller<S>
where
    S: LinkStream,
{
    pub fn new(consumer: BrokerLink<S>, acker: BrokerLink<S>, options: &GetJobOptions) -> Self {
        Self {
            consumer,
            acker,
            get_tokens: options.tokens(),
            max_rounds: None,
        }
    }

    /// Bound the number of GETJOB requests per cycle.
    ///
    /// `None` drains until the broker has nothing buffered.
    #[must_use]
    pub fn with_max_rounds(mut self, max_rounds: Option<usize>) -> Self {
        self.max_rounds = max_rounds.map(|n| n.max(1));
        self
    }

    #[inline]
    pub const fn consumer(&self) -> &BrokerLink<S> {
        &self.consumer
    }

    #[inline]
    pub const fn acker(&self) -> &BrokerLink<S> {
        &self.acker
    }

    /// Tick entry point. Always asks to be scheduled again.
    pub fn poll<K: SessionSink + ?Sized>(&mut self, sink: &mut K) -> bool {
        let report = self.poll_once(sink);
        if report.jobs > 0 || report.protocol_violation {
            debug!(?report, "[GETJOB] Poll cycle complete");
        }
        true
    }

    /// Run one full cycle and report what happened.
    pub fn poll_once<K: SessionSink + ?Sized>(&mut self, sink: &mut K) -> PollReport {
        let mut report = PollReport::default();
        let mut batch = Batch::default();

        if let Err(e) = self.drain(&mut batch, &mut report) {
            if e.is_protocol_violation() {
                let discarded = self.consumer.discard_buffered();
                error!(
                    error = %e,
                    jobs = batch.ids.len(),
                    discarded,
                    "[GETJOB] Malformed reply, drain aborted"
                );
                report.protocol_violation = true;
            } else {
                // Link failures were already reported by the link itself.
                debug!(error = %e, "[GETJOB] Drain stopped");
            }
        }

        self.acknowledge(&batch.ids, &mut report);

        for payload in batch.payloads {
            match Envelope::decode(&payload) {
                Ok(envelope) => {
                    if dispatch(envelope, sink) {
                        report.dispatched += 1;
                    } else {
                        report.ignored += 1;
                    }
                }
                Err(e) => {
                    warn!(error = %e, len = payload.len(), "[ENVELOPE] Dropping malformed job payload");
                    report.malformed += 1;
                }
            }
        }

        report
    }

    /// Close both links.
    pub fn close(&mut self) {
        self.consumer.close();
        self.acker.close();
    }

    fn drain(&mut self, batch: &mut Batch, report: &mut PollReport) -> Result<()> {
        loop {
            if self.max_rounds.is_some_and(|max| report.rounds >= max) {
                trace!(rounds = report.rounds, "[GETJOB] Round limit reached");
                return Ok(());
            }

            let available = self.consumer.send_command(GETJOB, "", b"", &self.get_tokens);
            if available == 0 {
                return Ok(());
            }
            report.rounds += 1;

            let sigil = self.consumer.read_first_byte()?;
            match ReplyKind::from_sigil(sigil) {
                ReplyKind::Error => {
                    let line = self.consumer.read_line()?;
                    warn!(reply = %String::from_utf8_lossy(&line), "[GETJOB] Broker error");
                    report.broker_errors += 1;
                }
                ReplyKind::Array => {
                    let count = parse_decimal(&self.consumer.read_line()?)?;
                    if count <= 0 {
                        trace!(count, "[GETJOB] No jobs");
                        return Ok(());
                    }
                    trace!(count, "[GETJOB] Batch");
                    for _ in 0..count {
                        let (id, payload) = self.read_job()?;
                        batch.ids.push(id);
                        batch.payloads.push(payload);
                        report.jobs += 1;
                    }
                }
                ReplyKind::Status | ReplyKind::Integer | ReplyKind::Bulk | ReplyKind::Unrecognized(_) => {
                    trace!(sigil, "[GETJOB] Ignoring unexpected reply byte");
                }
            }
        }
    }

    /// Read one `[queue, id, body, ...]` job entry.
    fn read_job(&mut self) -> Result<(String, Bytes)> {
        self.expect_sigil(SIGIL_ARRAY)?;
        let elements = parse_decimal(&self.consumer.read_line()?)?;
        if elements < JOB_ELEMENTS {
            return Err(BridgeError::protocol(format!(
                "job entry has {elements} elements"
            )));
        }

        // Queue name: not needed
        self.expect_sigil(SIGIL_BULK)?;
        self.consumer.read_line()?;
        self.consumer.read_line()?;

        self.expect_sigil(SIGIL_BULK)?;
        self.consumer.read_line()?;
        let id = String::from_utf8_lossy(&self.consumer.read_line()?).into_owned();

        self.expect_sigil(SIGIL_BULK)?;
        let len = parse_length(&self.consumer.read_line()?)?;
        let payload = self.consumer.read_exact(len)?;

        for _ in JOB_ELEMENTS..elements {
            self.consumer.skip_value()?;
        }

        trace!(%id, len, "[GETJOB] Job");
        Ok((id, payload))
    }

    fn expect_sigil(&mut self, expected: u8) -> Result<()> {
        let sigil = self.consumer.read_first_byte()?;
        if sigil != expected {
            return Err(BridgeError::protocol(format!(
                "expected '{}' got 0x{sigil:02x}",
                char::from(expected)
            )));
        }
        Ok(())
    }

    fn acknowledge(&mut self, ids: &[String], report: &mut PollReport) {
        if ids.is_empty() {
            return;
        }
        report.acked = ids.len();

        let available = self.acker.send_command(FASTACK, "", b"", ids);
        debug!(jobs = ids.len(), available, "[FASTACK] Sent");
        if available == 0 {
            return;
        }

        let reply = self
            .acker
            .read_first_byte()
            .and_then(|sigil| self.acker.read_simple_reply(sigil));
        match reply {
            Ok(SimpleReply::Error(message)) => warn!(reply = %message, "[FASTACK] Broker error"),
            Ok(SimpleReply::Integer(n)) => debug!(acked = n, "[FASTACK] Acknowledged"),
            Ok(SimpleReply::Status(status)) => debug!(%status, "[FASTACK] Status"),
            Ok(SimpleReply::Unrecognized(sigil)) => trace!(sigil, "[FASTACK] Unexpected reply byte"),
            Err(e) => warn!(error = %e, "[FASTACK] Reading reply failed"),
        }
    }
}
