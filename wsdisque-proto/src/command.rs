//! Disque commands used by the bridge and their option tokens.
//!
//! Only three commands are spoken:
//!
//! - `ADDJOB <queue> <payload> <ms-timeout> [REPLICATE n] [DELAY s] [RETRY s] [TTL s] [MAXLEN n] [ASYNC]`
//! - `GETJOB [NOHANG] [TIMEOUT ms] COUNT <k> FROM <queue>`
//! - `FASTACK <id> [<id> ...]`

use std::time::Duration;

pub const ADDJOB: &str = "ADDJOB";
pub const GETJOB: &str = "GETJOB";
pub const FASTACK: &str = "FASTACK";

/// Default number of jobs requested per GETJOB.
pub const DEFAULT_GET_COUNT: usize = 1000;

/// Options for the batched dequeue request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetJobOptions {
    /// Queue jobs are taken from (the bridge's context queue).
    pub queue: String,
    /// Maximum jobs per reply.
    pub count: usize,
    /// Return a null reply instead of blocking when the queue is empty.
    pub nohang: bool,
    /// Broker-side blocking timeout.
    pub timeout: Option<Duration>,
}

impl GetJobOptions {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            count: DEFAULT_GET_COUNT,
            nohang: false,
            timeout: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count.max(1);
        self
    }

    pub fn with_nohang(mut self, nohang: bool) -> Self {
        self.nohang = nohang;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Option tokens, in wire order.
    ///
    /// With defaults this is exactly `count <k> from <queue>`.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = Vec::with_capacity(6);
        if self.nohang {
            tokens.push("nohang".to_string());
        }
        if let Some(timeout) = self.timeout {
            tokens.push("timeout".to_string());
            tokens.push(timeout.as_millis().to_string());
        }
        tokens.push("count".to_string());
        tokens.push(self.count.to_string());
        tokens.push("from".to_string());
        tokens.push(self.queue.clone());
        tokens
    }
}

/// Options for the enqueue request.
///
/// The first token is the ADDJOB command timeout in milliseconds; `0`
/// leaves it to the broker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddJobOptions {
    pub timeout_ms: u64,
    pub replicate: Option<u32>,
    pub delay: Option<Duration>,
    pub retry: Option<Duration>,
    pub ttl: Option<Duration>,
    pub maxlen: Option<u64>,
    pub asynchronous: bool,
}

impl AddJobOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn with_replicate(mut self, copies: u32) -> Self {
        self.replicate = Some(copies);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_retry(mut self, retry: Duration) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_maxlen(mut self, maxlen: u64) -> Self {
        self.maxlen = Some(maxlen);
        self
    }

    pub fn with_async(mut self, asynchronous: bool) -> Self {
        self.asynchronous = asynchronous;
        self
    }

    /// Option tokens, in wire order. Defaults yield `["0"]`.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens = vec![self.timeout_ms.to_string()];
        if let Some(copies) = self.replicate {
            tokens.push("REPLICATE".to_string());
            tokens.push(copies.to_string());
        }
        for (name, value) in [("DELAY", self.delay), ("RETRY", self.retry), ("TTL", self.ttl)] {
            if let Some(value) = value {
                tokens.push(name.to_string());
                tokens.push(value.as_secs().to_string());
            }
        }
        if let Some(maxlen) = self.maxlen {
            tokens.push("MAXLEN".to_string());
            tokens.push(maxlen.to_string());
        }
        if self.asynchronous {
            tokens.push("ASYNC".to_string());
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getjob_default_tokens() {
        let opts = GetJobOptions::new("ctx-queue");
        assert_eq!(opts.tokens(), ["count", "1000", "from", "ctx-queue"]);
    }

    #[test]
    fn test_getjob_nohang_and_timeout_precede_count() {
        let opts = GetJobOptions::new("q")
            .with_count(10)
            .with_nohang(true)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(
            opts.tokens(),
            ["nohang", "timeout", "250", "count", "10", "from", "q"]
        );
    }

    #[test]
    fn test_addjob_default_tokens() {
        assert_eq!(AddJobOptions::default().tokens(), ["0"]);
    }

    #[test]
    fn test_addjob_full_tokens() {
        let opts = AddJobOptions::new()
            .with_timeout_ms(500)
            .with_replicate(2)
            .with_retry(Duration::from_secs(30))
            .with_ttl(Duration::from_secs(3600))
            .with_maxlen(10_000)
            .with_async(true);
        assert_eq!(
            opts.tokens(),
            ["500", "REPLICATE", "2", "RETRY", "30", "TTL", "3600", "MAXLEN", "10000", "ASYNC"]
        );
    }
}
