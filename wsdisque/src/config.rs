//! Bridge configuration.

use std::time::Duration;

use wsdisque_core::endpoint::{BrokerEndpoint, EndpointError};
use wsdisque_core::options::LinkOptions;
use wsdisque_proto::command::{AddJobOptions, GetJobOptions};
use wsdisque_proto::DataMode;

/// Everything [`DisqueBridge::connect`](crate::DisqueBridge::connect) needs.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use wsdisque::{BridgeConfig, DataMode};
///
/// let config = BridgeConfig::new("gateway-1")
///     .with_endpoint_str("tcp://127.0.0.1:7711")?
///     .with_data_mode(DataMode::String)
///     .with_get_count(100)
///     .with_max_batches_per_poll(4);
///
/// assert_eq!(config.context_queue(), "gateway-1");
/// # Ok::<(), wsdisque::endpoint::EndpointError>(())
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    endpoint: BrokerEndpoint,
    get_options: GetJobOptions,
    add_options: AddJobOptions,
    data_mode: DataMode,
    link_options: LinkOptions,
    max_batches_per_poll: Option<usize>,
}

impl BridgeConfig {
    /// Configuration consuming jobs from `context_queue` on the default
    /// endpoint (`127.0.0.1:7711`).
    pub fn new(context_queue: impl Into<String>) -> Self {
        Self {
            endpoint: BrokerEndpoint::default(),
            get_options: GetJobOptions::new(context_queue),
            add_options: AddJobOptions::default(),
            data_mode: DataMode::default(),
            link_options: LinkOptions::default(),
            max_batches_per_poll: None,
        }
    }

    /// Broker address.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: BrokerEndpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Parse and set the broker address.
    ///
    /// # Errors
    ///
    /// Returns the parse error for a malformed endpoint string.
    pub fn with_endpoint_str(self, endpoint: &str) -> Result<Self, EndpointError> {
        Ok(self.with_endpoint(endpoint.parse()?))
    }

    /// Jobs requested per GETJOB.
    #[must_use]
    pub fn with_get_count(mut self, count: usize) -> Self {
        self.get_options = self.get_options.with_count(count);
        self
    }

    /// Ask the broker not to block GETJOB on an empty queue.
    #[must_use]
    pub fn with_nohang(mut self, nohang: bool) -> Self {
        self.get_options = self.get_options.with_nohang(nohang);
        self
    }

    /// Broker-side GETJOB blocking timeout.
    #[must_use]
    pub fn with_get_timeout(mut self, timeout: Duration) -> Self {
        self.get_options = self.get_options.with_timeout(timeout);
        self
    }

    /// Options appended to every ADDJOB.
    #[must_use]
    pub fn with_add_options(mut self, options: AddJobOptions) -> Self {
        self.add_options = options;
        self
    }

    /// How published payloads are put on the wire.
    #[must_use]
    pub fn with_data_mode(mut self, mode: DataMode) -> Self {
        self.data_mode = mode;
        self
    }

    /// Socket options shared by the three links.
    #[must_use]
    pub fn with_link_options(mut self, options: LinkOptions) -> Self {
        self.link_options = options;
        self
    }

    /// Bound the GETJOB requests made by one poll.
    #[must_use]
    pub fn with_max_batches_per_poll(mut self, max: usize) -> Self {
        self.max_batches_per_poll = Some(max.max(1));
        self
    }

    /// Queue this bridge consumes from.
    pub fn context_queue(&self) -> &str {
        &self.get_options.queue
    }

    /// Broker address.
    pub const fn endpoint(&self) -> &BrokerEndpoint {
        &self.endpoint
    }

    /// GETJOB options.
    pub const fn get_options(&self) -> &GetJobOptions {
        &self.get_options
    }

    /// ADDJOB options.
    pub const fn add_options(&self) -> &AddJobOptions {
        &self.add_options
    }

    /// Publish data mode.
    pub const fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    /// Link socket options.
    pub const fn link_options(&self) -> &LinkOptions {
        &self.link_options
    }

    /// Optional bound on GETJOB requests per poll.
    pub const fn max_batches_per_poll(&self) -> Option<usize> {
        self.max_batches_per_poll
    }
}
