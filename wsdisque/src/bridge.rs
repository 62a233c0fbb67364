//! The bridge controller.
//!
//! A [`DisqueBridge`] owns the three broker links:
//!
//! - **producer**: ADDJOB, shared with the gateway through [`PublisherHandle`]
//! - **consumer**: GETJOB, drained on every tick
//! - **acker**: FASTACK for each drained batch
//!
//! Separate sockets keep a long dequeue from ever delaying an enqueue, and
//! acknowledgement traffic from contending with either.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use uuid::Uuid;
use wsdisque_core::error::Result;
use wsdisque_core::monitor::{LinkEventSender, LinkHealth};
use wsdisque_proto::{BrokerLink, JobPoller, Publisher, SessionSink};

use crate::config::BridgeConfig;
use crate::host::TickRegistry;

/// Link labels, as they appear in logs and monitor events.
pub const PRODUCER_LABEL: &str = "producer";
/// Consumer link label.
pub const CONSUMER_LABEL: &str = "consumer";
/// Acknowledger link label.
pub const ACKER_LABEL: &str = "acker";

/// The gateway side of the bridge.
///
/// Receives decoded lifecycle events (through [`SessionSink`]) and is handed
/// a [`PublisherHandle`] to send messages back to connections.
pub trait ServerContext: SessionSink {
    /// Called once by [`DisqueBridge::set_context`].
    fn set_publisher(&mut self, publisher: PublisherHandle);
}

/// Shared, serialised access to the producer link.
///
/// Clones share one socket; a mutex keeps concurrent publishes from
/// interleaving their frames.
#[derive(Clone)]
pub struct PublisherHandle {
    inner: Arc<Mutex<Publisher>>,
}

impl PublisherHandle {
    fn new(publisher: Publisher) -> Self {
        Self {
            inner: Arc::new(Mutex::new(publisher)),
        }
    }

    /// Enqueue `payload` for the connection (queue) `target`.
    ///
    /// Fire-and-forget: broker errors and link failures are only logged.
    /// An empty target is ignored.
    pub fn publish(&self, payload: &[u8], target: &str) {
        self.inner.lock().publish(payload, target);
    }

    /// Enqueue a text message.
    pub fn publish_text(&self, text: &str, target: &str) {
        self.inner.lock().publish_text(text, target);
    }

    /// Producer link health.
    pub fn health(&self) -> LinkHealth {
        self.inner.lock().link().health().clone()
    }

    fn close(&self) {
        self.inner.lock().close();
    }
}

impl fmt::Debug for PublisherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublisherHandle").finish_non_exhaustive()
    }
}

/// Closes a bridge from outside its tick.
#[derive(Debug, Clone)]
pub struct BridgeShutdown {
    closed: Arc<AtomicBool>,
    publisher: PublisherHandle,
}

impl BridgeShutdown {
    /// Close the producer link now; the next tick closes the consumer and
    /// acknowledger links and unregisters itself.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("[BRIDGE] Shutdown requested");
        }
        self.publisher.close();
    }

    /// Whether [`close`](Self::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Health of the three links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeHealth {
    /// ADDJOB link
    pub producer: LinkHealth,
    /// GETJOB link
    pub consumer: LinkHealth,
    /// FASTACK link
    pub acker: LinkHealth,
}

impl BridgeHealth {
    /// True when every link is connected.
    pub fn is_healthy(&self) -> bool {
        self.producer.is_connected() && self.consumer.is_connected() && self.acker.is_connected()
    }
}

/// Disque transport for one gateway context.
pub struct DisqueBridge<C> {
    id: Uuid,
    tick_name: String,
    publisher: PublisherHandle,
    poller: JobPoller,
    context: Option<C>,
    closed: Arc<AtomicBool>,
}

impl<C> DisqueBridge<C>
where
    C: ServerContext,
{
    /// Open the producer, consumer and acknowledger links.
    ///
    /// # Errors
    ///
    /// Fails if any of the three links cannot connect.
    pub fn connect(config: &BridgeConfig) -> Result<Self> {
        Self::open(config, None)
    }

    /// Like [`connect`](Self::connect), reporting link lifecycle events to
    /// `monitor`.
    pub fn connect_with_monitor(config: &BridgeConfig, monitor: LinkEventSender) -> Result<Self> {
        Self::open(config, Some(monitor))
    }

    fn open(config: &BridgeConfig, monitor: Option<LinkEventSender>) -> Result<Self> {
        let link = |label: &str| match &monitor {
            Some(tx) => BrokerLink::connect_with_monitor(
                label,
                config.endpoint(),
                config.link_options().clone(),
                tx.clone(),
            ),
            None => BrokerLink::connect(label, config.endpoint(), config.link_options().clone()),
        };

        let producer = link(PRODUCER_LABEL)?;
        let consumer = link(CONSUMER_LABEL)?;
        let acker = link(ACKER_LABEL)?;

        let id = Uuid::new_v4();
        let tick_name = format!("disque_{id}");
        info!(
            bridge = %tick_name,
            endpoint = %config.endpoint(),
            queue = config.context_queue(),
            mode = %config.data_mode(),
            "[BRIDGE] Connected"
        );

        Ok(Self {
            id,
            tick_name,
            publisher: PublisherHandle::new(Publisher::new(
                producer,
                config.add_options(),
                config.data_mode(),
            )),
            poller: JobPoller::new(consumer, acker, config.get_options())
                .with_max_rounds(config.max_batches_per_poll()),
            context: None,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Unique id of this bridge.
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Name used when registering the tick.
    pub fn tick_name(&self) -> &str {
        &self.tick_name
    }

    /// Install the gateway context and hand it the publisher.
    pub fn set_context(&mut self, mut context: C) {
        context.set_publisher(self.publisher.clone());
        self.context = Some(context);
    }

    /// The installed context, if any.
    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    /// Mutable access to the installed context.
    pub fn context_mut(&mut self) -> Option<&mut C> {
        self.context.as_mut()
    }

    /// Another handle to the producer link.
    pub fn publisher(&self) -> PublisherHandle {
        self.publisher.clone()
    }

    /// Handle that closes this bridge from elsewhere.
    pub fn shutdown_handle(&self) -> BridgeShutdown {
        BridgeShutdown {
            closed: self.closed.clone(),
            publisher: self.publisher.clone(),
        }
    }

    /// Health of every link.
    pub fn health(&self) -> BridgeHealth {
        BridgeHealth {
            producer: self.publisher.health(),
            consumer: self.poller.consumer().health().clone(),
            acker: self.poller.acker().health().clone(),
        }
    }

    /// One poll cycle into the context.
    ///
    /// Returns `false` only after shutdown. Without a context nothing is
    /// dequeued, so no job is acknowledged before someone can receive it.
    pub fn tick(&mut self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            self.poller.close();
            debug!(bridge = %self.tick_name, "[BRIDGE] Closed, leaving tick loop");
            return false;
        }
        match self.context.as_mut() {
            Some(context) => self.poller.poll(context),
            None => true,
        }
    }

    /// Close every link now.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.publisher.close();
        self.poller.close();
    }
}

impl<C> DisqueBridge<C>
where
    C: ServerContext + Send + 'static,
{
    /// Move the bridge into `host` under its tick name.
    pub fn register(self, host: &mut impl TickRegistry) {
        let name = self.tick_name.clone();
        let mut bridge = self;
        host.register_tick(name, Box::new(move || bridge.tick()));
    }
}

impl<C> Drop for DisqueBridge<C> {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.publisher.close();
        self.poller.close();
    }
}

impl<C> fmt::Debug for DisqueBridge<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisqueBridge")
            .field("tick_name", &self.tick_name)
            .field("has_context", &self.context.is_some())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
