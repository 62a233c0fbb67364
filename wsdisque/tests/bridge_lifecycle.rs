//! DisqueBridge end to end against the in-process fake broker.

#[path = "../../wsdisque-proto/tests/common/mod.rs"]
mod common;

use bytes::Bytes;
use common::FakeDisque;
use wsdisque::monitor::{create_monitor, LinkEvent, LinkHealth};
use wsdisque::proto::{ConnectionState, Envelope, Kind};
use wsdisque::{
    BridgeConfig, ChannelSink, ConnectionId, DisconnectReason, DisqueBridge, MessageData,
    PublisherHandle, ServerContext, SessionEvent, SessionSink, TickHost,
};

const CONN: &str = "16fd2706-8baf-433b-82eb-8c7fada847da";

/// Forwards events to a channel and echoes every message back to its sender.
struct EchoContext {
    events: ChannelSink,
    publisher: Option<PublisherHandle>,
}

impl SessionSink for EchoContext {
    fn on_connected(&mut self, id: &ConnectionId, data: Bytes) {
        self.events.on_connected(id, data);
    }

    fn on_message(&mut self, id: &ConnectionId, data: MessageData) {
        if let Some(publisher) = &self.publisher {
            publisher.publish(data.as_bytes(), id.as_str());
        }
        self.events.on_message(id, data);
    }

    fn on_disconnected(&mut self, id: &ConnectionId, data: Bytes, reason: DisconnectReason) {
        self.events.on_disconnected(id, data, reason);
    }
}

impl ServerContext for EchoContext {
    fn set_publisher(&mut self, publisher: PublisherHandle) {
        self.publisher = Some(publisher);
    }
}

fn config(broker: &FakeDisque) -> BridgeConfig {
    BridgeConfig::new("ctx")
        .with_endpoint(broker.endpoint())
        .with_link_options(common::link_options())
}

fn context() -> (EchoContext, flume::Receiver<SessionEvent>) {
    let (events, rx) = ChannelSink::unbounded();
    (
        EchoContext {
            events,
            publisher: None,
        },
        rx,
    )
}

fn job(state: ConnectionState, payload: &[u8]) -> Bytes {
    let kind = match state {
        ConnectionState::StringMessage => Kind::String,
        ConnectionState::BinaryMessage => Kind::Binary,
        _ => Kind::Control,
    };
    Envelope::new(kind, state, CONN.parse().unwrap(), payload.to_vec()).encode()
}

#[test]
fn test_connect_names_tick_after_bridge_id() {
    let broker = FakeDisque::start();
    let bridge = DisqueBridge::<EchoContext>::connect(&config(&broker)).unwrap();

    assert_eq!(bridge.tick_name(), format!("disque_{}", bridge.id()));
    assert_eq!(bridge.tick_name().len(), "disque_".len() + 36);
    assert!(bridge.health().is_healthy());
}

#[test]
fn test_events_flow_and_replies_are_published() {
    wsdisque::dev_tracing::init_tracing();
    let broker = FakeDisque::start();
    let mut bridge = DisqueBridge::connect(&config(&broker)).unwrap();
    let (ctx, rx) = context();
    bridge.set_context(ctx);
    assert!(bridge.context().is_some_and(|c| c.publisher.is_some()));

    broker.push_job("ctx", &job(ConnectionState::Connect, b""));
    broker.push_job("ctx", &job(ConnectionState::StringMessage, b"ping"));
    broker.push_job("ctx", &job(ConnectionState::DisconnectAckFailed, b""));

    assert!(bridge.tick());

    let events: Vec<SessionEvent> = rx.drain().collect();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], SessionEvent::Connected { .. }));
    assert_eq!(
        events[1],
        SessionEvent::Message {
            connection_id: CONN.parse().unwrap(),
            data: MessageData::Text("ping".into()),
        }
    );
    match &events[2] {
        SessionEvent::Disconnected { reason, .. } => {
            assert_eq!(reason.tag(), "accidential disconnect.");
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(broker.acked().len(), 3);
    // The echo went out on the producer link, addressed to the connection
    assert_eq!(broker.queued(CONN), 1);
}

#[test]
fn test_no_context_means_no_dequeue() {
    let broker = FakeDisque::start();
    let mut bridge = DisqueBridge::<EchoContext>::connect(&config(&broker)).unwrap();
    broker.push_job("ctx", &job(ConnectionState::Connect, b""));

    assert!(bridge.tick());
    assert_eq!(broker.queued("ctx"), 1);
    assert!(broker.acked().is_empty());
}

#[test]
fn test_publisher_handle_is_fire_and_forget() {
    let broker = FakeDisque::start();
    let bridge = DisqueBridge::<EchoContext>::connect(&config(&broker)).unwrap();
    let publisher = bridge.publisher();

    publisher.publish(b"", "");
    publisher.publish_text("hi", CONN);
    assert_eq!(broker.queued(CONN), 1);
    assert_eq!(broker.command_names(), ["ADDJOB"]);
}

#[test]
fn test_shutdown_closes_links_and_unregisters() {
    let broker = FakeDisque::start();
    let mut bridge = DisqueBridge::connect(&config(&broker)).unwrap();
    let (ctx, _rx) = context();
    bridge.set_context(ctx);
    let shutdown = bridge.shutdown_handle();
    let publisher = bridge.publisher();

    let mut host = TickHost::new();
    bridge.register(&mut host);
    assert_eq!(host.run_once(), 1);

    shutdown.close();
    assert!(shutdown.is_closed());
    assert_eq!(publisher.health(), LinkHealth::Closed);

    // Publishing after shutdown is a silent no-op
    publisher.publish(b"late", CONN);
    assert_eq!(broker.queued(CONN), 0);

    assert_eq!(host.run_once(), 0);
    assert!(host.is_empty());
}

#[test]
fn test_health_and_monitor_events() {
    let broker = FakeDisque::start();
    let (tx, rx) = create_monitor();
    let mut bridge = DisqueBridge::<EchoContext>::connect_with_monitor(&config(&broker), tx).unwrap();

    let labels: Vec<String> = rx
        .drain()
        .map(|event| match event {
            LinkEvent::Connected { label, .. } => label,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(labels, ["producer", "consumer", "acker"]);

    bridge.close();
    let health = bridge.health();
    assert_eq!(health.consumer, LinkHealth::Closed);
    assert_eq!(health.acker, LinkHealth::Closed);
    assert!(!health.is_healthy());
    assert!(!bridge.tick());
}

#[test]
fn test_connect_failure_is_reported() {
    let config = BridgeConfig::new("ctx").with_endpoint(common::closed_endpoint());
    let err = DisqueBridge::<EchoContext>::connect(&config).unwrap_err();
    assert!(err.is_link_failure());
}
