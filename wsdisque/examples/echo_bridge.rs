//! Echo gateway over a Disque node.
//!
//! Consumes lifecycle events from the `echo` queue and sends every message
//! back to the connection it came from. Needs a Disque node, by default on
//! 127.0.0.1:7711.
//!
//! ```text
//! RUST_LOG=debug cargo run --example echo_bridge -- tcp://127.0.0.1:7711 disque_string
//! ```

use std::time::Duration;

use wsdisque::prelude::*;

struct EchoGateway {
    publisher: Option<PublisherHandle>,
}

impl SessionSink for EchoGateway {
    fn on_connected(&mut self, id: &ConnectionId, data: Bytes) {
        println!("[{id}] connected ({} bytes of context)", data.len());
    }

    fn on_message(&mut self, id: &ConnectionId, data: MessageData) {
        match &data {
            MessageData::Text(text) => println!("[{id}] text: {text}"),
            MessageData::Binary(bytes) => println!("[{id}] binary: {} bytes", bytes.len()),
        }
        if let Some(publisher) = &self.publisher {
            publisher.publish(data.as_bytes(), id.as_str());
        }
    }

    fn on_disconnected(&mut self, id: &ConnectionId, _data: Bytes, reason: DisconnectReason) {
        println!("[{id}] {reason}");
    }
}

impl ServerContext for EchoGateway {
    fn set_publisher(&mut self, publisher: PublisherHandle) {
        self.publisher = Some(publisher);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    wsdisque::dev_tracing::init_tracing();

    let mut args = std::env::args().skip(1);
    let endpoint = args.next().unwrap_or_else(|| "tcp://127.0.0.1:7711".to_string());
    let mode: DataMode = args.next().as_deref().unwrap_or("disque_binary").parse()?;

    let config = BridgeConfig::new("echo")
        .with_endpoint_str(&endpoint)?
        .with_data_mode(mode)
        .with_get_timeout(Duration::from_millis(100))
        .with_max_batches_per_poll(8);

    let mut bridge = DisqueBridge::connect(&config)?;
    bridge.set_context(EchoGateway { publisher: None });
    println!("bridge {} consuming from '{}'", bridge.tick_name(), config.context_queue());

    let mut host = TickHost::new();
    bridge.register(&mut host);
    host.run(Duration::from_millis(20));
    Ok(())
}
