//! Integration tests for link options and endpoint configuration

use std::time::Duration;
use wsdisque_core::endpoint::BrokerEndpoint;
use wsdisque_core::options::LinkOptions;

#[test]
fn test_read_bounds_options() {
    let opts = LinkOptions::new()
        .with_line_capacity(4096)
        .with_read_chunk_size(16384)
        .with_body_grace(Duration::from_millis(250));

    assert_eq!(opts.line_capacity, 4096);
    assert_eq!(opts.read_chunk_size, 16384);
    assert_eq!(opts.body_grace, Duration::from_millis(250));
}

#[test]
fn test_keepalive_option() {
    let opts = LinkOptions::new().with_tcp_keepalive(Some(Duration::from_secs(30)));
    assert!(opts.tcp_keepalive);
    assert_eq!(opts.tcp_keepalive_idle, Some(Duration::from_secs(30)));

    let opts = LinkOptions::default();
    assert!(!opts.tcp_keepalive);
    assert_eq!(opts.tcp_keepalive_idle, None);
}

#[test]
fn test_combined_options() {
    let opts = LinkOptions::new()
        .with_send_timeout(Duration::from_secs(5))
        .with_connect_timeout(Duration::from_secs(1))
        .with_reply_wait(Duration::from_millis(10));

    assert_eq!(opts.send_timeout, Some(Duration::from_secs(5)));
    assert_eq!(opts.connect_timeout, Duration::from_secs(1));
    assert_eq!(opts.reply_wait, Some(Duration::from_millis(10)));
    // Untouched values keep their defaults
    assert_eq!(opts.line_capacity, 1024);
}

#[test]
fn test_endpoint_round_trips_through_display() {
    let endpoint: BrokerEndpoint = "disque://broker.local:7711".parse().unwrap();
    assert_eq!(endpoint.to_string(), "tcp://broker.local:7711");

    let reparsed = BrokerEndpoint::parse(&endpoint.to_string()).unwrap();
    assert_eq!(reparsed, endpoint);
}
