//! Common test utilities for protocol integration tests.
//!
//! The helpers fall into two groups:
//!
//! 1. **Feeding** (`feed`, `subrecv_line`) - push module output into a
//!    receive buffer the way the RX interrupt would.
//! 2. **Fixtures** (`test_config`, `CONTROL_TOPIC`) - a configuration that
//!    matches the lines produced by the feeding helpers.

#![allow(dead_code)]

use seatlink_core::SessionConfig;
use seatlink_protocol::RxProducer;

/// Control topic of [`test_config`].
pub const CONTROL_TOPIC: &str = "netbar/seat001/cmd";

/// Configuration used across the protocol tests.
pub fn test_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.wifi.ssid = "seat-lab".to_string();
    config.wifi.password = "hunter2".to_string();
    config.broker.host = "10.0.0.5".to_string();
    config
}

/// Push `text` into the buffer one byte at a time.
pub fn feed(producer: &RxProducer, text: &str) {
    feed_bytes(producer, text.as_bytes());
}

pub fn feed_bytes(producer: &RxProducer, bytes: &[u8]) {
    for byte in bytes {
        producer.append(*byte);
    }
}

/// Inbound subscription line as the module reports it.
pub fn subrecv_line(topic: &str, payload: &str) -> String {
    format!(
        "+MQTTSUBRECV:0,\"{topic}\",{},{payload}\r\n",
        payload.len()
    )
}
