//! Common test utilities for session integration tests.
//!
//! [`Harness`] wires a [`SessionManager`] to mock hardware and plays the
//! part of the communication module: tests feed it the module's answers and
//! advance the clock, then assert on what was written and which states were
//! visited.

#![allow(dead_code)]

use seatlink_core::{ConnectivityState, SessionConfig};
use seatlink_hardware::mock::{MockClock, MockDelay, MockSerial};
use seatlink_protocol::RxProducer;
use seatlink_session::SessionManager;

/// Module answers for each bring-up state, in order.
pub const BRING_UP_ANSWERS: [&str; 6] = [
    "\r\n ets Jan  8 2013,rst cause:2, boot mode:(3,6)\r\n\r\nready\r\n",
    "\r\nOK\r\n",
    "WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n",
    "\r\nOK\r\n",
    "+MQTTCONNECTED:0,1,\"127.0.0.1\",\"1883\",\"\",1\r\n\r\nOK\r\n",
    "\r\nOK\r\n",
];

pub const CONTROL_TOPIC: &str = "netbar/seat001/cmd";
pub const STATE_TOPIC: &str = "netbar/seat001/state";
pub const CARD_TOPIC: &str = "netbar/seat001/card";

pub struct Harness {
    pub session: SessionManager<MockSerial, MockClock, MockDelay>,
    pub serial: MockSerial,
    pub clock: MockClock,
    pub rx: RxProducer,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        let serial = MockSerial::new();
        let clock = MockClock::starting_at(1_000);
        let mut session =
            SessionManager::new(config, serial.clone(), clock.clone(), MockDelay::new())
                .expect("test config is valid");
        let rx = session
            .take_rx_producer()
            .expect("producer is handed out once");
        Self {
            session,
            serial,
            clock,
            rx,
        }
    }

    /// Push module output into the receive buffer.
    pub fn feed(&self, text: &str) {
        for byte in text.bytes() {
            self.rx.append(byte);
        }
    }

    /// Advance the clock by `ms` and poll once.
    pub fn tick(&mut self, ms: u64) -> ConnectivityState {
        self.clock.advance(ms);
        self.session.poll()
    }

    /// Poll (issuing the state's command), answer it, and poll again.
    pub fn step(&mut self, answer: &str) -> ConnectivityState {
        self.tick(10);
        self.feed(answer);
        self.tick(10)
    }

    /// Wait out the reset settle delay.
    pub fn settle(&mut self) {
        let settle = self.session.config().reset_settle_ms;
        self.clock.advance(settle);
    }

    /// Drive the session from `Reset` to `Running`.
    pub fn bring_up(&mut self) {
        self.settle();
        for answer in BRING_UP_ANSWERS {
            self.step(answer);
        }
        assert_eq!(self.session.state(), ConnectivityState::Running);
    }

    /// Bring up and acknowledge the sync publish, leaving nothing in flight.
    pub fn bring_up_idle(&mut self) {
        self.bring_up();
        self.step("\r\nOK\r\n");
        assert_eq!(self.session.pending_publish_topic(), None);
    }

    pub fn states_visited(&self) -> Vec<ConnectivityState> {
        self.session.history().iter().map(|t| t.to).collect()
    }

    pub fn lines(&self) -> Vec<String> {
        self.serial.written_lines()
    }
}

/// Inbound subscription line as the module reports it.
pub fn subrecv_line(payload: &str) -> String {
    format!(
        "+MQTTSUBRECV:0,\"{CONTROL_TOPIC}\",{},{payload}\r\n",
        payload.len()
    )
}
