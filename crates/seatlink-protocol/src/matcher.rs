//! Command/response matcher.
//!
//! Issues one command at a time and judges the module's answer by plain
//! substring search over the whole receive buffer. The module interleaves
//! unsolicited notifications (`WIFI CONNECTED`, `+MQTTSUBRECV:...`) with
//! command responses, so incremental line parsing would have to understand
//! every notification; whole-buffer search only needs the tokens.
//!
//! Nothing here waits. [`send`](CommandMatcher::send) writes and returns;
//! [`poll`](CommandMatcher::poll) is called once per control loop tick and
//! reports the current verdict.
//!
//! # Verdict Order
//!
//! On each poll, in order:
//! 1. elapsed time beyond the timeout → `Failed(Timeout)`, whatever the
//!    buffer holds,
//! 2. any failure token present → `Failed(ProtocolFailure)`,
//! 3. success token present → `Matched`,
//! 4. otherwise `Pending`.
//!
//! # Example
//!
//! ```
//! use seatlink_hardware::mock::MockSerial;
//! use seatlink_protocol::{AtCommand, CommandMatcher, MatchOutcome, TransportBuffer};
//!
//! let (buffer, producer) = TransportBuffer::with_producer(128);
//! let mut serial = MockSerial::new();
//! let mut matcher = CommandMatcher::new();
//!
//! let command = AtCommand::new("ATE0", "ATE0").timeout_ms(1_000);
//! matcher.send(&command, &buffer, &mut serial, 0).unwrap();
//! assert_eq!(matcher.poll(&buffer, 10), MatchOutcome::Pending);
//!
//! for byte in b"\r\nOK\r\n" {
//!     producer.append(*byte);
//! }
//! assert_eq!(matcher.poll(&buffer, 20), MatchOutcome::Matched);
//! ```

use tracing::{debug, trace, warn};

use seatlink_core::Error;
use seatlink_hardware::SerialTx;

use crate::commands::AtCommand;
use crate::rx_buffer::TransportBuffer;
use crate::scan;

/// The one command currently awaiting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    pub label: &'static str,
    pub success: String,
    pub failures: Vec<String>,
    pub issued_at_ms: u64,
    pub timeout_ms: u64,
}

impl PendingCommand {
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.issued_at_ms)
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.elapsed_ms(now_ms) > self.timeout_ms
    }
}

/// Verdict of one [`CommandMatcher::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// No command outstanding.
    Idle,

    /// Still waiting.
    Pending,

    /// Success token seen before the deadline.
    Matched,

    /// Failure token seen, or deadline passed.
    ///
    /// Carries [`Error::Timeout`] or [`Error::ProtocolFailure`].
    Failed(Error),
}

/// Issues commands and polls for their verdict.
#[derive(Debug, Default)]
pub struct CommandMatcher {
    pending: Option<PendingCommand>,
    scratch: Vec<u8>,
}

impl CommandMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the receive buffer, write `command` and start its timer.
    ///
    /// Any command still outstanding is discarded without notice to the
    /// module.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hardware`] if the write fails; no command is then
    /// outstanding.
    pub fn send<T: SerialTx + ?Sized>(
        &mut self,
        command: &AtCommand,
        buffer: &TransportBuffer,
        tx: &mut T,
        now_ms: u64,
    ) -> Result<(), Error> {
        self.pending = None;
        buffer.clear();

        tx.write_all(command.line())
            .map_err(|e| Error::Hardware(format!("{}: {}", command.label(), e)))?;

        debug!(
            "Issued {} (expect {:?}, timeout {}ms)",
            command.label(),
            command.success(),
            command.timeout()
        );
        self.pending = Some(PendingCommand {
            label: command.label(),
            success: command.success().to_string(),
            failures: command.failures().to_vec(),
            issued_at_ms: now_ms,
            timeout_ms: command.timeout(),
        });
        Ok(())
    }

    /// Judge the outstanding command against the buffer content.
    ///
    /// A `Matched` or `Failed` verdict retires the command.
    pub fn poll(&mut self, buffer: &TransportBuffer, now_ms: u64) -> MatchOutcome {
        let Some(pending) = &self.pending else {
            return MatchOutcome::Idle;
        };

        let outcome = if pending.is_expired(now_ms) {
            warn!(
                "{} timed out after {}ms",
                pending.label,
                pending.elapsed_ms(now_ms)
            );
            MatchOutcome::Failed(Error::Timeout {
                command: pending.label.to_string(),
                elapsed_ms: pending.elapsed_ms(now_ms),
            })
        } else {
            buffer.snapshot_into(&mut self.scratch);
            let content = self.scratch.as_slice();

            if let Some(token) = pending
                .failures
                .iter()
                .find(|token| scan::contains(content, token.as_bytes()))
            {
                warn!("{} failed: module answered {:?}", pending.label, token);
                trace!("RX {:?}", String::from_utf8_lossy(content));
                MatchOutcome::Failed(Error::ProtocolFailure {
                    command: pending.label.to_string(),
                    token: token.clone(),
                })
            } else if scan::contains(content, pending.success.as_bytes()) {
                debug!(
                    "{} matched after {}ms",
                    pending.label,
                    pending.elapsed_ms(now_ms)
                );
                MatchOutcome::Matched
            } else {
                MatchOutcome::Pending
            }
        };

        if !matches!(outcome, MatchOutcome::Pending) {
            self.pending = None;
        }
        outcome
    }

    /// Drop the outstanding command, if any.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<&PendingCommand> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rx_buffer::RxProducer;
    use seatlink_hardware::mock::MockSerial;

    fn feed(producer: &RxProducer, text: &str) {
        for byte in text.bytes() {
            producer.append(byte);
        }
    }

    fn join_command() -> AtCommand {
        AtCommand::new("AT+CWJAP", "AT+CWJAP=\"ap\",\"pw\"")
            .expect("WIFI GOT IP")
            .fail_on(&["FAIL", "ERROR"])
            .timeout_ms(20_000)
    }

    #[test]
    fn test_send_clears_buffer_and_writes_line() {
        let (buffer, producer) = TransportBuffer::with_producer(128);
        let serial = MockSerial::new();
        let mut tx = serial.clone();
        let mut matcher = CommandMatcher::new();

        feed(&producer, "leftover OK");
        matcher.send(&join_command(), &buffer, &mut tx, 100).unwrap();

        assert!(buffer.is_empty());
        assert_eq!(serial.last_line().as_deref(), Some("AT+CWJAP=\"ap\",\"pw\""));
        let pending = matcher.pending().unwrap();
        assert_eq!(pending.issued_at_ms, 100);
        assert_eq!(pending.timeout_ms, 20_000);
    }

    #[test]
    fn test_idle_without_command() {
        let buffer = TransportBuffer::new(16);
        let mut matcher = CommandMatcher::new();
        assert_eq!(matcher.poll(&buffer, 0), MatchOutcome::Idle);
    }

    #[test]
    fn test_match_among_unsolicited_lines() {
        let (buffer, producer) = TransportBuffer::with_producer(256);
        let mut serial = MockSerial::new();
        let mut matcher = CommandMatcher::new();

        matcher.send(&join_command(), &buffer, &mut serial, 0).unwrap();
        feed(&producer, "WIFI DISCONNECT\r\nWIFI CONNECTED\r\n");
        assert_eq!(matcher.poll(&buffer, 3_000), MatchOutcome::Pending);

        feed(&producer, "WIFI GOT IP\r\n\r\nOK\r\n");
        assert_eq!(matcher.poll(&buffer, 6_000), MatchOutcome::Matched);
        assert!(!matcher.is_pending());
        assert_eq!(matcher.poll(&buffer, 6_010), MatchOutcome::Idle);
    }

    #[test]
    fn test_failure_token() {
        let (buffer, producer) = TransportBuffer::with_producer(128);
        let mut serial = MockSerial::new();
        let mut matcher = CommandMatcher::new();

        matcher.send(&join_command(), &buffer, &mut serial, 0).unwrap();
        feed(&producer, "+CWJAP:1\r\n\r\nFAIL\r\n");

        assert_eq!(
            matcher.poll(&buffer, 1_000),
            MatchOutcome::Failed(Error::ProtocolFailure {
                command: "AT+CWJAP".to_string(),
                token: "FAIL".to_string(),
            })
        );
        assert!(!matcher.is_pending());
    }

    #[test]
    fn test_success_after_deadline_is_timeout() {
        let (buffer, producer) = TransportBuffer::with_producer(128);
        let mut serial = MockSerial::new();
        let mut matcher = CommandMatcher::new();
        let command = AtCommand::new("ATE0", "ATE0").timeout_ms(2_000);

        matcher.send(&command, &buffer, &mut serial, 1_000).unwrap();
        feed(&producer, "OK\r\n");

        assert!(matches!(
            matcher.poll(&buffer, 3_001),
            MatchOutcome::Failed(Error::Timeout { elapsed_ms: 2_001, .. })
        ));
    }

    #[test]
    fn test_deadline_is_inclusive() {
        let (buffer, producer) = TransportBuffer::with_producer(128);
        let mut serial = MockSerial::new();
        let mut matcher = CommandMatcher::new();
        let command = AtCommand::new("ATE0", "ATE0").timeout_ms(2_000);

        matcher.send(&command, &buffer, &mut serial, 0).unwrap();
        assert_eq!(matcher.poll(&buffer, 2_000), MatchOutcome::Pending);
        feed(&producer, "OK\r\n");
        assert_eq!(matcher.poll(&buffer, 2_000), MatchOutcome::Matched);
    }

    #[test]
    fn test_failed_write_leaves_nothing_pending() {
        let buffer = TransportBuffer::new(64);
        let serial = MockSerial::new();
        let mut tx = serial.clone();
        let mut matcher = CommandMatcher::new();

        serial.fail_next_write("port gone");
        let result = matcher.send(&join_command(), &buffer, &mut tx, 0);

        assert!(matches!(result, Err(Error::Hardware(_))));
        assert!(!matcher.is_pending());
    }

    #[test]
    fn test_new_send_replaces_pending() {
        let buffer = TransportBuffer::new(64);
        let mut serial = MockSerial::new();
        let mut matcher = CommandMatcher::new();

        matcher.send(&join_command(), &buffer, &mut serial, 0).unwrap();
        let init = AtCommand::new("ATE0", "ATE0");
        matcher.send(&init, &buffer, &mut serial, 50).unwrap();

        assert_eq!(matcher.pending().unwrap().label, "ATE0");
    }

    #[test]
    fn test_cancel() {
        let buffer = TransportBuffer::new(64);
        let mut serial = MockSerial::new();
        let mut matcher = CommandMatcher::new();

        matcher.send(&join_command(), &buffer, &mut serial, 0).unwrap();
        matcher.cancel();
        assert_eq!(matcher.poll(&buffer, 1), MatchOutcome::Idle);
    }
}
