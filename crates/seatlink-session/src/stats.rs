//! Session counters.

use serde::Serialize;

use seatlink_core::Error;

/// Running totals since the session manager was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub forward_transitions: u64,
    pub error_transitions: u64,
    /// Entries into `Reset` after the first, by cooldown or on request.
    pub restarts: u64,
    pub timeouts: u64,
    pub protocol_failures: u64,
    pub link_losses: u64,
    pub write_failures: u64,
    /// Ticks on which received bytes had to be dropped.
    pub transport_overflows: u64,
    pub dropped_bytes: u64,
    pub busy_rejections: u64,
    pub publishes_sent: u64,
    /// Control lines that raised at least one remote command flag.
    pub remote_commands: u64,
}

impl SessionStats {
    /// Count `error` under its kind.
    pub fn record_error(&mut self, error: &Error) {
        match error {
            Error::Timeout { .. } => self.timeouts += 1,
            Error::ProtocolFailure { .. } => self.protocol_failures += 1,
            Error::LinkLost { .. } => self.link_losses += 1,
            Error::Hardware(_) => self.write_failures += 1,
            Error::BusyRejection { .. } => self.busy_rejections += 1,
            Error::TransportOverflow { .. } => self.transport_overflows += 1,
            _ => {}
        }
    }
}
