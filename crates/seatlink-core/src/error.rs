use thiserror::Error;

use crate::types::ConnectivityState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Command/response errors
    #[error("Command {command} timed out after {elapsed_ms}ms")]
    Timeout { command: String, elapsed_ms: u64 },

    #[error("Command {command} failed: module answered {token:?}")]
    ProtocolFailure { command: String, token: String },

    #[error("Session link lost: {token:?}")]
    LinkLost { token: String },

    // Transport errors
    #[error("Receive buffer full ({capacity} bytes), further bytes dropped")]
    TransportOverflow { capacity: usize },

    #[error("Transport write failed: {0}")]
    Hardware(String),

    // Publish queue errors
    #[error("Publish rejected: request for topic {pending_topic:?} still pending")]
    BusyRejection { pending_topic: String },

    #[error("Publish rejected: session is {state}, not Running")]
    NotRunning { state: ConnectivityState },

    // State machine errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: ConnectivityState,
        to: ConnectivityState,
    },

    // Payload errors
    #[error("Invalid payload field: {0}")]
    InvalidField(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for the failures that push the state machine into `Error`.
    #[must_use]
    pub fn escalates(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. }
                | Error::ProtocolFailure { .. }
                | Error::LinkLost { .. }
                | Error::Hardware(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
