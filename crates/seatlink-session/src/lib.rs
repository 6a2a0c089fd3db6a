//! Seat connectivity session.
//!
//! This crate contains the connectivity state machine, the publish queue and
//! the [`SessionManager`] that owns them together with the receive buffer,
//! matcher and remote command extractor from `seatlink-protocol`.

pub mod manager;
pub mod publish;
pub mod state_machine;
pub mod stats;

pub use manager::SessionManager;
pub use publish::PublishQueue;
pub use state_machine::{MAX_HISTORY_SIZE, StateMachine, StateTransition};
pub use stats::SessionStats;

// Re-export the state enum so callers need only this crate.
pub use seatlink_core::ConnectivityState;
