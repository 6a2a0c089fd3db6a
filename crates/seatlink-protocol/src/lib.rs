//! Wire-level pieces of the seat connectivity session.
//!
//! - [`rx_buffer`]: the byte buffer filled by the RX interrupt.
//! - [`commands`]: AT command lines and their expected answers.
//! - [`matcher`]: one-command-at-a-time response matching with timeouts.
//! - [`remote`]: keyword extraction of control topic messages.
//! - [`payload`]: `key=value;...` formatting for outbound publishes.

pub mod commands;
pub mod matcher;
pub mod payload;
pub mod remote;
pub mod rx_buffer;
pub mod scan;

pub use commands::{AtCommand, CommandTable};
pub use matcher::{CommandMatcher, MatchOutcome, PendingCommand};
pub use payload::{Payload, SeatState};
pub use remote::{RemoteCommand, RemoteCommandExtractor, RemoteCommands};
pub use rx_buffer::{RxProducer, TransportBuffer};
