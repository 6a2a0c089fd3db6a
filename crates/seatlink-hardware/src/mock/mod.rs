//! Mock hardware for tests and bench runs.
//!
//! These devices are fully deterministic: the clock only moves when told to
//! and the serial sink records every command line instead of sending it.
//! Each mock is cheaply cloneable and clones share state, so a test keeps
//! one handle while the session owns the other.

pub mod clock;
pub mod serial;

pub use clock::{MockClock, MockDelay};
pub use serial::MockSerial;
