//! Board abstraction layer for the seat connectivity session.
//!
//! This crate provides the small set of interfaces the session consumes from
//! the board it runs on, plus implementations for host builds and tests.
//!
//! # Consumed Interfaces
//!
//! - [`Clock`]: monotonic millisecond time base used for every timeout and
//!   cooldown.
//! - [`DelayUs`]: blocking microsecond delay, reserved for hardware settle
//!   times in the tens of microseconds.
//! - [`SerialTx`]: byte-send primitive towards the communication module.
//!
//! The receive direction is deliberately absent: the interrupt source pushes
//! bytes through the session's receive producer instead of being polled.
//!
//! # Implementations
//!
//! - [`host`]: [`SystemClock`] and [`SpinDelay`] for desktop builds.
//! - [`mock`]: deterministic clock, delay and recording serial sink.
//! - `serial` (feature `hardware-serial`): a real UART via `serialport`.
//!
//! # Example
//!
//! ```
//! use seatlink_hardware::mock::{MockClock, MockSerial};
//! use seatlink_hardware::{Clock, SerialTx};
//!
//! let clock = MockClock::new();
//! let mut serial = MockSerial::new();
//!
//! serial.write_all(b"AT\r\n").unwrap();
//! clock.advance(10);
//!
//! assert_eq!(clock.now_ms(), 10);
//! assert_eq!(serial.written_lines(), vec!["AT".to_string()]);
//! ```

pub mod error;
pub mod host;
pub mod mock;
#[cfg(feature = "hardware-serial")]
pub mod serial;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use host::{SpinDelay, SystemClock};
pub use traits::{Clock, DelayUs, SerialTx};
pub use types::SerialSettings;
