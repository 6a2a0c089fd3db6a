//! Hardware interface trait definitions.
//!
//! This module defines the contract between the connectivity session and the
//! board it runs on. The session consumes exactly three things from the
//! board: a monotonic millisecond clock, a short blocking microsecond delay
//! and a byte sink towards the communication module. The receive direction
//! is not a trait: bytes are pushed by the interrupt source through the
//! session's receive producer.
//!
//! All traits are synchronous. The session is driven by a cooperative control
//! loop and none of these operations may block for longer than the time it
//! takes to shift a command line out of the UART.

use crate::error::Result;

/// Monotonic millisecond time base.
///
/// # Examples
///
/// ```
/// use seatlink_hardware::traits::Clock;
/// use seatlink_hardware::mock::MockClock;
///
/// let clock = MockClock::new();
/// let t0 = clock.now_ms();
/// clock.advance(250);
/// assert_eq!(clock.now_ms() - t0, 250);
/// ```
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin. Never decreases.
    fn now_ms(&self) -> u64;
}

/// Short blocking delay for hardware settle times.
///
/// Implementations busy-wait; callers must keep requests in the tens of
/// microseconds so the control loop period is unaffected.
pub trait DelayUs {
    fn delay_us(&mut self, us: u32);
}

/// Outbound byte primitive towards the communication module.
///
/// # Examples
///
/// ```
/// use seatlink_hardware::traits::SerialTx;
/// use seatlink_hardware::mock::MockSerial;
///
/// let mut serial = MockSerial::new();
/// serial.write_all(b"AT\r\n").unwrap();
/// assert_eq!(serial.written_lines(), vec!["AT".to_string()]);
/// ```
pub trait SerialTx {
    /// Write every byte of `bytes`, blocking until the last one is queued.
    ///
    /// # Errors
    ///
    /// Returns a [`HardwareError`](crate::HardwareError) if the port is gone
    /// or the write fails.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

impl<T: SerialTx + ?Sized> SerialTx for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }
}

impl<T: DelayUs + ?Sized> DelayUs for Box<T> {
    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
