//! Serial port backend for host builds.
//!
//! Opens the module's UART through `serialport` and splits it into a
//! transmit half implementing [`SerialTx`] and a receive half that plays the
//! part of the RX interrupt: every byte read is handed to a callback one at a
//! time.
//!
//! ```no_run
//! use seatlink_hardware::serial::open;
//! use seatlink_hardware::types::SerialSettings;
//!
//! # fn example() -> seatlink_hardware::Result<()> {
//! let (mut tx, mut rx) = open(&SerialSettings::new("/dev/ttyUSB0"))?;
//! rx.pump(|byte| print!("{}", byte as char))?;
//! # Ok(())
//! # }
//! ```

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, trace};

use crate::error::Result;
use crate::traits::SerialTx;
use crate::types::SerialSettings;

/// Chunk size of one receive pump read.
const READ_CHUNK: usize = 64;

/// Open the port described by `settings` as 8N1 without flow control.
///
/// # Errors
///
/// Returns an error if the port cannot be opened or cloned.
pub fn open(settings: &SerialSettings) -> Result<(SerialPortTx, SerialPortRx)> {
    debug!(
        "Opening serial port {} at {} baud",
        settings.path, settings.baud_rate
    );
    let port = serialport::new(&settings.path, settings.baud_rate)
        .timeout(Duration::from_millis(settings.read_timeout_ms))
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open()?;
    let reader = port.try_clone()?;

    Ok((
        SerialPortTx { port },
        SerialPortRx {
            port: reader,
            scratch: [0; READ_CHUNK],
        },
    ))
}

/// Transmit half of an opened port.
pub struct SerialPortTx {
    port: Box<dyn SerialPort>,
}

impl SerialTx for SerialPortTx {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        trace!("TX {:?}", String::from_utf8_lossy(bytes));
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }
}

/// Receive half of an opened port.
pub struct SerialPortRx {
    port: Box<dyn SerialPort>,
    scratch: [u8; READ_CHUNK],
}

impl SerialPortRx {
    /// Read whatever arrived and hand it to `on_byte` byte by byte.
    ///
    /// Returns the number of bytes delivered; a read timeout delivers zero.
    ///
    /// # Errors
    ///
    /// Returns an error for any failure other than a read timeout.
    pub fn pump(&mut self, mut on_byte: impl FnMut(u8)) -> Result<usize> {
        match self.port.read(&mut self.scratch) {
            Ok(n) => {
                self.scratch[..n].iter().copied().for_each(&mut on_byte);
                Ok(n)
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
