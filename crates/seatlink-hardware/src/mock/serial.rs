//! Recording serial sink.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{HardwareError, Result};
use crate::traits::SerialTx;

#[derive(Debug, Default)]
struct SerialLog {
    written: Vec<u8>,
    fail_next: Option<String>,
}

/// Serial sink that records everything written to it.
///
/// A write can be made to fail once with [`fail_next_write`], which is how
/// tests exercise a dead UART.
///
/// [`fail_next_write`]: MockSerial::fail_next_write
#[derive(Debug, Clone, Default)]
pub struct MockSerial {
    log: Arc<Mutex<SerialLog>>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self) -> MutexGuard<'_, SerialLog> {
        // A test that panicked while holding the lock already failed.
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every byte written so far.
    pub fn written(&self) -> Vec<u8> {
        self.log().written.clone()
    }

    /// Written bytes split into `\r\n` terminated lines, terminators removed.
    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.log().written)
            .split("\r\n")
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Last complete command line written, if any.
    pub fn last_line(&self) -> Option<String> {
        self.written_lines().pop()
    }

    /// Forget everything written so far.
    pub fn clear(&self) {
        self.log().written.clear();
    }

    /// Make the next write fail with a communication error.
    pub fn fail_next_write(&self, message: impl Into<String>) {
        self.log().fail_next = Some(message.into());
    }
}

impl SerialTx for MockSerial {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut log = self.log();
        if let Some(message) = log.fail_next.take() {
            return Err(HardwareError::communication(message));
        }
        log.written.extend_from_slice(bytes);
        Ok(())
    }
}
