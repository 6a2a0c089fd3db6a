//! Common types shared across hardware implementations.

use serde::{Deserialize, Serialize};

/// Serial line settings for the communication module.
///
/// The module speaks 8N1 without flow control; only the device path, baud
/// rate and read timeout vary between boards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Device path (e.g., "/dev/ttyUSB0", "COM3").
    pub path: String,

    /// Line speed in baud.
    pub baud_rate: u32,

    /// Read timeout of the receive pump, in milliseconds.
    pub read_timeout_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            path: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            read_timeout_ms: 100,
        }
    }
}

impl SerialSettings {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}
