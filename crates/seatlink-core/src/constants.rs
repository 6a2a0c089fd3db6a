//! Core constants for the seat connectivity session.
//!
//! This module collects the protocol-level constants shared by the receive
//! buffer, the command matcher, the session state machine and the remote
//! command extractor. The values match the AT firmware shipped on the
//! ESP8266 modules fitted to the seat controllers.
//!
//! # Inbound Message Shape
//!
//! Messages delivered on the subscribed control topic arrive as unsolicited
//! lines interleaved with command responses:
//!
//! ```text
//! +MQTTSUBRECV:0,"netbar/seat001/cmd",38,card_ok;name=Alice;balance=12.50;sec=300\r\n
//!                ^^^^^^^^^^^^^^^^^^^^    ^^^^^^^ ^^^^^^^^^^
//!                topic marker            keyword key=value fields
//! ```
//!
//! # Usage
//!
//! ```
//! use seatlink_core::constants::*;
//!
//! assert_eq!(LINE_TERMINATOR, "\r\n");
//! assert!(RX_BUFFER_SIZE > RX_NEAR_FULL_MARGIN);
//! ```

// ============================================================================
// Transport
// ============================================================================

/// Size of the interrupt-fed receive buffer, terminator slot included.
///
/// One byte is always reserved for the trailing NUL, so at most
/// `RX_BUFFER_SIZE - 1` payload bytes are held before further bytes are
/// dropped.
pub const RX_BUFFER_SIZE: usize = 512;

/// Free space below which the extractor clears the buffer.
pub const RX_NEAR_FULL_MARGIN: usize = 64;

/// Byte kept after the last received byte so scans always see a terminator.
pub const RX_TERMINATOR: u8 = 0;

/// Terminator appended to every outbound AT command.
pub const LINE_TERMINATOR: &str = "\r\n";

// ============================================================================
// Module Responses
// ============================================================================

/// Generic success token printed by the AT firmware.
pub const TOKEN_OK: &str = "OK";

/// Generic failure token printed by the AT firmware.
pub const TOKEN_ERROR: &str = "ERROR";

/// Failure token printed when an access point join is refused.
pub const TOKEN_FAIL: &str = "FAIL";

/// Printed by the module once it finished rebooting after `AT+RST`.
pub const TOKEN_READY: &str = "ready";

/// Printed after a successful access point join and DHCP lease.
pub const TOKEN_GOT_IP: &str = "WIFI GOT IP";

/// Unsolicited notice that the broker connection dropped.
pub const TOKEN_MQTT_DISCONNECTED: &str = "+MQTTDISCONNECTED";

/// Unsolicited notice that the access point association dropped.
pub const TOKEN_WIFI_DISCONNECT: &str = "WIFI DISCONNECT";

// ============================================================================
// Timing (milliseconds unless noted)
// ============================================================================

/// Wait after entering `Reset` before `AT+RST` is written.
pub const DEFAULT_RESET_SETTLE_MS: u64 = 200;

/// Time the module gets to reboot and print `ready`.
pub const DEFAULT_RESET_TIMEOUT_MS: u64 = 5_000;

/// Baseline configuration command timeout.
pub const DEFAULT_INIT_TIMEOUT_MS: u64 = 2_000;

/// Access point join timeout. Joins regularly take ten seconds or more.
pub const DEFAULT_JOIN_TIMEOUT_MS: u64 = 20_000;

/// `AT+MQTTUSERCFG` timeout.
pub const DEFAULT_CONFIGURE_TIMEOUT_MS: u64 = 5_000;

/// `AT+MQTTCONN` timeout.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 15_000;

/// `AT+MQTTSUB` timeout.
pub const DEFAULT_SUBSCRIBE_TIMEOUT_MS: u64 = 5_000;

/// `AT+MQTTPUB` timeout.
pub const DEFAULT_PUBLISH_TIMEOUT_MS: u64 = 8_000;

/// Time spent in `Error` before a full restart.
pub const DEFAULT_ERROR_COOLDOWN_MS: u64 = 5_000;

/// Line turnaround guard after each outbound command, in microseconds.
pub const DEFAULT_TX_GUARD_US: u32 = 50;

// ============================================================================
// Session Defaults
// ============================================================================

/// Topic prefix shared by every seat.
pub const DEFAULT_TOPIC_PREFIX: &str = "netbar";

/// Device identifier used when none is configured.
pub const DEFAULT_DEVICE_ID: &str = "seat001";

/// Default broker port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// MQTT link id used by the AT firmware (only link 0 exists).
pub const DEFAULT_LINK_ID: u8 = 0;

// ============================================================================
// Remote Command Payloads
// ============================================================================

/// Capacity of the free-text message buffer, in bytes.
pub const REMOTE_MESSAGE_CAPACITY: usize = 32;

/// Capacity of the user name buffer, in bytes.
pub const REMOTE_USER_NAME_CAPACITY: usize = 32;

/// Capacity of the balance string buffer, in bytes.
pub const REMOTE_BALANCE_CAPACITY: usize = 16;

/// Capacity of the card error text buffer, in bytes.
pub const REMOTE_ERROR_CAPACITY: usize = 32;

/// Separator between fields of a published or received payload.
pub const FIELD_SEPARATOR: char = ';';

/// Separator between key and value inside a payload field.
pub const KEY_VALUE_SEPARATOR: char = '=';
