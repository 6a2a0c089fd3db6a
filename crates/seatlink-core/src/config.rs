//! Session configuration.
//!
//! Every value the AT command table needs lives here so the state machine
//! itself never formats vendor strings. The struct deserializes from TOML or
//! JSON; every field has a default, so a file only needs to list overrides.
//!
//! ```
//! use seatlink_core::SessionConfig;
//!
//! let config = SessionConfig::default();
//! assert_eq!(config.topics().command(), "netbar/seat001/cmd");
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Error, Result};

/// Access point credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: String,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: "netbar".to_string(),
            password: String::new(),
        }
    }
}

/// Broker endpoint and client identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Client id; falls back to the device id when empty.
    pub client_id: String,
    pub link_id: u8,
    /// Ask the module to reconnect on its own after a drop.
    pub auto_reconnect: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_BROKER_PORT,
            client_id: String::new(),
            link_id: DEFAULT_LINK_ID,
            auto_reconnect: true,
        }
    }
}

/// Per-step command timeouts, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepTimeouts {
    pub reset_ms: u64,
    pub init_ms: u64,
    pub join_ms: u64,
    pub configure_ms: u64,
    pub connect_ms: u64,
    pub subscribe_ms: u64,
    pub publish_ms: u64,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            reset_ms: DEFAULT_RESET_TIMEOUT_MS,
            init_ms: DEFAULT_INIT_TIMEOUT_MS,
            join_ms: DEFAULT_JOIN_TIMEOUT_MS,
            configure_ms: DEFAULT_CONFIGURE_TIMEOUT_MS,
            connect_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            subscribe_ms: DEFAULT_SUBSCRIBE_TIMEOUT_MS,
            publish_ms: DEFAULT_PUBLISH_TIMEOUT_MS,
        }
    }
}

impl StepTimeouts {
    fn all(&self) -> [(&'static str, u64); 7] {
        [
            ("reset_ms", self.reset_ms),
            ("init_ms", self.init_ms),
            ("join_ms", self.join_ms),
            ("configure_ms", self.configure_ms),
            ("connect_ms", self.connect_ms),
            ("subscribe_ms", self.subscribe_ms),
            ("publish_ms", self.publish_ms),
        ]
    }
}

/// Message staged for the first publish after each bring-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPublish {
    /// Topic suffix under `<prefix>/<device>/`, e.g. `state`.
    pub topic: String,
    pub payload: String,
}

/// Complete configuration of one seat's connectivity session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub device_id: String,
    pub topic_prefix: String,
    pub wifi: WifiConfig,
    pub broker: BrokerConfig,
    pub timeouts: StepTimeouts,
    pub reset_settle_ms: u64,
    pub error_cooldown_ms: u64,
    pub tx_guard_us: u32,
    /// Unsolicited tokens that mean the session is gone while `Running`.
    pub link_lost_tokens: Vec<String>,
    pub sync_publish: Option<SyncPublish>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_string(),
            wifi: WifiConfig::default(),
            broker: BrokerConfig::default(),
            timeouts: StepTimeouts::default(),
            reset_settle_ms: DEFAULT_RESET_SETTLE_MS,
            error_cooldown_ms: DEFAULT_ERROR_COOLDOWN_MS,
            tx_guard_us: DEFAULT_TX_GUARD_US,
            link_lost_tokens: vec![
                TOKEN_MQTT_DISCONNECTED.to_string(),
                TOKEN_WIFI_DISCONNECT.to_string(),
            ],
            sync_publish: Some(SyncPublish {
                topic: "state".to_string(),
                payload: "s=1".to_string(),
            }),
        }
    }
}

impl SessionConfig {
    /// Client id sent in `AT+MQTTUSERCFG`.
    pub fn client_id(&self) -> &str {
        if self.broker.client_id.is_empty() {
            &self.device_id
        } else {
            &self.broker.client_id
        }
    }

    pub fn topics(&self) -> Topics {
        Topics::new(&self.topic_prefix, &self.device_id)
    }

    /// Check that every value can be embedded in an AT command.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.device_id.is_empty() {
            return Err(Error::Config("device_id must not be empty".to_string()));
        }
        if self.topic_prefix.is_empty() {
            return Err(Error::Config("topic_prefix must not be empty".to_string()));
        }
        if self.broker.host.is_empty() {
            return Err(Error::Config("broker.host must not be empty".to_string()));
        }

        let quoted = [
            ("device_id", self.device_id.as_str()),
            ("topic_prefix", self.topic_prefix.as_str()),
            ("wifi.ssid", self.wifi.ssid.as_str()),
            ("wifi.password", self.wifi.password.as_str()),
            ("broker.host", self.broker.host.as_str()),
            ("broker.client_id", self.client_id()),
        ];
        for (name, value) in quoted {
            if value.contains('"') || value.contains('\r') || value.contains('\n') {
                return Err(Error::Config(format!(
                    "{name} must not contain quotes or line breaks"
                )));
            }
        }

        // Topic parts appear unescaped in subscription notifications.
        let topic_parts = [
            ("device_id", self.device_id.as_str()),
            ("topic_prefix", self.topic_prefix.as_str()),
        ];
        for (name, value) in topic_parts {
            if value.contains([',', '+', '#', '\\']) {
                return Err(Error::Config(format!(
                    "{name} must not contain ',', '+', '#' or '\\'"
                )));
            }
        }

        for (name, value) in self.timeouts.all() {
            if value == 0 {
                return Err(Error::Config(format!("timeouts.{name} must be positive")));
            }
        }

        if self.link_lost_tokens.iter().any(String::is_empty) {
            return Err(Error::Config(
                "link_lost_tokens must not contain empty tokens".to_string(),
            ));
        }

        Ok(())
    }
}

/// Static per-device topic strings.
///
/// ```
/// use seatlink_core::Topics;
///
/// let topics = Topics::new("netbar", "seat007");
/// assert_eq!(topics.state(), "netbar/seat007/state");
/// assert_eq!(topics.sub("alert"), "netbar/seat007/alert");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    base: String,
}

impl Topics {
    pub fn new(prefix: &str, device_id: &str) -> Self {
        Self {
            base: format!("{prefix}/{device_id}"),
        }
    }

    pub fn sub(&self, suffix: &str) -> String {
        format!("{}/{}", self.base, suffix)
    }

    /// Topic the seat subscribes to; doubles as the inbound marker.
    pub fn command(&self) -> String {
        self.sub("cmd")
    }

    pub fn state(&self) -> String {
        self.sub("state")
    }

    pub fn card(&self) -> String {
        self.sub("card")
    }

    pub fn alert(&self) -> String {
        self.sub("alert")
    }
}
