//! AT command table for the session bring-up pipeline.
//!
//! Each bring-up state issues exactly one command and waits for one success
//! token, any of a set of failure tokens, or a timeout. The table below
//! resolves those four values per state from a [`SessionConfig`], so the
//! state machine never formats vendor strings itself.
//!
//! | State | Command | Success | Failure |
//! |-------|---------|---------|---------|
//! | `Reset` | `AT+RST` | `ready` | `ERROR` |
//! | `Init` | `ATE0` | `OK` | `ERROR` |
//! | `JoinNetwork` | `AT+CWJAP="ssid","pass"` | `WIFI GOT IP` | `FAIL`, `ERROR` |
//! | `ConfigureSession` | `AT+MQTTUSERCFG=0,1,"client","","",0,0,""` | `OK` | `ERROR` |
//! | `ConnectSession` | `AT+MQTTCONN=0,"host",1883,1` | `OK` | `ERROR`, `FAIL` |
//! | `Subscribe` | `AT+MQTTSUB=0,"prefix/device/cmd",0` | `OK` | `ERROR` |
//! | `Running` | `AT+MQTTPUB=0,"topic","payload",0,0` | `OK` | `ERROR` |
//!
//! `Init` turns command echo off so the module never reflects our own
//! publish lines (which may carry the control topic) back into the receive
//! buffer.
//!
//! # Example
//!
//! ```
//! use seatlink_core::{ConnectivityState, SessionConfig};
//! use seatlink_protocol::CommandTable;
//!
//! let table = CommandTable::from_config(&SessionConfig::default());
//! let subscribe = table.for_state(ConnectivityState::Subscribe).unwrap();
//! assert_eq!(subscribe.text(), "AT+MQTTSUB=0,\"netbar/seat001/cmd\",0");
//! assert_eq!(subscribe.success(), "OK");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use seatlink_core::constants::*;
use seatlink_core::{ConnectivityState, PublishRequest, SessionConfig};

/// One resolved command: the line to write and how to judge the answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtCommand {
    /// Short name for logs. Never contains credentials.
    label: &'static str,
    line: Bytes,
    success: String,
    failures: Vec<String>,
    timeout_ms: u64,
}

impl AtCommand {
    /// Build a command from its text; the line terminator is appended here.
    pub fn new(label: &'static str, text: &str) -> Self {
        let mut line = BytesMut::with_capacity(text.len() + LINE_TERMINATOR.len());
        line.put_slice(text.as_bytes());
        line.put_slice(LINE_TERMINATOR.as_bytes());
        Self {
            label,
            line: line.freeze(),
            success: TOKEN_OK.to_string(),
            failures: vec![TOKEN_ERROR.to_string()],
            timeout_ms: DEFAULT_INIT_TIMEOUT_MS,
        }
    }

    pub fn expect(mut self, token: impl Into<String>) -> Self {
        self.success = token.into();
        self
    }

    pub fn fail_on(mut self, tokens: &[&str]) -> Self {
        self.failures = tokens.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Full line as written, terminator included.
    pub fn line(&self) -> &[u8] {
        &self.line
    }

    /// Line without its terminator.
    pub fn text(&self) -> String {
        let body = &self.line[..self.line.len() - LINE_TERMINATOR.len()];
        String::from_utf8_lossy(body).into_owned()
    }

    pub fn success(&self) -> &str {
        &self.success
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn timeout(&self) -> u64 {
        self.timeout_ms
    }
}

/// Escape a value for a double-quoted AT string parameter.
///
/// The AT parser treats `"` as the end of the parameter and `,` as a
/// parameter separator; both, and the escape character itself, get a
/// backslash.
///
/// ```
/// use seatlink_protocol::commands::escape_at_string;
///
/// assert_eq!(escape_at_string("s=1;iu=0"), "s=1;iu=0");
/// assert_eq!(escape_at_string(r#"a,"b"\c"#), r#"a\,\"b\"\\c"#);
/// ```
pub fn escape_at_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '"' | ',' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Per-state command lookup built once from the configuration.
#[derive(Debug, Clone)]
pub struct CommandTable {
    reset: AtCommand,
    init: AtCommand,
    join: AtCommand,
    configure: AtCommand,
    connect: AtCommand,
    subscribe: AtCommand,
    link_id: u8,
    publish_timeout_ms: u64,
}

impl CommandTable {
    pub fn from_config(config: &SessionConfig) -> Self {
        let t = &config.timeouts;
        let link = config.broker.link_id;

        let reset = AtCommand::new("AT+RST", "AT+RST")
            .expect(TOKEN_READY)
            .fail_on(&[TOKEN_ERROR])
            .timeout_ms(t.reset_ms);

        let init = AtCommand::new("ATE0", "ATE0").timeout_ms(t.init_ms);

        let join = AtCommand::new(
            "AT+CWJAP",
            &format!(
                "AT+CWJAP=\"{}\",\"{}\"",
                escape_at_string(&config.wifi.ssid),
                escape_at_string(&config.wifi.password)
            ),
        )
        .expect(TOKEN_GOT_IP)
        .fail_on(&[TOKEN_FAIL, TOKEN_ERROR])
        .timeout_ms(t.join_ms);

        let configure = AtCommand::new(
            "AT+MQTTUSERCFG",
            &format!(
                "AT+MQTTUSERCFG={link},1,\"{}\",\"\",\"\",0,0,\"\"",
                escape_at_string(config.client_id())
            ),
        )
        .timeout_ms(t.configure_ms);

        let connect = AtCommand::new(
            "AT+MQTTCONN",
            &format!(
                "AT+MQTTCONN={link},\"{}\",{},{}",
                escape_at_string(&config.broker.host),
                config.broker.port,
                u8::from(config.broker.auto_reconnect)
            ),
        )
        .fail_on(&[TOKEN_ERROR, TOKEN_FAIL])
        .timeout_ms(t.connect_ms);

        let subscribe = AtCommand::new(
            "AT+MQTTSUB",
            &format!(
                "AT+MQTTSUB={link},\"{}\",0",
                config.topics().command()
            ),
        )
        .timeout_ms(t.subscribe_ms);

        Self {
            reset,
            init,
            join,
            configure,
            connect,
            subscribe,
            link_id: link,
            publish_timeout_ms: t.publish_ms,
        }
    }

    /// Command issued on entering `state`, if that state issues one.
    ///
    /// `Running` publishes are built per request with
    /// [`publish`](Self::publish); `Error` issues nothing.
    pub fn for_state(&self, state: ConnectivityState) -> Option<&AtCommand> {
        match state {
            ConnectivityState::Reset => Some(&self.reset),
            ConnectivityState::Init => Some(&self.init),
            ConnectivityState::JoinNetwork => Some(&self.join),
            ConnectivityState::ConfigureSession => Some(&self.configure),
            ConnectivityState::ConnectSession => Some(&self.connect),
            ConnectivityState::Subscribe => Some(&self.subscribe),
            ConnectivityState::Running | ConnectivityState::Error => None,
        }
    }

    /// QoS 0, non-retained publish of `request`.
    pub fn publish(&self, request: &PublishRequest) -> AtCommand {
        AtCommand::new(
            "AT+MQTTPUB",
            &format!(
                "AT+MQTTPUB={},\"{}\",\"{}\",0,0",
                self.link_id,
                escape_at_string(&request.topic),
                escape_at_string(&request.payload)
            ),
        )
        .timeout_ms(self.publish_timeout_ms)
    }
}
