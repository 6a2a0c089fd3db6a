//! Remote command extraction from the receive buffer.
//!
//! The broker delivers control messages for this seat as unsolicited lines
//! mixed into the module's command/response traffic:
//!
//! ```text
//! +MQTTSUBRECV:0,"netbar/seat001/cmd",5,pc_on\r\n
//! +MQTTSUBRECV:0,"netbar/seat001/cmd",38,card_ok;name=Alice;balance=12.50;sec=300\r\n
//! +MQTTSUBRECV:0,"netbar/seat001/cmd",18,msg:Closing at 23:00\r\n
//! ```
//!
//! There is no framing beyond the line ending, so extraction is keyword
//! driven: find the control topic marker, take the rest of that line, and
//! test it against a fixed vocabulary. Every hit raises an edge-triggered
//! flag in a [`RemoteCommands`] bank, and keyed values are copied into
//! bounded strings. The kiosk reads and clears the bank once per tick.
//!
//! # Vocabulary
//!
//! | Keyword | Flag | Payload |
//! |---------|------|---------|
//! | `reset` | [`RemoteCommand::Reset`] | |
//! | `pc_on` / `pc_off` | [`RemoteCommand::PcOn`] / [`RemoteCommand::PcOff`] | |
//! | `light_on` / `light_off` | [`RemoteCommand::LightOn`] / [`RemoteCommand::LightOff`] | |
//! | `checkout` | [`RemoteCommand::Checkout`] | |
//! | `maint_on` / `maint_off` | [`RemoteCommand::MaintOn`] / [`RemoteCommand::MaintOff`] | |
//! | `card_ok` | [`RemoteCommand::CardOk`] | `name=` (or `user=`), `balance=`, `sec=` |
//! | `card_err` | [`RemoteCommand::CardErr`] | `msg=` (or `code=`) |
//! | `msg:` | [`RemoteCommand::Message`] | rest of the line |
//!
//! Keywords are only looked for before a `msg:` sentinel, so the text of a
//! free-form message never triggers a control action.

use std::fmt;

use heapless::String as BoundedString;
use tracing::{debug, info, trace};

use seatlink_core::constants::{
    REMOTE_BALANCE_CAPACITY, REMOTE_ERROR_CAPACITY, REMOTE_MESSAGE_CAPACITY,
    REMOTE_USER_NAME_CAPACITY, RX_NEAR_FULL_MARGIN,
};

use crate::rx_buffer::TransportBuffer;
use crate::scan;

/// Bytes that end a `key=value` field.
const FIELD_TERMINATORS: &[u8] = b";,\"\r\n\0";

/// Bytes that end a free-text message.
const MESSAGE_TERMINATORS: &[u8] = b"\"\r\n\0";

/// Bytes allowed directly before a key.
const KEY_BOUNDARIES: &[u8] = b";,\" ";

/// Bytes allowed directly before a command keyword.
const KEYWORD_BOUNDARIES: &[u8] = b";,\"";

/// Sentinel that introduces a free-text message.
const MESSAGE_SENTINEL: &[u8] = b"msg:";

/// One recognized remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCommand {
    Reset,
    PcOn,
    PcOff,
    LightOn,
    LightOff,
    Checkout,
    MaintOn,
    MaintOff,
    CardOk,
    CardErr,
    /// Free-text message for the screen.
    Message,
}

impl RemoteCommand {
    /// Every command in flag bit order.
    pub const ALL: [RemoteCommand; 11] = [
        RemoteCommand::Reset,
        RemoteCommand::PcOn,
        RemoteCommand::PcOff,
        RemoteCommand::LightOn,
        RemoteCommand::LightOff,
        RemoteCommand::Checkout,
        RemoteCommand::MaintOn,
        RemoteCommand::MaintOff,
        RemoteCommand::CardOk,
        RemoteCommand::CardErr,
        RemoteCommand::Message,
    ];

    /// Keyword that raises this flag. `Message` is raised by the `msg:`
    /// sentinel instead and has none.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            RemoteCommand::Reset => Some("reset"),
            RemoteCommand::PcOn => Some("pc_on"),
            RemoteCommand::PcOff => Some("pc_off"),
            RemoteCommand::LightOn => Some("light_on"),
            RemoteCommand::LightOff => Some("light_off"),
            RemoteCommand::Checkout => Some("checkout"),
            RemoteCommand::MaintOn => Some("maint_on"),
            RemoteCommand::MaintOff => Some("maint_off"),
            RemoteCommand::CardOk => Some("card_ok"),
            RemoteCommand::CardErr => Some("card_err"),
            RemoteCommand::Message => None,
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword().unwrap_or("msg"))
    }
}

/// Bank of edge-triggered remote command flags and their payloads.
///
/// A new occurrence overwrites an unread value. The consumer takes the whole
/// bank with [`take`](Self::take), which leaves it empty.
///
/// ```
/// use seatlink_protocol::{RemoteCommand, RemoteCommands};
///
/// let mut bank = RemoteCommands::default();
/// bank.raise(RemoteCommand::PcOn);
///
/// let taken = bank.take();
/// assert!(taken.contains(RemoteCommand::PcOn));
/// assert!(bank.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCommands {
    flags: u16,
    message: Option<BoundedString<REMOTE_MESSAGE_CAPACITY>>,
    user_name: Option<BoundedString<REMOTE_USER_NAME_CAPACITY>>,
    balance: Option<BoundedString<REMOTE_BALANCE_CAPACITY>>,
    restore_secs: Option<u32>,
    error_text: Option<BoundedString<REMOTE_ERROR_CAPACITY>>,
}

impl RemoteCommands {
    pub fn raise(&mut self, command: RemoteCommand) {
        self.flags |= command.bit();
    }

    pub fn contains(&self, command: RemoteCommand) -> bool {
        self.flags & command.bit() != 0
    }

    /// True when no flag is raised.
    pub fn is_empty(&self) -> bool {
        self.flags == 0
    }

    /// Raised flags in bit order.
    pub fn iter(&self) -> impl Iterator<Item = RemoteCommand> + '_ {
        RemoteCommand::ALL
            .into_iter()
            .filter(|command| self.contains(*command))
    }

    /// Hand the bank to the consumer and leave it cleared.
    pub fn take(&mut self) -> RemoteCommands {
        std::mem::take(self)
    }

    /// Free-text message (`msg:`).
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// User name from `card_ok`.
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// Balance string from `card_ok`, verbatim (e.g. `"12.50"`).
    pub fn balance(&self) -> Option<&str> {
        self.balance.as_deref()
    }

    /// Session seconds to restore, from `card_ok`.
    pub fn restore_secs(&self) -> Option<u32> {
        self.restore_secs
    }

    /// Error text from `card_err`.
    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }
}

/// Copy `raw` up to the first terminator or `N` bytes, never splitting a
/// UTF-8 sequence.
fn bounded<const N: usize>(raw: &[u8], terminators: &[u8]) -> BoundedString<N> {
    let end = raw
        .iter()
        .position(|b| terminators.contains(b))
        .unwrap_or(raw.len())
        .min(N);
    let slice = &raw[..end];
    let text = match std::str::from_utf8(slice) {
        Ok(text) => text,
        Err(e) => std::str::from_utf8(&slice[..e.valid_up_to()]).unwrap_or_default(),
    };

    let mut out = BoundedString::new();
    // Cannot fail: text.len() <= N.
    let _ = out.push_str(text);
    out
}

/// Value of the first `key` that starts a field in `line`.
fn field_value<'a>(line: &'a [u8], key: &[u8]) -> Option<&'a [u8]> {
    scan::find_all(line, key)
        .find(|&at| at == 0 || KEY_BOUNDARIES.contains(&line[at - 1]))
        .map(|at| &line[at + key.len()..])
}

/// True if `keyword` appears in `line` as a whole field.
fn has_keyword(line: &[u8], keyword: &[u8]) -> bool {
    scan::find_all(line, keyword).any(|at| {
        let before = at == 0 || KEYWORD_BOUNDARIES.contains(&line[at - 1]);
        let after = line
            .get(at + keyword.len())
            .is_none_or(|b| FIELD_TERMINATORS.contains(b));
        before && after
    })
}

fn parse_secs(raw: &[u8]) -> Option<u32> {
    let digits = raw.iter().take_while(|b| b.is_ascii_digit()).count();
    std::str::from_utf8(&raw[..digits]).ok()?.parse().ok()
}

/// Apply one command line (the text after the topic marker) to `bank`.
///
/// Returns `true` if anything was recognized.
pub fn parse_command_line(line: &[u8], bank: &mut RemoteCommands) -> bool {
    let (control, message) = match scan::find(line, MESSAGE_SENTINEL) {
        Some(at) => (&line[..at], Some(&line[at + MESSAGE_SENTINEL.len()..])),
        None => (line, None),
    };

    let mut recognized = false;
    for command in RemoteCommand::ALL {
        if let Some(keyword) = command.keyword()
            && has_keyword(control, keyword.as_bytes())
        {
            bank.raise(command);
            recognized = true;
        }
    }

    if let Some(name) = field_value(control, b"name=").or_else(|| field_value(control, b"user=")) {
        bank.user_name = Some(bounded(name, FIELD_TERMINATORS));
    }
    if let Some(balance) = field_value(control, b"balance=") {
        bank.balance = Some(bounded(balance, FIELD_TERMINATORS));
    }
    if let Some(secs) = field_value(control, b"sec=").and_then(parse_secs) {
        bank.restore_secs = Some(secs);
    }
    if has_keyword(control, b"card_err")
        && let Some(text) = field_value(control, b"msg=").or_else(|| field_value(control, b"code="))
    {
        bank.error_text = Some(bounded(text, FIELD_TERMINATORS));
    }

    if let Some(text) = message {
        bank.message = Some(bounded(text, MESSAGE_TERMINATORS));
        bank.raise(RemoteCommand::Message);
        recognized = true;
    }

    recognized
}

/// Scans the receive buffer for control topic lines.
///
/// A line is handled once its terminating `\n` has arrived, or earlier when
/// the buffer is nearly full and the rest could never fit. After handling,
/// the buffer is cleared if the caller allows it and no notification is
/// still arriving; otherwise the extractor remembers how far it got and
/// never rescans that part.
#[derive(Debug)]
pub struct RemoteCommandExtractor {
    marker: Vec<u8>,
    consumed: usize,
    scratch: Vec<u8>,
}

impl RemoteCommandExtractor {
    /// Create an extractor looking for `marker` (the control topic).
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().into_bytes(),
            consumed: 0,
            scratch: Vec::new(),
        }
    }

    pub fn marker(&self) -> &[u8] {
        &self.marker
    }

    /// Forget the consumed offset. Call whenever the buffer is cleared by
    /// someone else.
    pub fn rewind(&mut self) {
        self.consumed = 0;
    }

    /// Scan `buffer` and raise flags in `bank`.
    ///
    /// `may_clear` must be `false` while a command response is still
    /// expected in the buffer. Returns the number of command lines that
    /// raised at least one flag.
    pub fn scan(
        &mut self,
        buffer: &TransportBuffer,
        bank: &mut RemoteCommands,
        may_clear: bool,
    ) -> usize {
        let len = buffer.snapshot_into(&mut self.scratch);
        if len < self.consumed {
            // Cleared and refilled behind our back.
            self.consumed = 0;
        }
        let nearly_full = buffer.is_nearly_full(RX_NEAR_FULL_MARGIN);
        let data = &self.scratch[self.consumed..len];

        let mut handled = 0;
        let mut cursor = 0;
        let mut line_open = false;
        while let Some(found) = scan::find(&data[cursor..], &self.marker) {
            let start = cursor + found + self.marker.len();
            let end = match data[start..].iter().position(|&b| b == b'\n') {
                Some(offset) => start + offset,
                None if nearly_full => data.len(),
                None => {
                    line_open = true;
                    break;
                }
            };

            let line = &data[start..end];
            trace!("Control line {:?}", String::from_utf8_lossy(line));
            if parse_command_line(line, bank) {
                handled += 1;
            } else {
                debug!(
                    "Ignoring unrecognized control line {:?}",
                    String::from_utf8_lossy(line)
                );
            }
            cursor = (end + 1).min(data.len());
        }

        if handled > 0 {
            info!("Remote commands received: {}", CommandList(bank));
        }

        // A notification still arriving after the last handled line must
        // survive, or its tail would come in without the marker.
        if !line_open && !nearly_full {
            line_open = data[cursor..]
                .rsplit(|&b| b == b'\n')
                .next()
                .is_some_and(|tail| tail.trim_ascii_start().starts_with(b"+"));
        }

        if may_clear && (nearly_full || (handled > 0 && !line_open)) {
            if handled == 0 {
                debug!("Receive buffer nearly full, clearing");
            }
            buffer.clear();
            self.consumed = 0;
        } else if nearly_full {
            self.consumed = len;
        } else {
            self.consumed += cursor;
        }

        handled
    }
}

struct CommandList<'a>(&'a RemoteCommands);

impl fmt::Display for CommandList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{command}")?;
        }
        Ok(())
    }
}
