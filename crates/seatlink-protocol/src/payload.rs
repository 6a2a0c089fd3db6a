//! Outbound payload formatting.
//!
//! Every payload the seat publishes is a flat list of `key=value` fields
//! separated by `;`, the same shape the control topic uses inbound:
//!
//! ```text
//! netbar/seat001/state   s=1;iu=1;pc=1;lt=0;hm=1;sm=3;sec=1820;fee=30;al=0
//! netbar/seat001/card    uid=04A1B2C3
//! netbar/seat001/alert   occupy_over_120s
//! ```

use std::fmt::Write as _;

use seatlink_core::constants::{FIELD_SEPARATOR, KEY_VALUE_SEPARATOR};
use seatlink_core::{Error, PublishRequest, Result, Topics};

/// Builder for a `key=value;key=value` payload.
///
/// ```
/// use seatlink_protocol::Payload;
///
/// let payload = Payload::new().field("s", 1)?.field("pc", 0)?.finish();
/// assert_eq!(payload, "s=1;pc=0");
/// # Ok::<(), seatlink_core::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    text: String,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidField`] if the key is empty or contains a
    /// separator or quote, or if the value contains a field separator.
    pub fn field(mut self, key: &str, value: impl std::fmt::Display) -> Result<Self> {
        if key.is_empty() || key.contains([FIELD_SEPARATOR, KEY_VALUE_SEPARATOR, '"']) {
            return Err(Error::InvalidField(format!("bad key {key:?}")));
        }
        let value = value.to_string();
        if value.contains(FIELD_SEPARATOR) {
            return Err(Error::InvalidField(format!(
                "value for {key} contains {FIELD_SEPARATOR:?}"
            )));
        }

        if !self.text.is_empty() {
            self.text.push(FIELD_SEPARATOR);
        }
        // Writing to a String cannot fail.
        let _ = write!(self.text, "{key}{KEY_VALUE_SEPARATOR}{value}");
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn finish(self) -> String {
        self.text
    }
}

/// Split a payload into its `(key, value)` fields.
///
/// Fields without `=` come back with an empty value; empty fields are
/// skipped.
pub fn parse_fields(payload: &str) -> impl Iterator<Item = (&str, &str)> {
    payload
        .split(FIELD_SEPARATOR)
        .filter(|field| !field.is_empty())
        .map(|field| field.split_once(KEY_VALUE_SEPARATOR).unwrap_or((field, "")))
}

/// Periodic seat status report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeatState {
    /// A user is checked in.
    pub in_use: bool,
    pub pc_on: bool,
    pub light_on: bool,
    /// Occupancy sensor reports a person.
    pub human_present: bool,
    /// Smoke sensor reading, 0 to 100.
    pub smoke_percent: u8,
    /// Seconds of the current session.
    pub session_secs: u32,
    /// Fee of the current session in whole currency units.
    pub fee: u32,
    pub alarm: bool,
}

impl SeatState {
    /// Fee for `secs` of use, charged per completed minute.
    pub fn fee_for(secs: u32, price_per_min: u32) -> u32 {
        (secs / 60).saturating_mul(price_per_min)
    }

    /// Render as `s=1;iu=..;pc=..;lt=..;hm=..;sm=..;sec=..;fee=..;al=..`.
    pub fn to_payload(&self) -> String {
        let flag = |on: bool| u8::from(on);
        format!(
            "s=1;iu={};pc={};lt={};hm={};sm={};sec={};fee={};al={}",
            flag(self.in_use),
            flag(self.pc_on),
            flag(self.light_on),
            flag(self.human_present),
            self.smoke_percent.min(100),
            self.session_secs,
            self.fee,
            flag(self.alarm),
        )
    }

    /// Publish request on the state topic.
    pub fn to_request(&self, topics: &Topics) -> PublishRequest {
        PublishRequest::new(topics.state(), self.to_payload())
    }
}

/// Card lookup request payload, `uid=` followed by the UID in upper-case hex.
///
/// ```
/// use seatlink_protocol::payload::card_request;
///
/// assert_eq!(card_request(&[0x04, 0xa1, 0xb2, 0xc3]), "uid=04A1B2C3");
/// ```
pub fn card_request(uid: &[u8]) -> String {
    let mut out = String::with_capacity(4 + uid.len() * 2);
    out.push_str("uid=");
    for byte in uid {
        let _ = write!(out, "{byte:02X}");
    }
    out
}

/// Publish request for a card lookup.
pub fn card_request_for(topics: &Topics, uid: &[u8]) -> PublishRequest {
    PublishRequest::new(topics.card(), card_request(uid))
}

/// Publish request for an alert.
///
/// # Errors
///
/// Returns [`Error::InvalidField`] for an empty alert or one containing a
/// field separator.
pub fn alert(topics: &Topics, name: &str) -> Result<PublishRequest> {
    if name.is_empty() || name.contains(FIELD_SEPARATOR) {
        return Err(Error::InvalidField(format!("bad alert {name:?}")));
    }
    Ok(PublishRequest::new(topics.alert(), name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_seat_state_payload() {
        let state = SeatState {
            in_use: true,
            pc_on: true,
            human_present: true,
            smoke_percent: 12,
            session_secs: 1820,
            fee: 30,
            ..SeatState::default()
        };
        assert_eq!(
            state.to_payload(),
            "s=1;iu=1;pc=1;lt=0;hm=1;sm=12;sec=1820;fee=30;al=0"
        );
    }

    #[rstest]
    #[case(0, 0)]
    #[case(59, 0)]
    #[case(60, 2)]
    #[case(1820, 60)]
    fn test_fee_per_whole_minute(#[case] secs: u32, #[case] fee: u32) {
        assert_eq!(SeatState::fee_for(secs, 2), fee);
    }

    #[test]
    fn test_seat_state_request_topic() {
        let topics = Topics::new("netbar", "seat001");
        let request = SeatState::default().to_request(&topics);
        assert_eq!(request.topic, "netbar/seat001/state");
        assert!(request.payload.starts_with("s=1;iu=0"));
    }

    #[test]
    fn test_payload_round_trip_through_parse() {
        let text = Payload::new()
            .field("uid", "04A1B2C3")
            .unwrap()
            .field("age", 20)
            .unwrap()
            .finish();
        let fields: Vec<_> = parse_fields(&text).collect();
        assert_eq!(fields, vec![("uid", "04A1B2C3"), ("age", "20")]);
    }

    #[rstest]
    #[case("", "1")]
    #[case("a;b", "1")]
    #[case("a=b", "1")]
    #[case("a\"", "1")]
    #[case("name", "x;y")]
    fn test_rejects_bad_fields(#[case] key: &str, #[case] value: &str) {
        assert!(matches!(
            Payload::new().field(key, value),
            Err(Error::InvalidField(_))
        ));
    }

    #[test]
    fn test_parse_fields_tolerates_bare_words() {
        let fields: Vec<_> = parse_fields("card_ok;;name=Alice").collect();
        assert_eq!(fields, vec![("card_ok", ""), ("name", "Alice")]);
    }

    #[test]
    fn test_card_request_topic() {
        let topics = Topics::new("netbar", "seat001");
        let request = card_request_for(&topics, &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(request.topic, "netbar/seat001/card");
        assert_eq!(request.payload, "uid=DEADBEEF");
    }

    #[test]
    fn test_alert() {
        let topics = Topics::new("netbar", "seat001");
        let request = alert(&topics, "occupy_over_120s").unwrap();
        assert_eq!(request.topic, "netbar/seat001/alert");
        assert!(alert(&topics, "").is_err());
    }
}
