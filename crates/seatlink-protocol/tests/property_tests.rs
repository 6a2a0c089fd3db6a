//! Property-based tests for the receive buffer and remote command
//! extraction.
//!
//! These tests use proptest to generate arbitrary module output and verify
//! that the buffer and extractor invariants hold for all of it.

mod common;

use common::{CONTROL_TOPIC, feed_bytes, subrecv_line};
use proptest::prelude::*;
use seatlink_core::constants::{
    REMOTE_BALANCE_CAPACITY, REMOTE_ERROR_CAPACITY, REMOTE_MESSAGE_CAPACITY,
    REMOTE_USER_NAME_CAPACITY,
};
use seatlink_protocol::{RemoteCommandExtractor, RemoteCommands, TransportBuffer};
use seatlink_protocol::remote::parse_command_line;

/// Strategy for control payload text without line endings or quotes.
fn payload_text() -> impl Strategy<Value = String> {
    prop::string::string_regex(r#"[^\r\n"\x00]{0,80}"#)
        .expect("Failed to create payload regex strategy")
}

proptest! {
    /// Property: Length never exceeds capacity and the content stays
    /// terminated, whatever arrives.
    #[test]
    fn prop_buffer_bounded_and_terminated(
        size in 2usize..128,
        bytes in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let (buffer, producer) = TransportBuffer::with_producer(size);
        feed_bytes(&producer, &bytes);

        prop_assert!(buffer.len() <= buffer.capacity());
        prop_assert!(buffer.is_terminated());

        let kept = bytes.len().min(buffer.capacity());
        prop_assert_eq!(buffer.snapshot(), bytes[..kept].to_vec());
        prop_assert_eq!(buffer.take_dropped() as usize, bytes.len() - kept);
    }

    /// Property: Extracted values never exceed their capacity and are
    /// always valid UTF-8.
    #[test]
    fn prop_extracted_values_bounded(
        name in payload_text(),
        balance in payload_text(),
        text in payload_text(),
    ) {
        let line = format!("card_ok;name={name};balance={balance};msg:{text}");
        let mut bank = RemoteCommands::default();
        parse_command_line(line.as_bytes(), &mut bank);

        prop_assert!(bank.user_name().map_or(0, str::len) <= REMOTE_USER_NAME_CAPACITY);
        prop_assert!(bank.balance().map_or(0, str::len) <= REMOTE_BALANCE_CAPACITY);
        prop_assert!(bank.message().map_or(0, str::len) <= REMOTE_MESSAGE_CAPACITY);
        prop_assert!(bank.error_text().map_or(0, str::len) <= REMOTE_ERROR_CAPACITY);
    }

    /// Property: A message is copied as a prefix of what was sent.
    #[test]
    fn prop_message_is_prefix(text in payload_text()) {
        let mut bank = RemoteCommands::default();
        parse_command_line(format!("msg:{text}").as_bytes(), &mut bank);
        let message = bank.message().unwrap_or_default();
        prop_assert!(text.starts_with(message));
    }

    /// Property: Each delivered line raises its flags exactly once, however
    /// many times the extractor scans without clearing.
    #[test]
    fn prop_scan_never_repeats(scans in 1usize..6) {
        let (buffer, producer) = TransportBuffer::with_producer(512);
        let mut extractor = RemoteCommandExtractor::new(CONTROL_TOPIC);
        let mut bank = RemoteCommands::default();

        feed_bytes(&producer, subrecv_line(CONTROL_TOPIC, "pc_on").as_bytes());
        let mut handled = 0;
        for _ in 0..scans {
            handled += extractor.scan(&buffer, &mut bank, false);
        }
        prop_assert_eq!(handled, 1);
    }
}
