//! Command table and matcher driven together through a full bring-up
//! exchange, with unsolicited module output interleaved.

mod common;

use common::{CONTROL_TOPIC, feed, subrecv_line, test_config};
use seatlink_core::{ConnectivityState, Error, PublishRequest};
use seatlink_hardware::mock::MockSerial;
use seatlink_protocol::{
    CommandMatcher, CommandTable, MatchOutcome, RemoteCommand, RemoteCommandExtractor,
    RemoteCommands, TransportBuffer,
};

/// Module answers for each bring-up state, in order.
const ANSWERS: [&str; 6] = [
    "\r\n ets Jan  8 2013,rst cause:2\r\nready\r\n",
    "ATE0\r\n\r\nOK\r\n",
    "WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n",
    "\r\nOK\r\n",
    "+MQTTCONNECTED:0,1,\"10.0.0.5\",\"1883\",\"\",1\r\n\r\nOK\r\n",
    "\r\nOK\r\n",
];

#[test]
fn test_full_bring_up_exchange() {
    let config = test_config();
    let table = CommandTable::from_config(&config);
    let (buffer, producer) = TransportBuffer::with_producer(512);
    let serial = MockSerial::new();
    let mut tx = serial.clone();
    let mut matcher = CommandMatcher::new();

    let mut now = 0;
    for (state, answer) in ConnectivityState::BRING_UP.into_iter().zip(ANSWERS) {
        let command = table.for_state(state).unwrap();
        matcher.send(command, &buffer, &mut tx, now).unwrap();
        assert_eq!(matcher.poll(&buffer, now + 1), MatchOutcome::Pending);

        feed(&producer, answer);
        now += 100;
        assert_eq!(matcher.poll(&buffer, now), MatchOutcome::Matched, "{state}");
    }

    let lines = serial.written_lines();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "AT+RST");
    assert_eq!(lines[2], "AT+CWJAP=\"seat-lab\",\"hunter2\"");
    assert_eq!(lines[5], format!("AT+MQTTSUB=0,\"{CONTROL_TOPIC}\",0"));
}

#[test]
fn test_wifi_failure_reported_before_timeout() {
    let table = CommandTable::from_config(&test_config());
    let (buffer, producer) = TransportBuffer::with_producer(512);
    let mut serial = MockSerial::new();
    let mut matcher = CommandMatcher::new();

    let join = table.for_state(ConnectivityState::JoinNetwork).unwrap();
    matcher.send(join, &buffer, &mut serial, 0).unwrap();
    feed(&producer, "WIFI DISCONNECT\r\n+CWJAP:3\r\n\r\nFAIL\r\n");

    match matcher.poll(&buffer, 4_000) {
        MatchOutcome::Failed(Error::ProtocolFailure { command, token }) => {
            assert_eq!(command, "AT+CWJAP");
            assert_eq!(token, "FAIL");
        }
        other => panic!("expected protocol failure, got {other:?}"),
    }
}

#[test]
fn test_silent_module_times_out() {
    let table = CommandTable::from_config(&test_config());
    let buffer = TransportBuffer::new(64);
    let mut serial = MockSerial::new();
    let mut matcher = CommandMatcher::new();

    let connect = table.for_state(ConnectivityState::ConnectSession).unwrap();
    matcher.send(connect, &buffer, &mut serial, 0).unwrap();

    assert_eq!(matcher.poll(&buffer, connect.timeout()), MatchOutcome::Pending);
    assert!(matches!(
        matcher.poll(&buffer, connect.timeout() + 1),
        MatchOutcome::Failed(Error::Timeout { .. })
    ));
}

#[test]
fn test_publish_response_and_remote_command_share_buffer() {
    let config = test_config();
    let table = CommandTable::from_config(&config);
    let (buffer, producer) = TransportBuffer::with_producer(512);
    let mut serial = MockSerial::new();
    let mut matcher = CommandMatcher::new();
    let mut extractor = RemoteCommandExtractor::new(CONTROL_TOPIC);
    let mut bank = RemoteCommands::default();

    let publish = table.publish(&PublishRequest::new("netbar/seat001/state", "s=1"));
    matcher.send(&publish, &buffer, &mut serial, 0).unwrap();

    // A control message lands before the publish response.
    feed(&producer, &subrecv_line(CONTROL_TOPIC, "light_on"));
    assert_eq!(extractor.scan(&buffer, &mut bank, !matcher.is_pending()), 1);
    assert!(bank.contains(RemoteCommand::LightOn));

    // The response must still be found.
    feed(&producer, "\r\nOK\r\n");
    assert_eq!(extractor.scan(&buffer, &mut bank, !matcher.is_pending()), 0);
    assert_eq!(matcher.poll(&buffer, 50), MatchOutcome::Matched);
}
