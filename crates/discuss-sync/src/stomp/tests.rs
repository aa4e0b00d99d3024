//! Tests for the STOMP codec and heart-beat negotiation.

use std::time::Duration;

use discuss_common::StompError;

use super::*;

#[test]
fn encode_subscribe_frame() {
    let frame = Frame::new(Command::Subscribe)
        .with_header("id", "sub-1")
        .with_header("destination", "/topic/channels/42");
    assert_eq!(
        frame.encode(),
        "SUBSCRIBE\nid:sub-1\ndestination:/topic/channels/42\n\n\0"
    );
}

#[test]
fn send_frame_gets_content_length() {
    let frame = Frame::new(Command::Send)
        .with_header("destination", "/app/channels/42/typing")
        .with_body(r#"{"isTyping":true}"#);
    let encoded = frame.encode();
    assert!(encoded.contains("content-length:17\n"));
    assert!(encoded.ends_with("{\"isTyping\":true}\0"));
}

#[test]
fn connect_headers_are_not_escaped() {
    let frame = Frame::new(Command::Connect)
        .with_header("host", "localhost:8080")
        .with_header("Authorization", "Bearer abc");
    let encoded = frame.encode();
    assert!(encoded.contains("host:localhost:8080\n"));
}

#[test]
fn message_headers_are_escaped_and_restored() {
    let frame = Frame::new(Command::Message)
        .with_header("destination", "/topic/a:b")
        .with_header("note", "line1\nline2\\x")
        .with_body("{}");
    let encoded = frame.encode();
    assert!(encoded.contains("destination:/topic/a\\cb\n"));

    let decoded = Frame::decode(&encoded).unwrap().unwrap();
    assert_eq!(decoded.header("destination"), Some("/topic/a:b"));
    assert_eq!(decoded.header("note"), Some("line1\nline2\\x"));
    assert_eq!(decoded.body, "{}");
}

#[test]
fn decode_connected_frame() {
    let raw = "CONNECTED\nversion:1.2\nheart-beat:0,10000\n\n\0";
    let frame = Frame::decode(raw).unwrap().unwrap();
    assert_eq!(frame.command, Command::Connected);
    assert_eq!(frame.header("version"), Some("1.2"));
    assert_eq!(frame.header("heart-beat"), Some("0,10000"));
    assert!(frame.body.is_empty());
}

#[test]
fn decode_message_with_crlf_and_content_length() {
    let body = r#"{"type":"MESSAGE_NEW"}"#;
    let raw = format!(
        "MESSAGE\r\ndestination:/topic/channels/1\r\ncontent-length:{}\r\n\r\n{}\0\n",
        body.len(),
        body
    );
    let frame = Frame::decode(&raw).unwrap().unwrap();
    assert_eq!(frame.command, Command::Message);
    assert_eq!(frame.body, body);
}

#[test]
fn content_length_allows_embedded_nul() {
    let raw = "MESSAGE\ncontent-length:3\n\na\0b\0";
    let frame = Frame::decode(raw).unwrap().unwrap();
    assert_eq!(frame.body, "a\0b");
}

#[test]
fn repeated_header_first_wins() {
    let raw = "MESSAGE\nfoo:first\nfoo:second\n\n\0";
    let frame = Frame::decode(raw).unwrap().unwrap();
    assert_eq!(frame.header("foo"), Some("first"));
}

#[test]
fn heartbeat_frames_decode_to_none() {
    assert_eq!(Frame::decode("\n").unwrap(), None);
    assert_eq!(Frame::decode("\r\n").unwrap(), None);
    assert_eq!(Frame::decode("").unwrap(), None);
}

#[test]
fn malformed_frames_are_errors() {
    assert_eq!(
        Frame::decode("HELLO\n\n\0"),
        Err(StompError::UnknownCommand("HELLO".into()))
    );
    assert_eq!(
        Frame::decode("MESSAGE\nno-colon\n\n\0"),
        Err(StompError::MalformedHeader("no-colon".into()))
    );
    assert_eq!(
        Frame::decode("MESSAGE\nfoo:bar"),
        Err(StompError::UnterminatedHeaders)
    );
    assert_eq!(
        Frame::decode("MESSAGE\n\nbody without nul"),
        Err(StompError::MissingTerminator)
    );
    assert_eq!(
        Frame::decode("MESSAGE\ncontent-length:99\n\nshort\0"),
        Err(StompError::ContentLength {
            declared: 99,
            actual: 6
        })
    );
    assert!(matches!(
        Frame::decode("MESSAGE\nbad:\\t\n\n\0"),
        Err(StompError::InvalidEscape(_))
    ));
    assert_eq!(Frame::decode("\0"), Err(StompError::EmptyFrame));
}

#[test]
fn heartbeat_header_parse() {
    assert_eq!(HeartBeat::parse("10000,0"), Some(HeartBeat::new(10000, 0)));
    assert_eq!(HeartBeat::parse(" 5 , 6 "), Some(HeartBeat::new(5, 6)));
    assert_eq!(HeartBeat::parse("garbage"), None);
    assert_eq!(HeartBeat::new(1, 2).header_value(), "1,2");
}

#[test]
fn negotiation_takes_the_larger_interval() {
    let n = negotiate(HeartBeat::new(10_000, 10_000), Some(HeartBeat::new(5_000, 20_000)));
    assert_eq!(n.send_every, Some(Duration::from_millis(20_000)));
    assert_eq!(n.expect_every, Some(Duration::from_millis(10_000)));
    assert_eq!(n.read_deadline(), Some(Duration::from_millis(20_000)));
}

#[test]
fn zero_on_either_side_disables() {
    let n = negotiate(HeartBeat::new(10_000, 0), Some(HeartBeat::new(10_000, 10_000)));
    assert_eq!(n.send_every, Some(Duration::from_millis(10_000)));
    assert_eq!(n.expect_every, None);
    assert_eq!(n.read_deadline(), None);

    let n = negotiate(HeartBeat::new(10_000, 10_000), None);
    assert_eq!(n, Negotiated::default());
}
