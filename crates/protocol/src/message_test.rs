//! Tests for request/response framing

use bytes::Bytes;

use crate::error::ProtocolError;
use crate::frame::{Command, FrameHead, Status};
use crate::message::{Request, Response};
use crate::types::{Counts, DataType, Event, Header, SampleBlock, WakeReason};
use crate::{FRAME_HEAD_LEN, MAX_PAYLOAD_LEN, PROTOCOL_VERSION};

/// Split an encoded frame into (head, payload)
fn split_frame(frame: Bytes) -> (FrameHead, Bytes) {
    let mut head = [0u8; FRAME_HEAD_LEN];
    head.copy_from_slice(&frame[..FRAME_HEAD_LEN]);
    let head = FrameHead::decode(&head).unwrap();
    let payload = frame.slice(FRAME_HEAD_LEN..);
    assert_eq!(head.payload_len as usize, payload.len());
    (head, payload)
}

fn round_trip_request(request: Request) -> Request {
    let (head, payload) = split_frame(request.encode());
    assert_eq!(head.version, PROTOCOL_VERSION);
    let command = head.command().unwrap();
    assert_eq!(command, request.command());
    Request::decode(command, payload).unwrap()
}

// =============================================================================
// Frame head
// =============================================================================

#[test]
fn test_frame_head_rejects_bad_version() {
    let mut raw = [0u8; FRAME_HEAD_LEN];
    raw[0..2].copy_from_slice(&99u16.to_be_bytes());
    assert!(matches!(
        FrameHead::decode(&raw),
        Err(ProtocolError::UnsupportedVersion(99))
    ));
}

#[test]
fn test_frame_head_rejects_oversized_payload() {
    let mut raw = [0u8; FRAME_HEAD_LEN];
    raw[0..2].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    raw[4..8].copy_from_slice(&(MAX_PAYLOAD_LEN + 1).to_be_bytes());
    assert!(matches!(
        FrameHead::decode(&raw),
        Err(ProtocolError::PayloadTooLarge { .. })
    ));
}

#[test]
fn test_unknown_command_code() {
    assert!(matches!(
        Command::from_u16(0x7777),
        Err(ProtocolError::UnknownCommand(0x7777))
    ));
}

// =============================================================================
// Request round trips
// =============================================================================

#[test]
fn test_put_header_round_trip() {
    let mut header = Header::new(16, 1000.0, DataType::I32);
    header.aux = Bytes::from_static(b"lab-a");
    let request = Request::PutHeader(header.clone());

    match round_trip_request(request) {
        Request::PutHeader(decoded) => assert_eq!(decoded, header),
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn test_put_samples_round_trip() {
    let data: Vec<u8> = (0..32).collect();
    let block = SampleBlock::new(2, 4, DataType::F32, Bytes::from(data)).unwrap();
    let request = Request::PutSamples(block.clone());

    match round_trip_request(request) {
        Request::PutSamples(decoded) => assert_eq!(decoded, block),
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn test_put_events_round_trip() {
    let events = vec![
        Event::marker("start", 0),
        Event {
            kind: "stimulus".into(),
            value: Bytes::from_static(b"face_07"),
            sample: 1250,
            offset: -3,
            duration: 100,
        },
    ];
    let request = Request::PutEvents(events.clone());

    match round_trip_request(request) {
        Request::PutEvents(decoded) => assert_eq!(decoded, events),
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn test_range_and_wait_round_trip() {
    match round_trip_request(Request::GetSamples { from: 5, to: 10 }) {
        Request::GetSamples { from: 5, to: 10 } => {}
        other => panic!("unexpected request: {other:?}"),
    }

    match round_trip_request(Request::WaitForData {
        min_samples: 100,
        min_events: 2,
        timeout_ms: 5000,
    }) {
        Request::WaitForData {
            min_samples: 100,
            min_events: 2,
            timeout_ms: 5000,
        } => {}
        other => panic!("unexpected request: {other:?}"),
    }
}

#[test]
fn test_empty_payload_commands() {
    for request in [
        Request::GetHeader,
        Request::FlushHeader,
        Request::FlushData,
        Request::FlushEvents,
        Request::GetCounts,
    ] {
        let (head, payload) = split_frame(request.encode());
        assert_eq!(head.payload_len, 0);
        assert_eq!(Request::decode(head.command().unwrap(), payload).unwrap(), request);
    }
}

// =============================================================================
// Malformed requests
// =============================================================================

#[test]
fn test_truncated_wait_payload() {
    let err = Request::decode(Command::WaitForData, Bytes::from_static(&[0; 10])).unwrap_err();
    assert!(matches!(err, ProtocolError::Truncated(_)));
}

#[test]
fn test_trailing_bytes_rejected() {
    let err = Request::decode(Command::GetCounts, Bytes::from_static(&[0; 3])).unwrap_err();
    assert!(matches!(err, ProtocolError::TrailingBytes(3)));
}

#[test]
fn test_block_shape_mismatch_rejected_at_decode() {
    // Claims 4 channels x 2 columns of f32 (32 bytes) but carries 16
    let mut good = Request::PutSamples(
        SampleBlock::new(4, 2, DataType::F32, Bytes::from(vec![0u8; 32])).unwrap(),
    )
    .encode()
    .to_vec();
    // Shrink the data length prefix and truncate
    let data_len_at = FRAME_HEAD_LEN + 4 + 8 + 1;
    good[data_len_at..data_len_at + 4].copy_from_slice(&16u32.to_be_bytes());
    good.truncate(data_len_at + 4 + 16);

    let payload = Bytes::from(good.split_off(FRAME_HEAD_LEN));
    let err = Request::decode(Command::PutSamples, payload).unwrap_err();
    assert!(matches!(err, ProtocolError::BlockSizeMismatch { .. }));
}

// =============================================================================
// Responses
// =============================================================================

#[test]
fn test_ok_response_is_empty() {
    let (head, payload) = split_frame(Response::Ok.encode());
    assert_eq!(head.status().unwrap(), Status::Ok);
    assert!(payload.is_empty());
    let decoded = Response::decode(Command::PutHeader, Status::Ok, payload).unwrap();
    assert_eq!(decoded, Response::Ok);
}

#[test]
fn test_counts_response_round_trip() {
    let response = Response::Counts(Counts {
        samples: 1500,
        events: 7,
    });
    let (head, payload) = split_frame(response.clone().encode());
    let decoded = Response::decode(Command::GetCounts, head.status().unwrap(), payload).unwrap();
    assert_eq!(decoded, response);
}

#[test]
fn test_wait_response_round_trip() {
    let response = Response::Wait {
        counts: Counts {
            samples: 10,
            events: 0,
        },
        wake: WakeReason::Flushed,
    };
    let (head, payload) = split_frame(response.clone().encode());
    let decoded = Response::decode(Command::WaitForData, head.status().unwrap(), payload).unwrap();
    assert_eq!(decoded, response);
}

#[test]
fn test_error_response_round_trip() {
    let response = Response::Error {
        status: Status::Evicted,
        message: "sample 0 evicted, oldest retained is 5".into(),
    };
    let (head, payload) = split_frame(response.clone().encode());
    assert_eq!(head.status().unwrap(), Status::Evicted);
    // Error decode ignores the command
    let decoded = Response::decode(Command::GetSamples, Status::Evicted, payload).unwrap();
    assert_eq!(decoded, response);
}

#[test]
fn test_get_samples_response_round_trip() {
    let block = SampleBlock::new(4, 5, DataType::I16, Bytes::from(vec![7u8; 40])).unwrap();
    let response = Response::Samples(block);
    let (head, payload) = split_frame(response.clone().encode());
    let decoded = Response::decode(Command::GetSamples, head.status().unwrap(), payload).unwrap();
    assert_eq!(decoded, response);
}
