//! Protocol Tests
//!
//! Tests for frame encoding/decoding and the stream helpers.

use std::io::Cursor;

use pipekv::protocol::{
    decode_connect_request, decode_notification, decode_request, decode_response,
    encode_connect_request, encode_notification, encode_request, encode_response,
    read_connect_request, read_notification, read_request, read_response, write_frame,
    ConnectRequest, Notification, OpCode, Request, Response, CONNECT_FRAME_LEN, DELETED_SENTINEL,
    NOTIFICATION_FRAME_LEN, REQUEST_FRAME_LEN, RESPONSE_FRAME_LEN,
};
use pipekv::PipeKvError;

// =============================================================================
// Helper Functions
// =============================================================================

fn sample_connect() -> ConnectRequest {
    ConnectRequest {
        request_pipe: "/tmp/req_1".to_string(),
        response_pipe: "/tmp/resp_1".to_string(),
        notification_pipe: "/tmp/notif_1".to_string(),
    }
}

// =============================================================================
// Registration Frame Tests
// =============================================================================

#[test]
fn test_encode_decode_connect_request() {
    let request = sample_connect();
    let frame = encode_connect_request(&request).unwrap();

    assert_eq!(frame.len(), CONNECT_FRAME_LEN);
    assert_eq!(frame[0], OpCode::Connect as u8);

    let decoded = decode_connect_request(&frame).unwrap();
    assert_eq!(decoded, request);
}

#[test]
fn test_connect_request_path_too_long() {
    let mut request = sample_connect();
    request.response_pipe = "x".repeat(40);

    let err = encode_connect_request(&request).unwrap_err();
    match err {
        PipeKvError::FieldTooLong { max, got, .. } => {
            assert_eq!(max, 39);
            assert_eq!(got, 40);
        }
        other => panic!("Expected FieldTooLong, got {:?}", other),
    }
}

#[test]
fn test_connect_request_max_length_path_accepted() {
    let mut request = sample_connect();
    request.request_pipe = "x".repeat(39);

    let frame = encode_connect_request(&request).unwrap();
    let decoded = decode_connect_request(&frame).unwrap();
    assert_eq!(decoded.request_pipe, request.request_pipe);
}

#[test]
fn test_decode_connect_request_rejects_other_opcodes() {
    let mut frame = encode_connect_request(&sample_connect()).unwrap();
    frame[0] = OpCode::Subscribe as u8;

    assert!(decode_connect_request(&frame).is_err());
}

#[test]
fn test_decode_connect_request_rejects_empty_path() {
    let mut frame = encode_connect_request(&sample_connect()).unwrap();
    // Blank out the response path field.
    for b in frame[41..81].iter_mut() {
        *b = 0;
    }

    assert!(decode_connect_request(&frame).is_err());
}

#[test]
fn test_decode_connect_request_wrong_length() {
    let frame = [0u8; CONNECT_FRAME_LEN - 1];
    assert!(decode_connect_request(&frame).is_err());
}

// =============================================================================
// Request Frame Tests
// =============================================================================

#[test]
fn test_encode_decode_subscribe() {
    let request = Request::Subscribe {
        key: "sensor-7".to_string(),
    };
    let frame = encode_request(&request).unwrap();

    assert_eq!(frame.len(), REQUEST_FRAME_LEN);
    assert_eq!(frame[0], OpCode::Subscribe as u8);
    assert_eq!(decode_request(&frame).unwrap(), request);
}

#[test]
fn test_encode_decode_unsubscribe() {
    let request = Request::Unsubscribe {
        key: "sensor-7".to_string(),
    };
    let frame = encode_request(&request).unwrap();
    assert_eq!(decode_request(&frame).unwrap(), request);
}

#[test]
fn test_encode_decode_disconnect() {
    let frame = encode_request(&Request::Disconnect).unwrap();

    // No payload: every byte after the opcode stays zero.
    assert!(frame[1..].iter().all(|&b| b == 0));
    assert_eq!(decode_request(&frame).unwrap(), Request::Disconnect);
}

#[test]
fn test_request_key_too_long() {
    let request = Request::Subscribe {
        key: "k".repeat(40),
    };
    assert!(matches!(
        encode_request(&request),
        Err(PipeKvError::FieldTooLong { .. })
    ));
}

#[test]
fn test_request_key_embedded_nul_rejected() {
    let request = Request::Subscribe {
        key: "a\0b".to_string(),
    };
    assert!(encode_request(&request).is_err());
}

#[test]
fn test_decode_request_unknown_opcode() {
    let mut frame = [0u8; REQUEST_FRAME_LEN];
    frame[0] = 0x7f;
    assert!(decode_request(&frame).is_err());
}

#[test]
fn test_decode_request_rejects_connect_opcode() {
    let mut frame = [0u8; REQUEST_FRAME_LEN];
    frame[0] = OpCode::Connect as u8;
    assert!(decode_request(&frame).is_err());
}

// =============================================================================
// Response Frame Tests
// =============================================================================

#[test]
fn test_encode_decode_response() {
    for (op, result) in [
        (OpCode::Connect, 0u8),
        (OpCode::Subscribe, 1),
        (OpCode::Unsubscribe, 0),
        (OpCode::Disconnect, 0),
    ] {
        let response = Response::new(op, result);
        let frame = encode_response(&response);

        assert_eq!(frame.len(), RESPONSE_FRAME_LEN);
        assert_eq!(decode_response(&frame).unwrap(), response);
    }
}

#[test]
fn test_decode_response_unknown_opcode() {
    assert!(decode_response(&[0xee, 0]).is_err());
}

// =============================================================================
// Notification Frame Tests
// =============================================================================

#[test]
fn test_encode_decode_notification() {
    let notification = Notification {
        key: "a".to_string(),
        value: "1".to_string(),
    };
    let frame = encode_notification(&notification).unwrap();

    assert_eq!(frame.len(), NOTIFICATION_FRAME_LEN);
    let decoded = decode_notification(&frame).unwrap();
    assert_eq!(decoded, notification);
    assert!(!decoded.is_delete());
}

#[test]
fn test_notification_delete_sentinel() {
    let notification = Notification {
        key: "a".to_string(),
        value: DELETED_SENTINEL.to_string(),
    };
    let frame = encode_notification(&notification).unwrap();
    assert!(decode_notification(&frame).unwrap().is_delete());
}

#[test]
fn test_notification_value_too_long() {
    let notification = Notification {
        key: "a".to_string(),
        value: "v".repeat(41),
    };
    assert!(matches!(
        encode_notification(&notification),
        Err(PipeKvError::FieldTooLong { .. })
    ));
}

#[test]
fn test_notification_forty_byte_value_accepted() {
    let notification = Notification {
        key: "a".to_string(),
        value: "v".repeat(40),
    };
    let frame = encode_notification(&notification).unwrap();
    assert_eq!(decode_notification(&frame).unwrap(), notification);
}

// =============================================================================
// Stream Helper Tests
// =============================================================================

#[test]
fn test_stream_round_trip_all_frames() {
    let mut stream = Vec::new();

    let connect = encode_connect_request(&sample_connect()).unwrap();
    write_frame(&mut stream, &connect).unwrap();

    let request = encode_request(&Request::Subscribe {
        key: "k".to_string(),
    })
    .unwrap();
    write_frame(&mut stream, &request).unwrap();

    let response = encode_response(&Response::new(OpCode::Subscribe, 1));
    write_frame(&mut stream, &response).unwrap();

    let notification = encode_notification(&Notification {
        key: "k".to_string(),
        value: "v".to_string(),
    })
    .unwrap();
    write_frame(&mut stream, &notification).unwrap();

    let mut reader = Cursor::new(stream);
    assert_eq!(read_connect_request(&mut reader).unwrap(), sample_connect());
    assert_eq!(
        read_request(&mut reader).unwrap(),
        Request::Subscribe {
            key: "k".to_string()
        }
    );
    assert_eq!(
        read_response(&mut reader).unwrap(),
        Response::new(OpCode::Subscribe, 1)
    );
    assert_eq!(
        read_notification(&mut reader).unwrap(),
        Notification {
            key: "k".to_string(),
            value: "v".to_string()
        }
    );
}

#[test]
fn test_stream_read_truncated_frame() {
    let mut reader = Cursor::new(vec![OpCode::Subscribe as u8, b'k']);
    assert!(read_request(&mut reader).is_err());
}
