//! Protocol codec
//!
//! Encoding and decoding for the fixed-width wire frames, plus stream
//! helpers that read and write whole frames. Text fields are NUL-padded to
//! their fixed width; oversized input is rejected at this boundary rather
//! than truncated.

use std::io::{Read, Write};

use crate::error::{PipeKvError, Result};

use super::frames::{
    ConnectRequest, Notification, OpCode, Request, Response, CONNECT_FRAME_LEN, NOTIFICATION_FRAME_LEN,
    NOTIF_FIELD_LEN, PATH_FIELD_LEN, REQUEST_FRAME_LEN, REQUEST_KEY_FIELD_LEN, RESPONSE_FRAME_LEN,
};

// =============================================================================
// Field helpers
// =============================================================================

/// Copy `text` into a NUL-padded field of width `width`
///
/// The last byte of the field is always a terminator, so `text` may hold at
/// most `width - 1` bytes. Embedded NULs are rejected because they would
/// shorten the field on decode.
fn pack_field(dst: &mut [u8], text: &str, width: usize, what: &'static str) -> Result<()> {
    debug_assert_eq!(dst.len(), width);

    let bytes = text.as_bytes();
    if bytes.len() > width - 1 {
        return Err(PipeKvError::FieldTooLong {
            what,
            max: width - 1,
            got: bytes.len(),
        });
    }
    if bytes.contains(&0) {
        return Err(PipeKvError::Protocol(format!(
            "{} contains an embedded NUL byte",
            what
        )));
    }

    dst[..bytes.len()].copy_from_slice(bytes);
    for b in dst[bytes.len()..].iter_mut() {
        *b = 0;
    }
    Ok(())
}

/// Decode a NUL-padded field back into a string (up to the first NUL)
fn unpack_field(src: &[u8], what: &'static str) -> Result<String> {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    std::str::from_utf8(&src[..end])
        .map(str::to_owned)
        .map_err(|e| PipeKvError::Protocol(format!("{} is not valid UTF-8: {}", what, e)))
}

// =============================================================================
// Registration Frame
// =============================================================================

/// Encode a registration frame
pub fn encode_connect_request(req: &ConnectRequest) -> Result<[u8; CONNECT_FRAME_LEN]> {
    let mut frame = [0u8; CONNECT_FRAME_LEN];
    frame[0] = OpCode::Connect as u8;

    let fields = [
        (&req.request_pipe, "request pipe path"),
        (&req.response_pipe, "response pipe path"),
        (&req.notification_pipe, "notification pipe path"),
    ];
    for (i, (path, what)) in fields.iter().enumerate() {
        let start = 1 + i * PATH_FIELD_LEN;
        pack_field(
            &mut frame[start..start + PATH_FIELD_LEN],
            path,
            PATH_FIELD_LEN,
            what,
        )?;
    }

    Ok(frame)
}

/// Decode a registration frame
///
/// Any opcode other than CONNECT is a protocol error; the registrar
/// discards such frames.
pub fn decode_connect_request(frame: &[u8]) -> Result<ConnectRequest> {
    if frame.len() != CONNECT_FRAME_LEN {
        return Err(PipeKvError::Protocol(format!(
            "Registration frame: expected {} bytes, got {}",
            CONNECT_FRAME_LEN,
            frame.len()
        )));
    }
    if OpCode::from_u8(frame[0])? != OpCode::Connect {
        return Err(PipeKvError::Protocol(format!(
            "Registration frame carries non-connect opcode 0x{:02x}",
            frame[0]
        )));
    }

    let field = |i: usize| {
        let start = 1 + i * PATH_FIELD_LEN;
        &frame[start..start + PATH_FIELD_LEN]
    };

    let request_pipe = unpack_field(field(0), "request pipe path")?;
    let response_pipe = unpack_field(field(1), "response pipe path")?;
    let notification_pipe = unpack_field(field(2), "notification pipe path")?;

    if request_pipe.is_empty() || response_pipe.is_empty() || notification_pipe.is_empty() {
        return Err(PipeKvError::Protocol(
            "Registration frame with empty channel path".to_string(),
        ));
    }

    Ok(ConnectRequest {
        request_pipe,
        response_pipe,
        notification_pipe,
    })
}

// =============================================================================
// Session Request Frame
// =============================================================================

/// Encode a session request frame
pub fn encode_request(request: &Request) -> Result<[u8; REQUEST_FRAME_LEN]> {
    let mut frame = [0u8; REQUEST_FRAME_LEN];
    frame[0] = request.op_code() as u8;

    match request {
        Request::Subscribe { key } | Request::Unsubscribe { key } => {
            pack_field(&mut frame[1..], key, REQUEST_KEY_FIELD_LEN, "key")?;
        }
        Request::Disconnect => {}
    }

    Ok(frame)
}

/// Decode a session request frame
pub fn decode_request(frame: &[u8]) -> Result<Request> {
    if frame.len() != REQUEST_FRAME_LEN {
        return Err(PipeKvError::Protocol(format!(
            "Request frame: expected {} bytes, got {}",
            REQUEST_FRAME_LEN,
            frame.len()
        )));
    }

    match OpCode::from_u8(frame[0])? {
        OpCode::Subscribe => Ok(Request::Subscribe {
            key: unpack_field(&frame[1..], "key")?,
        }),
        OpCode::Unsubscribe => Ok(Request::Unsubscribe {
            key: unpack_field(&frame[1..], "key")?,
        }),
        OpCode::Disconnect => Ok(Request::Disconnect),
        OpCode::Connect => Err(PipeKvError::Protocol(
            "CONNECT is not valid on an established session".to_string(),
        )),
    }
}

// =============================================================================
// Session Response Frame
// =============================================================================

/// Encode a session response frame
pub fn encode_response(response: &Response) -> [u8; RESPONSE_FRAME_LEN] {
    [response.op as u8, response.result]
}

/// Decode a session response frame
pub fn decode_response(frame: &[u8]) -> Result<Response> {
    if frame.len() != RESPONSE_FRAME_LEN {
        return Err(PipeKvError::Protocol(format!(
            "Response frame: expected {} bytes, got {}",
            RESPONSE_FRAME_LEN,
            frame.len()
        )));
    }
    Ok(Response {
        op: OpCode::from_u8(frame[0])?,
        result: frame[1],
    })
}

// =============================================================================
// Notification Frame
// =============================================================================

/// Encode a notification frame
pub fn encode_notification(notification: &Notification) -> Result<[u8; NOTIFICATION_FRAME_LEN]> {
    let mut frame = [0u8; NOTIFICATION_FRAME_LEN];
    pack_field(
        &mut frame[..NOTIF_FIELD_LEN],
        &notification.key,
        NOTIF_FIELD_LEN,
        "notification key",
    )?;
    pack_field(
        &mut frame[NOTIF_FIELD_LEN..],
        &notification.value,
        NOTIF_FIELD_LEN,
        "notification value",
    )?;
    Ok(frame)
}

/// Decode a notification frame
pub fn decode_notification(frame: &[u8]) -> Result<Notification> {
    if frame.len() != NOTIFICATION_FRAME_LEN {
        return Err(PipeKvError::Protocol(format!(
            "Notification frame: expected {} bytes, got {}",
            NOTIFICATION_FRAME_LEN,
            frame.len()
        )));
    }
    Ok(Notification {
        key: unpack_field(&frame[..NOTIF_FIELD_LEN], "notification key")?,
        value: unpack_field(&frame[NOTIF_FIELD_LEN..], "notification value")?,
    })
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one registration frame from a stream
pub fn read_connect_request<R: Read>(reader: &mut R) -> Result<ConnectRequest> {
    let mut frame = [0u8; CONNECT_FRAME_LEN];
    reader.read_exact(&mut frame)?;
    decode_connect_request(&frame)
}

/// Read one session request frame from a stream
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let mut frame = [0u8; REQUEST_FRAME_LEN];
    reader.read_exact(&mut frame)?;
    decode_request(&frame)
}

/// Read one session response frame from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let mut frame = [0u8; RESPONSE_FRAME_LEN];
    reader.read_exact(&mut frame)?;
    decode_response(&frame)
}

/// Read one notification frame from a stream
pub fn read_notification<R: Read>(reader: &mut R) -> Result<Notification> {
    let mut frame = [0u8; NOTIFICATION_FRAME_LEN];
    reader.read_exact(&mut frame)?;
    decode_notification(&frame)
}

/// Write an encoded frame to a stream
///
/// Frames are at most 121 bytes, well under `PIPE_BUF`, so a single write
/// is atomic with respect to other writers on the same pipe.
pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}
