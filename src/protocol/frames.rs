//! Frame definitions
//!
//! Typed views of the fixed-width wire frames.

use crate::error::{PipeKvError, Result};

// =============================================================================
// Field Widths
// =============================================================================

/// Width of a channel-path field in the registration frame
pub const PATH_FIELD_LEN: usize = 40;

/// Width of the key field in a session request frame
pub const REQUEST_KEY_FIELD_LEN: usize = 40;

/// Width of the key and value fields in a notification frame
pub const NOTIF_FIELD_LEN: usize = 41;

/// Registration frame: opcode + three NUL-padded path fields
pub const CONNECT_FRAME_LEN: usize = 1 + 3 * PATH_FIELD_LEN;

/// Session request frame: opcode + NUL-padded key field
pub const REQUEST_FRAME_LEN: usize = 1 + REQUEST_KEY_FIELD_LEN;

/// Session response frame: echoed opcode + result byte
pub const RESPONSE_FRAME_LEN: usize = 2;

/// Notification frame: NUL-padded key and value fields
pub const NOTIFICATION_FRAME_LEN: usize = 2 * NOTIF_FIELD_LEN;

/// Maximum channel-path length (one byte of each field is the terminator)
pub const MAX_PIPE_PATH_LEN: usize = PATH_FIELD_LEN - 1;

/// Maximum key length in a session request
pub const MAX_KEY_LEN: usize = REQUEST_KEY_FIELD_LEN - 1;

/// Maximum key/value length in a notification
pub const MAX_NOTIF_FIELD_LEN: usize = NOTIF_FIELD_LEN - 1;

/// Value pushed to subscribers when a key is deleted
pub const DELETED_SENTINEL: &str = "DELETED";

// =============================================================================
// Opcodes
// =============================================================================

/// Operation codes shared by all client → server frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Connect = 0x01,
    Disconnect = 0x02,
    Subscribe = 0x03,
    Unsubscribe = 0x04,
}

impl OpCode {
    /// Parse an opcode byte
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(OpCode::Connect),
            0x02 => Ok(OpCode::Disconnect),
            0x03 => Ok(OpCode::Subscribe),
            0x04 => Ok(OpCode::Unsubscribe),
            _ => Err(PipeKvError::Protocol(format!(
                "Unknown opcode: 0x{:02x}",
                byte
            ))),
        }
    }
}

// =============================================================================
// Frames
// =============================================================================

/// A decoded registration frame: the three channel paths one client
/// asks the server to attach to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Client → server request channel
    pub request_pipe: String,

    /// Server → client response channel
    pub response_pipe: String,

    /// Server → client notification channel
    pub notification_pipe: String,
}

/// A decoded session request frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Subscribe to change notifications for a key
    Subscribe { key: String },

    /// Stop receiving notifications for a key
    Unsubscribe { key: String },

    /// End the session
    Disconnect,
}

impl Request {
    /// The opcode this request is carried under
    pub fn op_code(&self) -> OpCode {
        match self {
            Request::Subscribe { .. } => OpCode::Subscribe,
            Request::Unsubscribe { .. } => OpCode::Unsubscribe,
            Request::Disconnect => OpCode::Disconnect,
        }
    }
}

/// A session response frame: the echoed opcode plus a result byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Opcode of the request being answered
    pub op: OpCode,

    /// Result byte; semantics depend on the opcode
    pub result: u8,
}

impl Response {
    pub fn new(op: OpCode, result: u8) -> Self {
        Self { op, result }
    }
}

/// A notification frame pushed to a subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// The changed key
    pub key: String,

    /// New value, or [`DELETED_SENTINEL`] when the key was removed
    pub value: String,
}

impl Notification {
    /// True when this notification announces a deletion
    pub fn is_delete(&self) -> bool {
        self.value == DELETED_SENTINEL
    }
}
