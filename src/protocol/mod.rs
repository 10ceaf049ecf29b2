//! Protocol Module
//!
//! Defines the wire protocol for client-server communication over
//! named pipes. All frames are fixed width with NUL-padded text fields,
//! so a single pipe read always yields a whole frame.
//!
//! ## Frame Formats
//!
//! ### Registration (client → server, 121 bytes)
//! ```text
//! ┌──────────┬───────────────┬───────────────┬───────────────┐
//! │ Op (1)   │ req path (40) │ resp path (40)│ notif path(40)│
//! └──────────┴───────────────┴───────────────┴───────────────┘
//! ```
//!
//! ### Session request (client → server, 41 bytes)
//! ```text
//! ┌──────────┬────────────────────────────────┐
//! │ Op (1)   │           key (40)             │
//! └──────────┴────────────────────────────────┘
//! ```
//!
//! ### Session response (server → client, 2 bytes)
//! ```text
//! ┌──────────┬──────────┐
//! │ Op (1)   │Result (1)│
//! └──────────┴──────────┘
//! ```
//!
//! ### Notification (server → client, 82 bytes)
//! ```text
//! ┌────────────────┬────────────────┐
//! │    key (41)    │   value (41)   │
//! └────────────────┴────────────────┘
//! ```
//!
//! ## Opcodes
//! - 0x01: CONNECT
//! - 0x02: DISCONNECT
//! - 0x03: SUBSCRIBE
//! - 0x04: UNSUBSCRIBE
//!
//! ## Result Codes
//! - CONNECT / DISCONNECT: 0 = success
//! - SUBSCRIBE: 1 = key exists and subscription accepted, 0 = otherwise
//! - UNSUBSCRIBE: 0 = removed, 1 = not found

mod codec;
mod frames;

pub use codec::{
    decode_connect_request, decode_notification, decode_request, decode_response,
    encode_connect_request, encode_notification, encode_request, encode_response,
    read_connect_request, read_notification, read_request, read_response, write_frame,
};
pub use frames::{
    ConnectRequest, Notification, OpCode, Request, Response, CONNECT_FRAME_LEN, DELETED_SENTINEL,
    MAX_KEY_LEN, MAX_NOTIF_FIELD_LEN, MAX_PIPE_PATH_LEN, NOTIFICATION_FRAME_LEN, NOTIF_FIELD_LEN,
    PATH_FIELD_LEN, REQUEST_FRAME_LEN, REQUEST_KEY_FIELD_LEN, RESPONSE_FRAME_LEN,
};
