//! Client Module
//!
//! The library side of the session protocol: create the three per-client
//! channels, register with the server, and drive
//! subscribe/unsubscribe/disconnect round trips. Notifications arrive on
//! their own channel and are decoded by a background reader thread that
//! forwards them over a crossbeam channel.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam::channel::{unbounded, Receiver};

use crate::error::{PipeKvError, Result};
use crate::ipc;
use crate::protocol::{
    encode_connect_request, encode_request, read_notification, read_response, write_frame,
    ConnectRequest, Notification, OpCode, Request, Response,
};

/// A connected PipeKV client
///
/// Dropping the client removes its channels from the filesystem
/// (best effort); a polite shutdown goes through [`Client::disconnect`].
pub struct Client {
    request_pipe: File,
    response_pipe: File,

    /// Read side of the notification channel, handed to the reader thread
    /// by [`Client::notifications`]
    notification_pipe: Option<File>,

    request_path: PathBuf,
    response_path: PathBuf,
    notification_path: PathBuf,
}

impl Client {
    /// Connect to a server through its registration channel
    ///
    /// Creates the three client-side channels, sends the registration
    /// frame, performs the rendezvous opens (request, response,
    /// notification — the same order the server opens its ends) and checks
    /// the connect acknowledgement. On failure the created channels are
    /// removed again.
    pub fn connect(
        register_path: &Path,
        request_path: &Path,
        response_path: &Path,
        notification_path: &Path,
    ) -> Result<Self> {
        let connect = ConnectRequest {
            request_pipe: request_path.to_string_lossy().into_owned(),
            response_pipe: response_path.to_string_lossy().into_owned(),
            notification_pipe: notification_path.to_string_lossy().into_owned(),
        };
        // Encode first: path-length violations surface before any FIFO is
        // created.
        let frame = encode_connect_request(&connect)?;

        let result = Self::connect_channels(register_path, &frame, request_path, response_path, notification_path);
        if result.is_err() {
            for path in [request_path, response_path, notification_path] {
                let _ = ipc::remove_channel(path);
            }
        }
        result
    }

    fn connect_channels(
        register_path: &Path,
        frame: &[u8],
        request_path: &Path,
        response_path: &Path,
        notification_path: &Path,
    ) -> Result<Self> {
        ipc::create_channel(request_path)?;
        ipc::create_channel(response_path)?;
        ipc::create_channel(notification_path)?;

        {
            let mut register = ipc::open_write(register_path)?;
            write_frame(&mut register, frame)?;
        }

        let request_pipe = ipc::open_write(request_path)?;
        let response_pipe = ipc::open_read(response_path)?;
        let notification_pipe = ipc::open_read(notification_path)?;

        let mut client = Self {
            request_pipe,
            response_pipe,
            notification_pipe: Some(notification_pipe),
            request_path: request_path.to_path_buf(),
            response_path: response_path.to_path_buf(),
            notification_path: notification_path.to_path_buf(),
        };

        let ack = read_response(&mut client.response_pipe)?;
        if ack.op != OpCode::Connect || ack.result != 0 {
            return Err(PipeKvError::Protocol(format!(
                "Server rejected connection (op {:?}, result {})",
                ack.op, ack.result
            )));
        }
        tracing::debug!("Connected via {}", register_path.display());

        Ok(client)
    }

    /// Subscribe to change notifications for `key`
    ///
    /// Returns `true` when the key exists and the subscription was
    /// accepted.
    pub fn subscribe(&mut self, key: &str) -> Result<bool> {
        let response = self.round_trip(Request::Subscribe {
            key: key.to_owned(),
        })?;
        Ok(response.result == 1)
    }

    /// Stop receiving notifications for `key`
    ///
    /// Returns `true` when the key was subscribed and is now removed.
    pub fn unsubscribe(&mut self, key: &str) -> Result<bool> {
        let response = self.round_trip(Request::Unsubscribe {
            key: key.to_owned(),
        })?;
        Ok(response.result == 0)
    }

    /// Start the notification reader
    ///
    /// Spawns a thread that decodes notification frames and forwards them
    /// on the returned channel; the thread ends when the server closes the
    /// notification channel or the receiver is dropped. Callable once.
    pub fn notifications(&mut self) -> Result<Receiver<Notification>> {
        let mut pipe = self.notification_pipe.take().ok_or_else(|| {
            PipeKvError::Channel("Notification reader already started".to_string())
        })?;

        let (sender, receiver) = unbounded();
        thread::Builder::new()
            .name("notification-reader".to_string())
            .spawn(move || loop {
                match read_notification(&mut pipe) {
                    Ok(notification) => {
                        if sender.send(notification).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            })?;

        Ok(receiver)
    }

    /// End the session
    pub fn disconnect(mut self) -> Result<()> {
        let response = self.round_trip(Request::Disconnect)?;
        if response.result != 0 {
            return Err(PipeKvError::Protocol(format!(
                "Server failed to disconnect (result {})",
                response.result
            )));
        }
        Ok(())
    }

    /// Send one request frame and read the matching response
    fn round_trip(&mut self, request: Request) -> Result<Response> {
        let expected_op = request.op_code();
        let frame = encode_request(&request)?;
        write_frame(&mut self.request_pipe, &frame)?;

        let response = read_response(&mut self.response_pipe)?;
        if response.op != expected_op {
            return Err(PipeKvError::Protocol(format!(
                "Response opcode mismatch: sent {:?}, got {:?}",
                expected_op, response.op
            )));
        }
        Ok(response)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        for path in [
            &self.request_path,
            &self.response_path,
            &self.notification_path,
        ] {
            let _ = ipc::remove_channel(path);
        }
    }
}
