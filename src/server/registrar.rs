//! Connection registrar
//!
//! The single thread that reads connect frames from the well-known
//! registration channel and feeds the bounded connection queue. A valid
//! request is never dropped: when the queue is full, the push blocks and
//! backpressure reaches clients through the registration channel itself.
//! Malformed or non-connect frames are discarded.

use std::fs::File;
use std::io::Read;
use std::sync::Arc;

use crate::ipc;
use crate::protocol::{decode_connect_request, CONNECT_FRAME_LEN};

use super::queue::ConnectionQueue;
use super::shutdown::ShutdownToken;

/// Reads registration frames and enqueues connection requests
pub struct Registrar {
    /// Registration channel, held read-write so it never reaches EOF
    channel: File,

    queue: Arc<ConnectionQueue>,
    token: ShutdownToken,
    poll_interval_ms: u16,
}

impl Registrar {
    pub fn new(
        channel: File,
        queue: Arc<ConnectionQueue>,
        token: ShutdownToken,
        poll_interval_ms: u16,
    ) -> Self {
        Self {
            channel,
            queue,
            token,
            poll_interval_ms,
        }
    }

    /// Run until shutdown is requested or the queue is closed
    pub fn run(mut self) {
        loop {
            if self.token.is_triggered() {
                break;
            }

            match ipc::wait_readable(&self.channel, self.poll_interval_ms) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    tracing::error!("Registrar poll failed: {}", e);
                    break;
                }
            }

            let mut frame = [0u8; CONNECT_FRAME_LEN];
            match self.channel.read(&mut frame) {
                Ok(0) => continue,
                Ok(n) if n < CONNECT_FRAME_LEN => {
                    tracing::debug!("Discarding short registration frame ({} bytes)", n);
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Registration channel read failed: {}", e);
                    continue;
                }
            }

            match decode_connect_request(&frame) {
                Ok(request) => {
                    tracing::debug!(
                        "Connection request: req={} resp={} notif={}",
                        request.request_pipe,
                        request.response_pipe,
                        request.notification_pipe
                    );
                    if !self.queue.push(request) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!("Discarding malformed registration frame: {}", e);
                }
            }
        }

        tracing::debug!("Registrar stopped");
    }
}
