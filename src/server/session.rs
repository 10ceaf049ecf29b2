//! Session protocol handler
//!
//! The per-session state machine: `Connecting → Active → Closed`. The
//! manager that admitted the session runs the handler synchronously, so
//! the handler thread owns the request channel's read side outright and
//! only takes the slot lock for the brief moments it touches shared
//! session state.

use std::fs::File;
use std::io::Read;
use std::sync::Arc;

use crate::engine::Engine;
use crate::ipc;
use crate::protocol::{decode_request, OpCode, Request, Response, REQUEST_FRAME_LEN};

use super::registry::SessionRegistry;
use super::shutdown::ShutdownToken;

/// Runs one admitted session to completion
pub struct SessionHandler {
    /// Slot this session occupies in the registry
    slot: usize,

    /// Client → server request channel, owned by this handler alone
    request_pipe: File,

    registry: Arc<SessionRegistry>,
    engine: Arc<Engine>,
    token: ShutdownToken,
    poll_interval_ms: u16,
}

impl SessionHandler {
    pub fn new(
        slot: usize,
        request_pipe: File,
        registry: Arc<SessionRegistry>,
        engine: Arc<Engine>,
        token: ShutdownToken,
        poll_interval_ms: u16,
    ) -> Self {
        Self {
            slot,
            request_pipe,
            registry,
            engine,
            token,
            poll_interval_ms,
        }
    }

    /// Drive the session until it closes
    ///
    /// Exits on client disconnect, channel EOF or error, shutdown, or the
    /// slot being torn down out from under us. The slot release at the end
    /// is idempotent against a concurrent teardown.
    pub fn run(mut self) {
        loop {
            if self.token.is_triggered() {
                break;
            }
            // A teardown empties the slot; the request channel is ours to
            // close on the way out.
            if !self.registry.is_active(self.slot) {
                break;
            }

            match ipc::wait_readable(&self.request_pipe, self.poll_interval_ms) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    tracing::warn!("Session {}: poll failed: {}", self.slot, e);
                    break;
                }
            }

            let mut frame = [0u8; REQUEST_FRAME_LEN];
            match self.request_pipe.read(&mut frame) {
                Ok(0) => {
                    tracing::debug!("Session {}: client closed request channel", self.slot);
                    break;
                }
                Ok(n) if n < REQUEST_FRAME_LEN => {
                    tracing::warn!(
                        "Session {}: short request frame ({} bytes), closing",
                        self.slot,
                        n
                    );
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Session {}: request read failed: {}", self.slot, e);
                    break;
                }
            }

            let request = match decode_request(&frame) {
                Ok(request) => request,
                Err(e) => {
                    // Protocol violation: log and keep the session alive,
                    // without a response.
                    tracing::error!("Session {}: {}", self.slot, e);
                    continue;
                }
            };

            if !self.handle_request(request) {
                break;
            }
        }

        if self.registry.release(self.slot).is_some() {
            tracing::debug!("Session {} closed", self.slot);
        }
    }

    /// Handle one decoded request; returns `false` to close the session
    fn handle_request(&mut self, request: Request) -> bool {
        match request {
            Request::Subscribe { key } => {
                let mut result = 0u8;
                if self.engine.key_exists(&key) {
                    let accepted = self
                        .registry
                        .with_session(self.slot, |session| session.subscriptions.insert(&key));
                    match accepted {
                        Some(true) => result = 1,
                        // Full set: refused; the stale default result
                        // still goes back.
                        Some(false) => {
                            tracing::debug!(
                                "Session {}: subscription set full, refusing key '{}'",
                                self.slot,
                                key
                            );
                        }
                        None => return false,
                    }
                }
                self.respond(Response::new(OpCode::Subscribe, result))
            }

            Request::Unsubscribe { key } => {
                let removed = self
                    .registry
                    .with_session(self.slot, |session| session.subscriptions.remove(&key));
                match removed {
                    Some(removed) => {
                        let result = if removed { 0 } else { 1 };
                        self.respond(Response::new(OpCode::Unsubscribe, result))
                    }
                    None => false,
                }
            }

            Request::Disconnect => {
                let sent = self.registry.with_session(self.slot, |session| {
                    session.subscriptions.clear();
                    session.deactivate();
                    session.send_response(Response::new(OpCode::Disconnect, 0))
                });
                if let Some(Err(e)) = sent {
                    tracing::warn!("Session {}: disconnect response failed: {}", self.slot, e);
                }
                false
            }
        }
    }

    /// Send a response frame; returns `false` when the session must close
    fn respond(&mut self, response: Response) -> bool {
        let sent = self
            .registry
            .with_session(self.slot, |session| session.send_response(response));
        match sent {
            Some(Ok(())) => true,
            Some(Err(e)) => {
                tracing::warn!("Session {}: response write failed: {}", self.slot, e);
                false
            }
            None => false,
        }
    }
}
