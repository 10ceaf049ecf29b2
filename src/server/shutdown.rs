//! Shutdown coordination
//!
//! A shared cancellation token plus the signal watcher thread. Signals are
//! consumed on an ordinary thread blocking on a `signal-hook` iterator, so
//! the teardown work runs under normal locking rules — nothing here is
//! constrained to async-signal-safe operations.
//!
//! Signal semantics:
//! - SIGUSR1: force-close every active session; the server keeps serving.
//! - SIGINT / SIGTERM: force-close every session and trip the shutdown
//!   token so the registrar, managers and queue wind down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1};
use signal_hook::iterator::Signals;

use crate::error::Result;

use super::registry::SessionRegistry;

/// Cooperative cancellation token
///
/// Checked at every poll-loop iteration by the registrar and the session
/// handlers; tripping it is idempotent.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    triggered: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown; every loop observes it at its next check
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

/// Spawn the signal watcher thread
///
/// The thread blocks on the signal iterator for the life of the process;
/// it is not joined on shutdown.
pub fn spawn_signal_watcher(
    registry: Arc<SessionRegistry>,
    token: ShutdownToken,
) -> Result<JoinHandle<()>> {
    let mut signals = Signals::new([SIGUSR1, SIGINT, SIGTERM])?;

    let handle = thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                let closed = registry.teardown_all();
                tracing::info!(
                    "Signal {}: force-closed {} session(s)",
                    signal,
                    closed
                );
                if signal != SIGUSR1 {
                    token.trigger();
                    tracing::info!("Shutting down");
                    break;
                }
            }
        })?;

    Ok(handle)
}
