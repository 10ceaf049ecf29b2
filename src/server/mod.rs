//! Server Module
//!
//! Wires the whole serving side together:
//!
//! ```text
//! registration FIFO ──▶ Registrar ──▶ ConnectionQueue ──▶ Manager pool
//!                                                            │ (one session
//!                                                            ▼  per manager)
//!                                                     SessionHandler ──▶ SessionRegistry
//!                                                                             ▲
//! jobs dir ──▶ Dispatcher pool ──▶ Engine ──▶ Notifier ──────────────────────┘
//! ```
//!
//! `Server::run` performs setup (fatal errors propagate to the binary),
//! spawns the registrar, the session manager pool, the signal watcher and
//! the job dispatcher pool, then serves until the shutdown token trips.

mod notifier;
mod queue;
mod registrar;
mod registry;
mod session;
mod shutdown;

pub use notifier::Notifier;
pub use queue::ConnectionQueue;
pub use registrar::Registrar;
pub use registry::{Session, SessionRegistry, SubscriptionSet};
pub use session::SessionHandler;
pub use shutdown::{spawn_signal_watcher, ShutdownToken};

use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::ipc;
use crate::jobs::{run_jobs, BackupThrottle};
use crate::protocol::{ConnectRequest, OpCode, Response};

/// The PipeKV server
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    registry: Arc<SessionRegistry>,
    token: ShutdownToken,
}

impl Server {
    /// Create a new server with the given config and engine
    pub fn new(config: Config, engine: Arc<Engine>) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(SessionRegistry::new(config.max_sessions));
        Ok(Self {
            config,
            engine,
            registry,
            token: ShutdownToken::new(),
        })
    }

    /// Start the server (blocking)
    ///
    /// Returns once the shutdown token has tripped and every component has
    /// wound down, or immediately with an error on setup failure.
    pub fn run(&mut self) -> Result<()> {
        // Registration channel first: a stale FIFO is replaced, and any
        // failure here is fatal before a single client is served.
        ipc::create_channel(&self.config.register_pipe_path)?;
        let register_channel = ipc::open_read_shared(&self.config.register_pipe_path)?;
        tracing::info!(
            "Registration channel ready at {}",
            self.config.register_pipe_path.display()
        );

        let _watcher = spawn_signal_watcher(Arc::clone(&self.registry), self.token.clone())?;

        let queue = Arc::new(ConnectionQueue::new(self.config.queue_capacity));

        // Session manager pool: one thread per table slot.
        let managers = self.spawn_managers(Arc::clone(&queue))?;

        let registrar = Registrar::new(
            register_channel,
            Arc::clone(&queue),
            self.token.clone(),
            self.config.poll_interval_ms,
        );
        let registrar_handle = thread::Builder::new()
            .name("registrar".to_string())
            .spawn(move || registrar.run())?;

        // Job processing runs concurrently with session serving; this call
        // blocks until every job file has been drained.
        let notifier = Arc::new(Notifier::new(Arc::clone(&self.registry)));
        let throttle = Arc::new(BackupThrottle::new(self.config.max_concurrent_backups));
        run_jobs(
            &self.config.jobs_dir,
            self.config.max_dispatchers,
            Arc::clone(&self.engine),
            notifier,
            Arc::clone(&throttle),
        )?;
        throttle.drain();
        tracing::info!("Job processing complete");

        // Serve sessions until shutdown.
        if registrar_handle.join().is_err() {
            tracing::error!("Registrar thread panicked");
        }
        queue.close();
        for manager in managers {
            if manager.join().is_err() {
                tracing::error!("Session manager thread panicked");
            }
        }

        // Stragglers admitted during wind-down, and the reap-everything
        // guarantee for backups.
        self.registry.teardown_all();
        throttle.drain();
        ipc::remove_channel(&self.config.register_pipe_path)?;

        Ok(())
    }

    /// Signal the server to shut down
    pub fn shutdown(&self) {
        self.token.trigger();
    }

    fn spawn_managers(&self, queue: Arc<ConnectionQueue>) -> Result<Vec<JoinHandle<()>>> {
        let mut managers = Vec::with_capacity(self.config.max_sessions);
        for index in 0..self.config.max_sessions {
            let queue = Arc::clone(&queue);
            let registry = Arc::clone(&self.registry);
            let engine = Arc::clone(&self.engine);
            let token = self.token.clone();
            let max_subscriptions = self.config.max_subscriptions;
            let poll_interval_ms = self.config.poll_interval_ms;

            let handle = thread::Builder::new()
                .name(format!("session-manager-{}", index))
                .spawn(move || {
                    manager_loop(
                        queue,
                        registry,
                        engine,
                        token,
                        max_subscriptions,
                        poll_interval_ms,
                    )
                })?;
            managers.push(handle);
        }
        Ok(managers)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The session registry
    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    /// The shutdown token
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.token.clone()
    }

    /// The configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// One session manager: dequeue, admit, serve to completion, repeat
///
/// Exits when the queue closes. Deliberately ignores the shutdown token
/// between sessions so the registrar can never wedge on a full queue with
/// no consumers left.
fn manager_loop(
    queue: Arc<ConnectionQueue>,
    registry: Arc<SessionRegistry>,
    engine: Arc<Engine>,
    token: ShutdownToken,
    max_subscriptions: usize,
    poll_interval_ms: u16,
) {
    while let Some(request) = queue.pop() {
        if let Err(e) = admit_session(
            request,
            &registry,
            &engine,
            &token,
            max_subscriptions,
            poll_interval_ms,
        ) {
            tracing::warn!("Failed to admit session: {}", e);
        }
    }
}

/// Open the client's channels, claim a slot, acknowledge, run the handler
///
/// The channels are opened in the same order the client opens its ends,
/// so the pairwise rendezvous cannot deadlock. When the table is full the
/// request is dropped without a reply — registration is one-way — and
/// dropping the just-opened handles closes the channels, so the client
/// observes EOF rather than a hang.
fn admit_session(
    request: ConnectRequest,
    registry: &Arc<SessionRegistry>,
    engine: &Arc<Engine>,
    token: &ShutdownToken,
    max_subscriptions: usize,
    poll_interval_ms: u16,
) -> Result<()> {
    let request_pipe = ipc::open_read(Path::new(&request.request_pipe))?;
    let response_pipe = ipc::open_write(Path::new(&request.response_pipe))?;
    let notification_pipe = ipc::open_write(Path::new(&request.notification_pipe))?;

    let session = Session::new(response_pipe, notification_pipe, max_subscriptions);
    let slot = match registry.claim(session) {
        Some(slot) => slot,
        None => {
            tracing::warn!("No free session slot; dropping connection request");
            return Ok(());
        }
    };

    let acknowledged = registry.with_session(slot, |session| {
        session.send_response(Response::new(OpCode::Connect, 0))
    });
    match acknowledged {
        Some(Ok(())) => {}
        Some(Err(e)) => {
            registry.release(slot);
            return Err(e);
        }
        None => return Ok(()),
    }
    tracing::debug!("Session {} established", slot);

    SessionHandler::new(
        slot,
        request_pipe,
        Arc::clone(registry),
        Arc::clone(engine),
        token.clone(),
        poll_interval_ms,
    )
    .run();

    Ok(())
}
