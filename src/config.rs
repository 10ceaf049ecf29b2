//! Configuration for PipeKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{PipeKvError, Result};

/// Main configuration for a PipeKV server instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Job Processing Configuration
    // -------------------------------------------------------------------------
    /// Directory scanned for `.job` command scripts; each produces a
    /// sibling `.out` file and numbered `.bck` backup snapshots
    pub jobs_dir: PathBuf,

    /// Number of dispatcher worker threads draining the jobs directory
    pub max_dispatchers: usize,

    /// Maximum number of concurrently in-flight backup snapshots
    pub max_concurrent_backups: usize,

    // -------------------------------------------------------------------------
    // Session Configuration
    // -------------------------------------------------------------------------
    /// Well-known registration channel clients connect through
    pub register_pipe_path: PathBuf,

    /// Number of session-table slots (and session manager threads)
    pub max_sessions: usize,

    /// Per-session subscription set capacity
    pub max_subscriptions: usize,

    /// Capacity of the bounded connection queue between the registrar
    /// and the session manager pool
    pub queue_capacity: usize,

    // -------------------------------------------------------------------------
    // Scheduling Configuration
    // -------------------------------------------------------------------------
    /// Poll interval for cancellable channel reads (milliseconds)
    pub poll_interval_ms: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs_dir: PathBuf::from("./jobs"),
            max_dispatchers: 4,
            max_concurrent_backups: 2,
            register_pipe_path: PathBuf::from("/tmp/pipekv_register"),
            max_sessions: 8,
            max_subscriptions: 10,
            queue_capacity: 8,
            poll_interval_ms: 200,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validate the configuration
    ///
    /// Every pool size and capacity must be nonzero; a zero anywhere would
    /// deadlock the corresponding producer/consumer pairing.
    pub fn validate(&self) -> Result<()> {
        if self.max_dispatchers == 0 {
            return Err(PipeKvError::Config("max_dispatchers must be > 0".into()));
        }
        if self.max_concurrent_backups == 0 {
            return Err(PipeKvError::Config(
                "max_concurrent_backups must be > 0".into(),
            ));
        }
        if self.max_sessions == 0 {
            return Err(PipeKvError::Config("max_sessions must be > 0".into()));
        }
        if self.max_subscriptions == 0 {
            return Err(PipeKvError::Config("max_subscriptions must be > 0".into()));
        }
        if self.queue_capacity == 0 {
            return Err(PipeKvError::Config("queue_capacity must be > 0".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(PipeKvError::Config("poll_interval_ms must be > 0".into()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the jobs directory
    pub fn jobs_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.jobs_dir = path.into();
        self
    }

    /// Set the number of dispatcher worker threads
    pub fn max_dispatchers(mut self, count: usize) -> Self {
        self.config.max_dispatchers = count;
        self
    }

    /// Set the maximum number of concurrent backup snapshots
    pub fn max_concurrent_backups(mut self, count: usize) -> Self {
        self.config.max_concurrent_backups = count;
        self
    }

    /// Set the registration channel path
    pub fn register_pipe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.register_pipe_path = path.into();
        self
    }

    /// Set the number of session-table slots (and manager threads)
    pub fn max_sessions(mut self, count: usize) -> Self {
        self.config.max_sessions = count;
        // Keep the queue matched to the session table unless set explicitly.
        self.config.queue_capacity = count;
        self
    }

    /// Set the per-session subscription capacity
    pub fn max_subscriptions(mut self, count: usize) -> Self {
        self.config.max_subscriptions = count;
        self
    }

    /// Set the connection queue capacity
    pub fn queue_capacity(mut self, count: usize) -> Self {
        self.config.queue_capacity = count;
        self
    }

    /// Set the poll interval for cancellable reads (milliseconds)
    pub fn poll_interval_ms(mut self, ms: u16) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
