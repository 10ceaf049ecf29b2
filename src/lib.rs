//! # PipeKV
//!
//! A concurrent, multi-client key-value store served over named-pipe IPC
//! with:
//! - A pub/sub notification layer (subscribe to keys, get pushed updates)
//! - Batch execution of stored `.job` command scripts
//! - Throttled, snapshot-based backups
//! - Cooperative shutdown via a signal watcher thread
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────┐  registration FIFO   ┌──────────────────────────────┐
//! │   Clients    │─────────────────────▶│     Connection Registrar      │
//! │ (pipekv-cli) │                      └──────────────┬───────────────┘
//! └──────┬───────┘                                     │ bounded queue
//!        │ request/response/                           ▼
//!        │ notification FIFOs           ┌──────────────────────────────┐
//!        └────────────────────────────▶│     Session Manager Pool      │
//!                                       │  (one handler per session)   │
//!                                       └──────────────┬───────────────┘
//!                                                      ▼
//!                        ┌──────────┐           ┌─────────────┐
//!                        │ Notifier │◀──scan────│   Session    │
//!                        └────┬─────┘           │   Registry   │
//!                             │                 └─────────────┘
//!  ┌───────────┐   ┌──────────┴──────────┐     ┌─────────────┐
//!  │ jobs dir  │──▶│ Job Dispatcher Pool │────▶│   Engine     │
//!  │ (*.job)   │   │  + Backup Throttle  │     │ (key space)  │
//!  └───────────┘   └─────────────────────┘     └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod client;
pub mod engine;
pub mod ipc;
pub mod jobs;
pub mod protocol;
pub mod server;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use client::Client;
pub use config::Config;
pub use engine::Engine;
pub use error::{PipeKvError, Result};
pub use server::Server;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of PipeKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
