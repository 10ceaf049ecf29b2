//! PipeKV Server Binary
//!
//! Starts the named-pipe server and job dispatcher for PipeKV.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pipekv::{Config, Engine, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// PipeKV Server
#[derive(Parser, Debug)]
#[command(name = "pipekv-server")]
#[command(about = "Concurrent key-value store over named-pipe IPC")]
#[command(version)]
struct Args {
    /// Directory containing .job command scripts
    jobs_dir: PathBuf,

    /// Number of job dispatcher threads
    max_dispatchers: usize,

    /// Maximum concurrent backup snapshots
    max_backups: usize,

    /// Path of the registration pipe clients connect through
    register_pipe_path: PathBuf,

    /// Session-table slots (and session manager threads)
    #[arg(long, default_value_t = 8)]
    max_sessions: usize,

    /// Per-session subscription capacity
    #[arg(long, default_value_t = 10)]
    max_subscriptions: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pipekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    // try_parse so argument failures exit 1, not clap's default 2
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("PipeKV Server v{}", pipekv::VERSION);
    tracing::info!("Jobs directory: {}", args.jobs_dir.display());
    tracing::info!("Registration pipe: {}", args.register_pipe_path.display());

    // Build config from args
    let config = Config::builder()
        .jobs_dir(args.jobs_dir)
        .max_dispatchers(args.max_dispatchers)
        .max_concurrent_backups(args.max_backups)
        .register_pipe_path(args.register_pipe_path)
        .max_sessions(args.max_sessions)
        .max_subscriptions(args.max_subscriptions)
        .build();

    let engine = Arc::new(Engine::new());

    let mut server = match Server::new(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to set up server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
