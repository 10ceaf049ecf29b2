//! Error types for PipeKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using PipeKvError
pub type Result<T> = std::result::Result<T, PipeKvError>;

/// Unified error type for PipeKV operations
#[derive(Debug, Error)]
pub enum PipeKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("System error: {0}")]
    Sys(#[from] nix::Error),

    // -------------------------------------------------------------------------
    // Channel (named pipe) Errors
    // -------------------------------------------------------------------------
    #[error("Channel error: {0}")]
    Channel(String),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{what} too long: {got} bytes (max {max})")]
    FieldTooLong {
        what: &'static str,
        max: usize,
        got: usize,
    },

    // -------------------------------------------------------------------------
    // Backup Errors
    // -------------------------------------------------------------------------
    #[error("Backup error: {0}")]
    Backup(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
