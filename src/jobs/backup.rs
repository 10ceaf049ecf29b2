//! Backup throttle
//!
//! Admission control for backup snapshots: at most a configured number of
//! snapshot writers may be in flight. When a worker asks for admission at
//! capacity, it reaps the oldest outstanding writer — joining its handle —
//! before its own writer is admitted. The throttle mutex is held across
//! the reap, so competing admissions serialize on the lock and the bound
//! can never be exceeded. `drain` reaps everything outstanding and runs on
//! the process shutdown path.

use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::error::{PipeKvError, Result};

/// Bounds the number of concurrently in-flight backup writers
pub struct BackupThrottle {
    max_in_flight: usize,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl BackupThrottle {
    /// Create a throttle admitting up to `max_in_flight` writers
    pub fn new(max_in_flight: usize) -> Self {
        Self {
            max_in_flight,
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Admit and launch one snapshot writer
    ///
    /// Blocks (reaping) while at capacity. A failure to spawn the writer
    /// thread is reported as [`PipeKvError::Backup`]; callers treat it as
    /// fatal resource exhaustion.
    pub fn run<F>(&self, writer: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut in_flight = self.in_flight.lock();

        while in_flight.len() >= self.max_in_flight {
            let oldest = in_flight.remove(0);
            if oldest.join().is_err() {
                tracing::warn!("Backup writer panicked");
            }
        }

        let handle = thread::Builder::new()
            .name("backup-writer".to_string())
            .spawn(writer)
            .map_err(|e| PipeKvError::Backup(format!("Failed to spawn backup writer: {}", e)))?;
        in_flight.push(handle);

        Ok(())
    }

    /// Reap every outstanding writer
    pub fn drain(&self) {
        let handles: Vec<JoinHandle<()>> = self.in_flight.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("Backup writer panicked");
            }
        }
    }

    /// Number of writers currently registered as in flight
    ///
    /// Finished-but-unreaped writers still count; only admission or
    /// `drain` reaps them.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// The configured admission bound
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }
}
