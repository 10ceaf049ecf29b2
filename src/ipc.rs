//! IPC Module
//!
//! The named-channel capability: creating, opening, polling and removing
//! the FIFOs everything else communicates through. Open calls block until
//! the peer end shows up, which is the rendezvous the session protocol
//! relies on.

use std::fs::{File, OpenOptions};
use std::os::fd::AsFd;
use std::path::Path;

use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;

use crate::error::{PipeKvError, Result};

/// Create a fresh FIFO at `path`, replacing any stale one
pub fn create_channel(path: &Path) -> Result<()> {
    remove_channel(path)?;
    mkfifo(path, Mode::from_bits_truncate(0o666)).map_err(|e| {
        PipeKvError::Channel(format!("Failed to create channel {}: {}", path.display(), e))
    })
}

/// Remove a FIFO; missing files are not an error
pub fn remove_channel(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PipeKvError::Channel(format!(
            "Failed to remove channel {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Open a channel for reading; blocks until a writer opens the other end
pub fn open_read(path: &Path) -> Result<File> {
    OpenOptions::new().read(true).open(path).map_err(|e| {
        PipeKvError::Channel(format!(
            "Failed to open channel {} for reading: {}",
            path.display(),
            e
        ))
    })
}

/// Open a channel for writing; blocks until a reader opens the other end
pub fn open_write(path: &Path) -> Result<File> {
    OpenOptions::new().write(true).open(path).map_err(|e| {
        PipeKvError::Channel(format!(
            "Failed to open channel {} for writing: {}",
            path.display(),
            e
        ))
    })
}

/// Open a channel both ways
///
/// Used for the registration channel: holding a write end ourselves means
/// the descriptor never reaches EOF as clients come and go, so the
/// registrar blocks in `poll` instead of spinning on zero-byte reads.
pub fn open_read_shared(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| {
            PipeKvError::Channel(format!(
                "Failed to open channel {}: {}",
                path.display(),
                e
            ))
        })
}

/// Wait until `file` has data to read, or the timeout elapses
///
/// Returns `true` when a read attempt should be made — data is available,
/// or the peer hung up and the read will report EOF. An interrupted poll
/// counts as a timeout; callers loop anyway.
pub fn wait_readable(file: &File, timeout_ms: u16) -> Result<bool> {
    let mut fds = [PollFd::new(file.as_fd(), PollFlags::POLLIN)];
    match poll(&mut fds, PollTimeout::from(timeout_ms)) {
        Ok(0) => Ok(false),
        Ok(_) => {
            let revents = fds[0].revents().unwrap_or(PollFlags::empty());
            Ok(revents
                .intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR))
        }
        Err(nix::errno::Errno::EINTR) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
