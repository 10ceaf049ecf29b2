//! Session registry
//!
//! The process-wide session table: a fixed array of slots, each holding at
//! most one live session behind its own mutex. Per-slot locking lets the
//! notifier scan one session while a handler mutates another, and makes the
//! teardown path and a session's own exit path race-free: both take the
//! slot's contents under the lock, and only one of them gets it.

use std::fs::File;
use std::io::Write;

use parking_lot::Mutex;

use crate::error::Result;
use crate::protocol::{encode_response, Response};

// =============================================================================
// Subscription Set
// =============================================================================

/// A session's subscribed keys: insertion-ordered, capacity-bounded
#[derive(Debug)]
pub struct SubscriptionSet {
    keys: Vec<String>,
    capacity: usize,
}

impl SubscriptionSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert a key; idempotent for keys already present
    ///
    /// Returns `true` when the key is in the set after the call, `false`
    /// when the set was full and the key was refused.
    pub fn insert(&mut self, key: &str) -> bool {
        if self.contains(key) {
            return true;
        }
        if self.keys.len() >= self.capacity {
            return false;
        }
        self.keys.push(key.to_owned());
        true
    }

    /// Remove a key by exact match; returns whether it was present
    pub fn remove(&mut self, key: &str) -> bool {
        match self.keys.iter().position(|k| k == key) {
            Some(index) => {
                self.keys.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.keys.len() >= self.capacity
    }
}

// =============================================================================
// Session
// =============================================================================

/// Server-side state for one connected client
///
/// Holds the two write-side channels. The request channel's read side is
/// owned exclusively by the handler thread and never enters the table.
pub struct Session {
    /// Server → client response channel
    response_pipe: File,

    /// Server → client notification channel
    notification_pipe: File,

    /// Keys this session wants change notifications for
    pub subscriptions: SubscriptionSet,

    /// Cleared on disconnect; checked before any delivery
    active: bool,
}

impl Session {
    pub fn new(response_pipe: File, notification_pipe: File, max_subscriptions: usize) -> Self {
        Self {
            response_pipe,
            notification_pipe,
            subscriptions: SubscriptionSet::new(max_subscriptions),
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Send one response frame on the response channel
    pub fn send_response(&mut self, response: Response) -> Result<()> {
        let frame = encode_response(&response);
        self.response_pipe.write_all(&frame)?;
        self.response_pipe.flush()?;
        Ok(())
    }

    /// Push one pre-encoded notification frame on the notification channel
    pub fn push_notification(&mut self, frame: &[u8]) -> Result<()> {
        self.notification_pipe.write_all(frame)?;
        self.notification_pipe.flush()?;
        Ok(())
    }
}

// =============================================================================
// Session Registry
// =============================================================================

/// Fixed-slot table of live sessions
pub struct SessionRegistry {
    slots: Box<[Mutex<Option<Session>>]>,
}

impl SessionRegistry {
    /// Create a registry with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Claim the first free slot for `session`
    ///
    /// Linear scan; returns the slot index, or `None` (and drops the
    /// session, closing its channels) when the table is full.
    pub fn claim(&self, session: Session) -> Option<usize> {
        for (index, slot) in self.slots.iter().enumerate() {
            let mut slot = slot.lock();
            if slot.is_none() {
                *slot = Some(session);
                return Some(index);
            }
        }
        None
    }

    /// Take the session out of a slot, freeing it
    ///
    /// Idempotent: returns `None` when the slot was already vacated (for
    /// example by a concurrent teardown).
    pub fn release(&self, index: usize) -> Option<Session> {
        self.slots[index].lock().take()
    }

    /// Run `f` against the session in `index`, under the slot lock
    ///
    /// Returns `None` when the slot is vacant.
    pub fn with_session<R>(&self, index: usize, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.slots[index].lock().as_mut().map(f)
    }

    /// Whether the slot currently holds an active session
    pub fn is_active(&self, index: usize) -> bool {
        self.slots[index]
            .lock()
            .as_ref()
            .map(Session::is_active)
            .unwrap_or(false)
    }

    /// Visit every active session, one slot lock at a time
    pub fn for_each_active(&self, mut f: impl FnMut(usize, &mut Session)) {
        for (index, slot) in self.slots.iter().enumerate() {
            let mut slot = slot.lock();
            if let Some(session) = slot.as_mut() {
                if session.is_active() {
                    f(index, session);
                }
            }
        }
    }

    /// Force-close every session
    ///
    /// Each occupied slot is vacated under its lock and the session
    /// dropped, closing its response and notification channels without any
    /// parting message. Safe to run concurrently with sessions closing
    /// themselves, and idempotent. Returns how many sessions were closed.
    pub fn teardown_all(&self) -> usize {
        let mut closed = 0;
        for slot in self.slots.iter() {
            let session = slot.lock().take();
            if let Some(mut session) = session {
                session.deactivate();
                session.subscriptions.clear();
                closed += 1;
            }
        }
        closed
    }

    /// Number of occupied, active slots
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| {
                slot.lock()
                    .as_ref()
                    .map(Session::is_active)
                    .unwrap_or(false)
            })
            .count()
    }

    /// Total slot count
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
