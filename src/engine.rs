//! Engine Module
//!
//! The in-memory keyed store the rest of the system calls into.
//!
//! ## Responsibilities
//! - Batch write/read/delete over a shared hash table
//! - Sorted listings for SHOW output and backup snapshots
//! - Point-in-time snapshots for the backup writers
//!
//! ## Concurrency Model
//!
//! One `RwLock` over the table: batch writes and deletes take the write
//! lock for the whole batch (a batch is atomic with respect to readers),
//! reads, existence checks and snapshots take the read lock. All methods
//! are `&self`, so the engine is shared behind an `Arc` by every worker
//! and session thread.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Per-key outcome of a batch read
pub type ReadResult = Vec<(String, Option<String>)>;

/// Per-key outcome of a batch delete (`true` = the key existed)
pub type DeleteResult = Vec<(String, bool)>;

/// The in-memory storage engine
pub struct Engine {
    /// The key space; protected by one RwLock
    table: RwLock<HashMap<String, String>>,
}

impl Engine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self {
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Write a batch of key/value pairs
    ///
    /// Existing keys are overwritten. The whole batch is applied under one
    /// write lock, so readers observe either none or all of it.
    pub fn write(&self, pairs: &[(String, String)]) {
        let mut table = self.table.write();
        for (key, value) in pairs {
            table.insert(key.clone(), value.clone());
        }
    }

    /// Read a batch of keys
    ///
    /// Returns one entry per requested key, in request order, with `None`
    /// for keys that are absent.
    pub fn read(&self, keys: &[String]) -> ReadResult {
        let table = self.table.read();
        keys.iter()
            .map(|key| (key.clone(), table.get(key).cloned()))
            .collect()
    }

    /// Delete a batch of keys
    ///
    /// Returns one entry per requested key, in request order, flagging
    /// whether the key was present.
    pub fn delete(&self, keys: &[String]) -> DeleteResult {
        let mut table = self.table.write();
        keys.iter()
            .map(|key| (key.clone(), table.remove(key).is_some()))
            .collect()
    }

    /// List every pair, sorted by key
    pub fn show(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .table
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    /// Check whether a key is present
    pub fn key_exists(&self, key: &str) -> bool {
        self.table.read().contains_key(key)
    }

    /// Take a point-in-time copy of the key space, sorted by key
    ///
    /// Used by the backup path: the copy is taken synchronously at
    /// admission time and written out by a detached writer.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.show()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of stored pairs
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// True when no pairs are stored
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
