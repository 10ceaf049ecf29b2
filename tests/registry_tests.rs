//! Session Registry Tests
//!
//! Tests for the fixed-slot session table, the subscription set, and the
//! teardown path.

use std::fs::File;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use pipekv::server::{Session, SessionRegistry, SubscriptionSet};

// =============================================================================
// Helper Functions
// =============================================================================

/// Build a session whose channels are plain files in `dir`
fn file_backed_session(dir: &TempDir, name: &str, max_subscriptions: usize) -> Session {
    let response = File::create(dir.path().join(format!("{}-resp", name))).unwrap();
    let notification = File::create(dir.path().join(format!("{}-notif", name))).unwrap();
    Session::new(response, notification, max_subscriptions)
}

// =============================================================================
// Subscription Set Tests
// =============================================================================

#[test]
fn test_subscription_set_insert_and_remove() {
    let mut set = SubscriptionSet::new(3);

    assert!(set.insert("a"));
    assert!(set.insert("b"));
    assert!(set.contains("a"));
    assert_eq!(set.len(), 2);

    assert!(set.remove("a"));
    assert!(!set.contains("a"));
    assert!(!set.remove("a"));
}

#[test]
fn test_subscription_set_insert_is_idempotent() {
    let mut set = SubscriptionSet::new(2);

    assert!(set.insert("a"));
    assert!(set.insert("a"));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_subscription_set_capacity_bound() {
    let mut set = SubscriptionSet::new(2);

    assert!(set.insert("a"));
    assert!(set.insert("b"));
    assert!(set.is_full());

    // Refused, set unchanged.
    assert!(!set.insert("c"));
    assert_eq!(set.len(), 2);
    assert!(!set.contains("c"));

    // An already-present key is still accepted at capacity.
    assert!(set.insert("a"));
}

#[test]
fn test_subscription_set_clear() {
    let mut set = SubscriptionSet::new(4);
    set.insert("a");
    set.insert("b");

    set.clear();
    assert!(set.is_empty());
    assert!(!set.contains("a"));
}

// =============================================================================
// Slot Claim/Release Tests
// =============================================================================

#[test]
fn test_claim_fills_slots_in_order() {
    let dir = TempDir::new().unwrap();
    let registry = SessionRegistry::new(2);

    assert_eq!(registry.claim(file_backed_session(&dir, "s0", 4)), Some(0));
    assert_eq!(registry.claim(file_backed_session(&dir, "s1", 4)), Some(1));
    assert_eq!(registry.active_count(), 2);

    // Table full: the request is dropped.
    assert_eq!(registry.claim(file_backed_session(&dir, "s2", 4)), None);
}

#[test]
fn test_release_frees_slot_for_reuse() {
    let dir = TempDir::new().unwrap();
    let registry = SessionRegistry::new(1);

    assert_eq!(registry.claim(file_backed_session(&dir, "s0", 4)), Some(0));
    assert!(registry.release(0).is_some());

    // Idempotent: the slot is already vacant.
    assert!(registry.release(0).is_none());

    assert_eq!(registry.claim(file_backed_session(&dir, "s1", 4)), Some(0));
}

#[test]
fn test_with_session_on_vacant_slot() {
    let registry = SessionRegistry::new(2);
    assert!(registry.with_session(0, |_| ()).is_none());
    assert!(!registry.is_active(0));
}

#[test]
fn test_concurrent_claims_get_distinct_slots() {
    const SLOTS: usize = 8;

    let dir = TempDir::new().unwrap();
    let registry = Arc::new(SessionRegistry::new(SLOTS));

    let sessions: Vec<Session> = (0..SLOTS)
        .map(|i| file_backed_session(&dir, &format!("s{}", i), 4))
        .collect();

    let handles: Vec<_> = sessions
        .into_iter()
        .map(|session| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.claim(session))
        })
        .collect();

    let mut slots: Vec<usize> = handles
        .into_iter()
        .map(|h| h.join().unwrap().expect("every claim must find a slot"))
        .collect();
    slots.sort_unstable();
    slots.dedup();

    // At most one session per slot: all claims landed on distinct slots.
    assert_eq!(slots.len(), SLOTS);
}

// =============================================================================
// Teardown Tests
// =============================================================================

#[test]
fn test_teardown_closes_every_session() {
    let dir = TempDir::new().unwrap();
    let registry = SessionRegistry::new(3);

    registry.claim(file_backed_session(&dir, "s0", 4));
    registry.claim(file_backed_session(&dir, "s1", 4));
    assert_eq!(registry.active_count(), 2);

    assert_eq!(registry.teardown_all(), 2);
    assert_eq!(registry.active_count(), 0);

    // Idempotent.
    assert_eq!(registry.teardown_all(), 0);
}

#[test]
fn test_teardown_races_with_session_exit() {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(SessionRegistry::new(4));

    for i in 0..4 {
        registry.claim(file_backed_session(&dir, &format!("s{}", i), 4));
    }

    // Two sessions close themselves while the teardown sweeps the table;
    // each session is dropped by exactly one of the two paths.
    let exiting = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            (registry.release(1).is_some() as usize) + (registry.release(3).is_some() as usize)
        })
    };
    let torn_down = registry.teardown_all();
    let self_closed = exiting.join().unwrap();

    assert_eq!(torn_down + self_closed, 4);
    assert_eq!(registry.active_count(), 0);
}
