//! Notifier
//!
//! Fan-out of key-change events to subscribed sessions. Invoked
//! synchronously by the job dispatcher after every successful write or
//! delete, once per affected key. Delivery is best-effort and at most
//! once per change per subscriber; one session's broken channel never
//! stops delivery to the rest.

use std::sync::Arc;

use crate::protocol::{encode_notification, Notification, DELETED_SENTINEL};

use super::registry::SessionRegistry;

/// Pushes change notifications to every subscribed session
pub struct Notifier {
    registry: Arc<SessionRegistry>,
}

impl Notifier {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Announce a new value for `key` to every subscriber
    pub fn notify(&self, key: &str, value: &str) {
        let notification = Notification {
            key: key.to_owned(),
            value: value.to_owned(),
        };
        let frame = match encode_notification(&notification) {
            Ok(frame) => frame,
            Err(e) => {
                // Oversized values cannot be framed; subscribers miss this
                // event but the store itself already applied it.
                tracing::warn!("Cannot encode notification for key '{}': {}", key, e);
                return;
            }
        };

        self.registry.for_each_active(|slot, session| {
            if session.subscriptions.contains(key) {
                if let Err(e) = session.push_notification(&frame) {
                    tracing::warn!(
                        "Failed to deliver notification for key '{}' to session {}: {}",
                        key,
                        slot,
                        e
                    );
                }
            }
        });
    }

    /// Announce the deletion of `key` to every subscriber
    pub fn notify_deleted(&self, key: &str) {
        self.notify(key, DELETED_SENTINEL);
    }
}
