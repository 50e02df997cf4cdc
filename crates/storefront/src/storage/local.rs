//! Shared storage with cross-tab change notifications.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::TryRecvError};
use uuid::Uuid;

use super::{DurableStore, StorageError};

/// Identifier of one tab session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(Uuid);

impl TabId {
    /// A fresh random tab ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Who performed a storage write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A tab session.
    Tab(TabId),
    /// Something outside any tab, such as an operator clearing storage.
    External,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tab(tab) => write!(f, "tab:{tab}"),
            Self::External => f.write_str("external"),
        }
    }
}

/// A change to one key, as seen by sibling tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
    pub origin: Origin,
    pub timestamp: DateTime<Utc>,
}

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Another tab (or an external actor) changed a key.
    Changed(StorageEvent),
    /// The subscriber fell behind and this many notifications were dropped.
    Lagged(u64),
}

/// Durable storage shared by all tab sessions, with change notifications.
///
/// Cheaply cloneable; clones share the backend and the notification bus.
/// A write and the broadcast of its notification happen under one lock, so
/// subscribers see notifications in write order. Writes that leave the
/// stored value unchanged are not announced, and a tab never hears about
/// its own writes.
#[derive(Clone)]
pub struct LocalStorage {
    inner: Arc<LocalStorageInner>,
}

struct LocalStorageInner {
    backend: Arc<dyn DurableStore>,
    events: broadcast::Sender<StorageEvent>,
    write_lock: Mutex<()>,
}

impl LocalStorage {
    /// Wrap `backend`. Each subscriber buffers up to `event_capacity`
    /// undelivered notifications before it starts lagging.
    #[must_use]
    pub fn new(backend: Arc<dyn DurableStore>, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self {
            inner: Arc::new(LocalStorageInner {
                backend,
                events,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// Value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    pub fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.backend.get(key)
    }

    /// Replace the value under `key` and notify other tabs if it changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read or written.
    pub fn set_item(&self, origin: Origin, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock();
        let old_value = self.inner.backend.get(key)?;
        if old_value.as_deref() == Some(value) {
            return Ok(());
        }
        self.inner.backend.set(key, value)?;
        self.notify(origin, key, old_value, Some(value.to_string()));
        Ok(())
    }

    /// Delete `key` and notify other tabs if it existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read or written.
    pub fn remove_item(&self, origin: Origin, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock();
        let Some(old_value) = self.inner.backend.get(key)? else {
            return Ok(());
        };
        self.inner.backend.remove(key)?;
        self.notify(origin, key, Some(old_value), None);
        Ok(())
    }

    /// Delete every key, notifying once per removed key.
    ///
    /// Returns the number of keys removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read or written.
    pub fn clear(&self, origin: Origin) -> Result<usize, StorageError> {
        let _guard = self.lock();
        let keys = self.inner.backend.keys()?;
        let mut removed = 0;
        for key in keys {
            if let Some(old_value) = self.inner.backend.get(&key)? {
                self.inner.backend.remove(&key)?;
                self.notify(origin, &key, Some(old_value), None);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Register `tab` for notifications about other tabs' writes.
    ///
    /// The registration lasts until the returned subscription is dropped.
    #[must_use]
    pub fn subscribe(&self, tab: TabId) -> StorageSubscription {
        tracing::debug!(%tab, "storage subscription registered");
        StorageSubscription {
            tab,
            receiver: self.inner.events.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.events.receiver_count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.inner
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(
        &self,
        origin: Origin,
        key: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        let event = StorageEvent {
            key: key.to_string(),
            old_value,
            new_value,
            origin,
            timestamp: Utc::now(),
        };
        // No receivers is not an error: there may be no open tabs.
        let delivered = self.inner.events.send(event).unwrap_or(0);
        tracing::trace!(%origin, key, delivered, "storage change broadcast");
    }
}

/// A tab's registration on the storage notification bus.
///
/// Dropping it unsubscribes.
pub struct StorageSubscription {
    tab: TabId,
    receiver: broadcast::Receiver<StorageEvent>,
}

impl StorageSubscription {
    /// The subscribing tab.
    #[must_use]
    pub const fn tab(&self) -> TabId {
        self.tab
    }

    /// Next pending notification, without waiting.
    ///
    /// Skips notifications caused by this tab's own writes.
    pub fn try_next(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.origin == Origin::Tab(self.tab) => {}
                Ok(event) => return Some(Notification::Changed(event)),
                Err(TryRecvError::Lagged(missed)) => return Some(Notification::Lagged(missed)),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for StorageSubscription {
    fn drop(&mut self) {
        tracing::debug!(tab = %self.tab, "storage subscription released");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn storage(capacity: usize) -> LocalStorage {
        LocalStorage::new(Arc::new(MemoryStore::new()), capacity)
    }

    fn changed(notification: Option<Notification>) -> StorageEvent {
        match notification {
            Some(Notification::Changed(event)) => event,
            other => panic!("expected a change notification, got {other:?}"),
        }
    }

    #[test]
    fn test_writer_is_not_notified_of_its_own_write() {
        let storage = storage(8);
        let (a, b) = (TabId::new(), TabId::new());
        let mut sub_a = storage.subscribe(a);
        let mut sub_b = storage.subscribe(b);

        storage.set_item(Origin::Tab(a), "cart", "[]").unwrap();

        assert!(sub_a.try_next().is_none());
        let event = changed(sub_b.try_next());
        assert_eq!(event.key, "cart");
        assert_eq!(event.old_value, None);
        assert_eq!(event.new_value.as_deref(), Some("[]"));
        assert_eq!(event.origin, Origin::Tab(a));
    }

    #[test]
    fn test_unchanged_write_is_not_announced() {
        let storage = storage(8);
        let a = TabId::new();
        let mut sub_b = storage.subscribe(TabId::new());

        storage.set_item(Origin::Tab(a), "cart", "[]").unwrap();
        storage.set_item(Origin::Tab(a), "cart", "[]").unwrap();

        assert!(sub_b.try_next().is_some());
        assert!(sub_b.try_next().is_none());
    }

    #[test]
    fn test_remove_announces_absence() {
        let storage = storage(8);
        let mut sub = storage.subscribe(TabId::new());

        storage.remove_item(Origin::External, "cart").unwrap();
        assert!(sub.try_next().is_none());

        storage.set_item(Origin::External, "cart", "[]").unwrap();
        storage.remove_item(Origin::External, "cart").unwrap();

        changed(sub.try_next());
        let event = changed(sub.try_next());
        assert_eq!(event.old_value.as_deref(), Some("[]"));
        assert_eq!(event.new_value, None);
        assert_eq!(storage.get_item("cart").unwrap(), None);
    }

    #[test]
    fn test_clear_removes_every_key() {
        let storage = storage(8);
        storage.set_item(Origin::External, "cart", "[]").unwrap();
        storage.set_item(Origin::External, "wishlist", "[]").unwrap();
        let mut sub = storage.subscribe(TabId::new());

        assert_eq!(storage.clear(Origin::External).unwrap(), 2);
        assert_eq!(changed(sub.try_next()).key, "cart");
        assert_eq!(changed(sub.try_next()).key, "wishlist");
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn test_slow_subscriber_lags() {
        let storage = storage(2);
        let mut sub = storage.subscribe(TabId::new());
        for n in 0..5 {
            storage
                .set_item(Origin::External, "cart", &format!("[{n}]"))
                .unwrap();
        }

        assert_eq!(sub.try_next(), Some(Notification::Lagged(3)));
        assert_eq!(changed(sub.try_next()).new_value.as_deref(), Some("[3]"));
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let storage = storage(8);
        let sub = storage.subscribe(TabId::new());
        assert_eq!(storage.subscriber_count(), 1);
        drop(sub);
        assert_eq!(storage.subscriber_count(), 0);
    }
}
