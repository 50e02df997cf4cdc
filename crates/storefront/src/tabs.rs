//! Registry of open tab sessions.
//!
//! Each tab session owns one [`CartManager`]. Sessions are kept in a `moka`
//! cache with a time-to-idle, so abandoned tabs expire on their own; when a
//! session leaves the cache its manager is dropped and its storage
//! subscription released.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument};

use crate::cart::CartManager;
use crate::storage::{LocalStorage, TabId};

/// A tab's cart manager, shared between the requests of that tab.
pub type SharedCart = Arc<Mutex<CartManager>>;

/// Open tab sessions, all backed by the same [`LocalStorage`].
#[derive(Clone)]
pub struct TabRegistry {
    storage: LocalStorage,
    cart_key: Arc<str>,
    sessions: Cache<TabId, SharedCart>,
}

impl TabRegistry {
    /// Create a registry holding at most `max_tabs` sessions, each expiring
    /// after `idle_timeout` without requests.
    #[must_use]
    pub fn new(
        storage: LocalStorage,
        cart_key: &str,
        max_tabs: u64,
        idle_timeout: Duration,
    ) -> Self {
        let sessions = Cache::builder()
            .max_capacity(max_tabs)
            .time_to_idle(idle_timeout)
            .eviction_listener(|tab: Arc<TabId>, _cart: SharedCart, cause| {
                debug!(tab = %tab, ?cause, "tab session ended");
            })
            .build();

        Self {
            storage,
            cart_key: Arc::from(cart_key),
            sessions,
        }
    }

    /// The storage shared by every session.
    #[must_use]
    pub const fn storage(&self) -> &LocalStorage {
        &self.storage
    }

    /// Open a new tab session with its cart already loaded.
    pub async fn open(&self) -> (TabId, SharedCart) {
        self.insert(true).await
    }

    /// Open a new tab session whose cart is not loaded yet.
    ///
    /// Cart operations are queued until [`CartManager::initialize`] runs on
    /// the session.
    pub async fn open_unloaded(&self) -> (TabId, SharedCart) {
        self.insert(false).await
    }

    #[instrument(skip(self))]
    async fn insert(&self, load: bool) -> (TabId, SharedCart) {
        let tab = TabId::new();
        let manager = if load {
            CartManager::open(tab, self.storage.clone(), &*self.cart_key)
        } else {
            CartManager::new(tab, self.storage.clone(), &*self.cart_key)
        };
        let cart = Arc::new(Mutex::new(manager));
        self.sessions.insert(tab, Arc::clone(&cart)).await;
        info!(%tab, loaded = load, "tab session opened");
        (tab, cart)
    }

    /// Lock a session's cart after delivering pending sibling-tab changes.
    ///
    /// Returns `None` for unknown or expired tabs.
    pub async fn checkout(&self, tab: TabId) -> Option<OwnedMutexGuard<CartManager>> {
        let cart = self.sessions.get(&tab).await?;
        let mut manager = cart.lock_owned().await;
        manager.sync();
        Some(manager)
    }

    /// End a session. Returns whether it existed.
    #[instrument(skip(self))]
    pub async fn close(&self, tab: TabId) -> bool {
        let closed = self.sessions.remove(&tab).await.is_some();
        if closed {
            info!(%tab, "tab session closed");
        }
        closed
    }

    /// Run pending expirations and evictions.
    pub async fn run_maintenance(&self) {
        self.sessions.run_pending_tasks().await;
    }
}
