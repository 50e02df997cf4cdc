//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::storage::{DurableStore, FileStore, LocalStorage, MemoryStore, StorageError};
use crate::tabs::TabRegistry;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// shared storage and the open tab sessions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    tabs: TabRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Uses a [`FileStore`] when `storage_path` is configured, otherwise a
    /// [`MemoryStore`].
    ///
    /// # Errors
    ///
    /// Returns an error if the storage file's directory cannot be created.
    pub fn new(config: StorefrontConfig) -> Result<Self, StorageError> {
        let backend: Arc<dyn DurableStore> = match &config.storage_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "using file storage");
                Arc::new(FileStore::open(path)?)
            }
            None => {
                tracing::warn!("STOREFRONT_STORAGE_PATH not set, carts will not survive restarts");
                Arc::new(MemoryStore::new())
            }
        };
        let storage = LocalStorage::new(backend, config.event_capacity);
        Ok(Self::with_storage(config, storage))
    }

    /// Create application state over an existing storage.
    #[must_use]
    pub fn with_storage(config: StorefrontConfig, storage: LocalStorage) -> Self {
        let tabs = TabRegistry::new(
            storage,
            &config.cart_key,
            config.max_tabs,
            config.tab_idle_timeout,
        );
        Self {
            inner: Arc::new(AppStateInner { config, tabs }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the tab session registry.
    #[must_use]
    pub fn tabs(&self) -> &TabRegistry {
        &self.inner.tabs
    }

    /// Get a reference to the shared storage.
    #[must_use]
    pub fn storage(&self) -> &LocalStorage {
        self.inner.tabs.storage()
    }
}
