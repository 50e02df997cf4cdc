//! Integration tests for EcomCloth.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p ecomcloth-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cross_tab` - several cart managers sharing one durable store
//! - `cart_api` - the storefront HTTP API served on a local port
//!
//! Each test gets its own storage file under the system temp directory, so
//! tests can run in parallel.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ecomcloth_storefront::config::StorefrontConfig;
use ecomcloth_storefront::routes;
use ecomcloth_storefront::state::AppState;
use ecomcloth_storefront::storage::{FileStore, LocalStorage};
use uuid::Uuid;

/// A storage file path that is removed on drop.
pub struct TempStorePath {
    path: PathBuf,
}

impl TempStorePath {
    /// A fresh, not yet existing, storage file path.
    #[must_use]
    pub fn new() -> Self {
        let path = std::env::temp_dir()
            .join("ecomcloth-it")
            .join(format!("{}.json", Uuid::new_v4()));
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new `LocalStorage` over this file, as a freshly started
    /// process would.
    ///
    /// # Panics
    ///
    /// Panics if the storage directory cannot be created.
    #[must_use]
    pub fn open_storage(&self) -> LocalStorage {
        let store = FileStore::open(&self.path).expect("Failed to open storage file");
        LocalStorage::new(Arc::new(store), 64)
    }
}

impl Default for TempStorePath {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TempStorePath {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// A storefront served on an ephemeral local port.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Serve the storefront router over `storage`.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start(storage: LocalStorage) -> Self {
        let state = AppState::with_storage(StorefrontConfig::default(), storage);
        let app = routes::app(state.clone());

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            task,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
