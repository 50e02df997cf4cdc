//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_STORAGE_PATH` - JSON file for durable cart storage
//!   (default: unset, carts are kept in memory)
//! - `STOREFRONT_CART_KEY` - Storage key of the cart (default: cart)
//! - `STOREFRONT_TAB_IDLE_SECS` - Idle seconds before a tab session expires
//!   (default: 1800)
//! - `STOREFRONT_MAX_TABS` - Maximum open tab sessions (default: 10000)
//! - `STOREFRONT_EVENT_CAPACITY` - Undelivered change notifications buffered
//!   per tab before it has to reload from storage (default: 64)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::cart::DEFAULT_CART_KEY;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Durable storage file; `None` keeps carts in memory
    pub storage_path: Option<PathBuf>,
    /// Storage key the cart is kept under
    pub cart_key: String,
    /// How long a tab session may sit idle before it expires
    pub tab_idle_timeout: Duration,
    /// Maximum number of open tab sessions
    pub max_tabs: u64,
    /// Per-tab notification buffer size
    pub event_capacity: usize,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            storage_path: None,
            cart_key: DEFAULT_CART_KEY.to_string(),
            tab_idle_timeout: Duration::from_secs(1800),
            max_tabs: 10_000,
            event_capacity: 64,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = parse_or(&lookup, "STOREFRONT_HOST", defaults.host)?;
        let port = parse_or(&lookup, "STOREFRONT_PORT", defaults.port)?;
        let storage_path = non_empty(&lookup, "STOREFRONT_STORAGE_PATH").map(PathBuf::from);
        let cart_key = non_empty(&lookup, "STOREFRONT_CART_KEY").unwrap_or(defaults.cart_key);
        let idle_secs = parse_or(
            &lookup,
            "STOREFRONT_TAB_IDLE_SECS",
            defaults.tab_idle_timeout.as_secs(),
        )?;
        let max_tabs = parse_or(&lookup, "STOREFRONT_MAX_TABS", defaults.max_tabs)?;
        let event_capacity = parse_or(
            &lookup,
            "STOREFRONT_EVENT_CAPACITY",
            defaults.event_capacity,
        )?;

        require_positive("STOREFRONT_TAB_IDLE_SECS", idle_secs)?;
        require_positive("STOREFRONT_MAX_TABS", max_tabs)?;
        require_positive(
            "STOREFRONT_EVENT_CAPACITY",
            u64::try_from(event_capacity).unwrap_or(u64::MAX),
        )?;

        Ok(Self {
            host,
            port,
            storage_path,
            cart_key,
            tab_idle_timeout: Duration::from_secs(idle_secs),
            max_tabs,
            event_capacity,
            sentry_dsn: non_empty(&lookup, "SENTRY_DSN"),
            sentry_environment: non_empty(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a variable, treating an empty value as unset.
fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Parse a variable, falling back to `default` when unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    non_empty(lookup, key).map_or(Ok(default), |value| {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

fn require_positive(key: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = StorefrontConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.cart_key, "cart");
        assert!(config.storage_path.is_none());
        assert_eq!(config.tab_idle_timeout, Duration::from_secs(1800));
        assert_eq!(config.event_capacity, 64);
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("STOREFRONT_HOST", "0.0.0.0"),
            ("STOREFRONT_PORT", "8080"),
            ("STOREFRONT_STORAGE_PATH", "/var/lib/ecomcloth/storage.json"),
            ("STOREFRONT_CART_KEY", "ecomcloth-cart"),
            ("STOREFRONT_TAB_IDLE_SECS", "60"),
            ("STOREFRONT_MAX_TABS", "5"),
            ("STOREFRONT_EVENT_CAPACITY", "8"),
            ("SENTRY_ENVIRONMENT", "staging"),
        ]))
        .unwrap();

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(
            config.storage_path,
            Some(PathBuf::from("/var/lib/ecomcloth/storage.json"))
        );
        assert_eq!(config.cart_key, "ecomcloth-cart");
        assert_eq!(config.tab_idle_timeout, Duration::from_secs(60));
        assert_eq!(config.max_tabs, 5);
        assert_eq!(config.event_capacity, 8);
        assert_eq!(config.sentry_environment.as_deref(), Some("staging"));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("STOREFRONT_STORAGE_PATH", ""),
            ("STOREFRONT_CART_KEY", "  "),
            ("SENTRY_DSN", ""),
        ]))
        .unwrap();
        assert!(config.storage_path.is_none());
        assert_eq!(config.cart_key, "cart");
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_invalid_port() {
        let err = StorefrontConfig::from_lookup(lookup(&[("STOREFRONT_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "STOREFRONT_PORT"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(
            StorefrontConfig::from_lookup(lookup(&[("STOREFRONT_EVENT_CAPACITY", "0")])).is_err()
        );
        assert!(StorefrontConfig::from_lookup(lookup(&[("STOREFRONT_MAX_TABS", "0")])).is_err());
    }
}
