//! Inspect and clear the cart kept in a file-backed store.
//!
//! Running storefront processes are not notified; their open tabs keep
//! their in-memory cart until they next load from the store.

use std::path::Path;

use ecomcloth_core::{Cart, CartDecodeError, CartLine, Price};
use ecomcloth_storefront::storage::{DurableStore, FileStore};
use tracing::{info, warn};

/// What a store holds under the cart key.
#[derive(Debug)]
pub enum StoredCart {
    /// Nothing stored.
    Missing,
    /// A cart the storefront can load, and how many stored elements it
    /// will drop.
    Valid(Cart, usize),
    /// A value the storefront will treat as an empty cart.
    Unreadable(CartDecodeError),
}

/// Read and decode the cart stored under `key`.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub fn inspect(store: &dyn DurableStore, key: &str) -> Result<StoredCart, Box<dyn std::error::Error>> {
    let stored = match store.get(key)? {
        None => StoredCart::Missing,
        Some(raw) => match Cart::decode_lossy(&raw) {
            Ok((cart, dropped)) => StoredCart::Valid(cart, dropped),
            Err(e) => StoredCart::Unreadable(e),
        },
    };
    Ok(stored)
}

/// Print the stored cart.
///
/// # Errors
///
/// Returns an error if the store file cannot be opened or read.
pub fn show(path: &Path, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(path)?;

    match inspect(&store, key)? {
        StoredCart::Missing => info!(path = %path.display(), key, "No cart stored"),
        StoredCart::Unreadable(e) => {
            warn!(key, error = %e, "Stored cart is unreadable, tabs will load it as empty");
        }
        StoredCart::Valid(cart, dropped) => {
            if dropped > 0 {
                warn!(key, dropped, "Stored cart has unreadable lines, tabs will drop them");
            }
            for line in &cart {
                info!(
                    id = %line.product_id,
                    name = %line.name,
                    color = line.color.as_deref().unwrap_or("-"),
                    size = line.size.as_deref().unwrap_or("-"),
                    qty = line.quantity,
                    total = %line.line_total(),
                    "Cart line"
                );
            }
            let items: u64 = cart.iter().map(|line| u64::from(line.quantity)).sum();
            let subtotal: Price = cart.iter().map(CartLine::line_total).sum();
            info!(lines = cart.len(), items, subtotal = %subtotal, "Cart summary");
        }
    }

    Ok(())
}

/// Remove the stored cart. Returns whether anything was removed.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written.
pub fn clear_key(store: &dyn DurableStore, key: &str) -> Result<bool, Box<dyn std::error::Error>> {
    if store.get(key)?.is_none() {
        return Ok(false);
    }
    store.remove(key)?;
    Ok(true)
}

/// Clear the stored cart.
///
/// # Errors
///
/// Returns an error if the store file cannot be opened, read or written.
pub fn clear(path: &Path, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(path)?;

    if clear_key(&store, key)? {
        info!(path = %path.display(), key, "Cart cleared");
    } else {
        info!(path = %path.display(), key, "No cart stored, nothing to clear");
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ecomcloth_storefront::storage::MemoryStore;

    use super::*;

    const STORED: &str = r#"[{"id":1,"name":"Men's Classic T-Shirt","price":25,"category":"Men","image":"/men/pexels-mostafasanadd-878358.jpg","qty":2,"color":"Black","size":"L"}]"#;

    #[test]
    fn test_inspect_missing() {
        let store = MemoryStore::new();
        assert!(matches!(inspect(&store, "cart").unwrap(), StoredCart::Missing));
    }

    #[test]
    fn test_inspect_valid() {
        let store = MemoryStore::new();
        store.set("cart", STORED).unwrap();

        let StoredCart::Valid(cart, dropped) = inspect(&store, "cart").unwrap() else {
            panic!("expected a valid cart");
        };
        assert_eq!(dropped, 0);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines().first().unwrap().quantity, 2);
    }

    #[test]
    fn test_inspect_unreadable() {
        let store = MemoryStore::new();
        store.set("cart", "{not json").unwrap();
        assert!(matches!(
            inspect(&store, "cart").unwrap(),
            StoredCart::Unreadable(_)
        ));

        store.set("cart", r#"{"id":1}"#).unwrap();
        assert!(matches!(
            inspect(&store, "cart").unwrap(),
            StoredCart::Unreadable(_)
        ));
    }

    #[test]
    fn test_inspect_counts_dropped_lines() {
        let store = MemoryStore::new();
        let raw = format!("{},42]", STORED.trim_end_matches(']'));
        store.set("cart", &raw).unwrap();

        let StoredCart::Valid(cart, dropped) = inspect(&store, "cart").unwrap() else {
            panic!("expected a valid cart");
        };
        assert_eq!(dropped, 1);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_clear_key() {
        let store = MemoryStore::new();
        store.set("cart", STORED).unwrap();
        store.set("theme", "dark").unwrap();

        assert!(clear_key(&store, "cart").unwrap());
        assert!(!clear_key(&store, "cart").unwrap());
        assert_eq!(store.get("cart").unwrap(), None);
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
    }
}
