//! Per-tab cart state manager.
//!
//! A [`CartManager`] owns the in-memory cart of one tab session. It:
//!
//! - loads the cart from [`LocalStorage`] once, in [`CartManager::initialize`]
//! - applies add/remove as pure [`Cart`] transitions, then persists the
//!   result as a separate step
//! - replaces its cart when a sibling tab changes the stored value, without
//!   writing that value back
//!
//! # Load before write
//!
//! Until `initialize` has run the manager never writes. Operations requested
//! in that window are queued; `initialize` replays them on top of the stored
//! cart and persists once. A freshly opened tab therefore cannot clobber the
//! stored cart with its empty starting state.
//!
//! # Failure handling
//!
//! Nothing here returns an error. An unreadable stored value becomes an
//! empty cart, a storage read failure is treated as "nothing stored", and a
//! failed write is logged while the in-memory cart stays authoritative for
//! this tab.

use ecomcloth_core::{Cart, CartItem, CartOp, LineKey};
use tracing::{debug, error, info, instrument, warn};

use crate::storage::{LocalStorage, Notification, Origin, StorageEvent, StorageSubscription, TabId};

/// Storage key the cart is kept under unless configured otherwise.
pub const DEFAULT_CART_KEY: &str = "cart";

/// Cart state for one tab session.
pub struct CartManager {
    tab: TabId,
    storage: LocalStorage,
    key: String,
    cart: Cart,
    loaded: bool,
    queued: Vec<CartOp>,
    subscription: StorageSubscription,
}

impl CartManager {
    /// Create an unloaded manager and subscribe it to sibling-tab changes.
    ///
    /// The cart reads as empty but must be treated as unknown until
    /// [`initialize`](Self::initialize) runs.
    #[must_use]
    pub fn new(tab: TabId, storage: LocalStorage, key: impl Into<String>) -> Self {
        let subscription = storage.subscribe(tab);
        Self {
            tab,
            storage,
            key: key.into(),
            cart: Cart::new(),
            loaded: false,
            queued: Vec::new(),
            subscription,
        }
    }

    /// Create a manager and load its cart immediately.
    #[must_use]
    pub fn open(tab: TabId, storage: LocalStorage, key: impl Into<String>) -> Self {
        let mut manager = Self::new(tab, storage, key);
        manager.initialize();
        manager
    }

    #[must_use]
    pub const fn tab(&self) -> TabId {
        self.tab
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The current cart (read-only).
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Whether the initial load from storage has completed.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Load the stored cart.
    ///
    /// Missing, malformed or non-array values all load as an empty cart.
    /// Queued operations are then replayed and persisted. Calling this again
    /// after a successful load does nothing.
    #[instrument(skip(self), fields(tab = %self.tab, key = %self.key))]
    pub fn initialize(&mut self) {
        if self.loaded {
            debug!("cart already loaded");
            return;
        }

        // The load below observes every change announced so far.
        while self.subscription.try_next().is_some() {}

        self.cart = self.read_stored();
        self.loaded = true;

        let queued = std::mem::take(&mut self.queued);
        if !queued.is_empty() {
            self.cart = queued.iter().fold(self.cart.clone(), |cart, op| cart.apply(op));
            self.persist();
        }

        info!(
            lines = self.cart.len(),
            replayed = queued.len(),
            "cart loaded"
        );
    }

    /// Add `quantity` units of `item`, merging with a line of the same key.
    ///
    /// A zero quantity is ignored.
    pub fn add_to_cart(&mut self, item: CartItem, quantity: u32) {
        self.dispatch(CartOp::Add { item, quantity });
    }

    /// Remove the line identified by `key`, whatever its quantity.
    ///
    /// Removing a line that is not in the cart does nothing.
    pub fn remove_from_cart(&mut self, key: &LineKey) {
        self.dispatch(CartOp::Remove(key.clone()));
    }

    /// Apply every change notification received since the last call.
    ///
    /// Returns how many of them replaced the cart. If notifications were
    /// dropped because this tab fell behind, the cart is re-read from
    /// storage instead.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        while let Some(notification) = self.subscription.try_next() {
            match notification {
                Notification::Changed(event) => {
                    if self.apply_storage_event(&event) {
                        applied += 1;
                    }
                }
                Notification::Lagged(missed) => {
                    if self.loaded {
                        warn!(tab = %self.tab, missed, "missed cart notifications, reloading");
                        self.cart = self.read_stored();
                        applied += 1;
                    }
                }
            }
        }
        applied
    }

    /// Reconcile with a change made outside this tab.
    ///
    /// Replaces the cart with the event's value (empty when the key was
    /// removed or the value is unreadable). The replacement is never
    /// persisted: the writer already stored it. Events for other keys, events
    /// from this tab, and events arriving before the load are ignored.
    /// Returns whether the cart was replaced.
    pub fn apply_storage_event(&mut self, event: &StorageEvent) -> bool {
        if !self.loaded || event.key != self.key || event.origin == Origin::Tab(self.tab) {
            return false;
        }

        self.cart = event
            .new_value
            .as_deref()
            .map_or_else(Cart::new, decode_or_empty);
        debug!(
            tab = %self.tab,
            origin = %event.origin,
            lines = self.cart.len(),
            "cart replaced by external change"
        );
        true
    }

    fn dispatch(&mut self, op: CartOp) {
        if matches!(op, CartOp::Add { quantity: 0, .. }) {
            debug!(tab = %self.tab, "ignoring zero-quantity add");
            return;
        }

        if !self.loaded {
            debug!(tab = %self.tab, ?op, "cart not loaded yet, queueing");
            self.queued.push(op);
            return;
        }

        let next = self.cart.apply(&op);
        if next == self.cart {
            return;
        }
        self.cart = next;
        self.persist();
    }

    /// Write the whole cart under the key. Never runs before the load.
    fn persist(&self) {
        if !self.loaded {
            return;
        }

        let raw = match self.cart.encode() {
            Ok(raw) => raw,
            Err(e) => {
                error!(tab = %self.tab, error = %e, "failed to encode cart");
                return;
            }
        };

        if let Err(e) = self
            .storage
            .set_item(Origin::Tab(self.tab), &self.key, &raw)
        {
            error!(tab = %self.tab, error = %e, "failed to persist cart");
        }
    }

    fn read_stored(&self) -> Cart {
        match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => decode_or_empty(&raw),
            Ok(None) => Cart::new(),
            Err(e) => {
                error!(tab = %self.tab, error = %e, "failed to read stored cart, starting empty");
                Cart::new()
            }
        }
    }
}

fn decode_or_empty(raw: &str) -> Cart {
    match Cart::decode_lossy(raw) {
        Ok((cart, 0)) => cart,
        Ok((cart, dropped)) => {
            warn!(dropped, kept = cart.len(), "dropping unreadable stored cart lines");
            cart
        }
        Err(e) => {
            warn!(error = %e, "discarding unreadable stored cart");
            Cart::new()
        }
    }
}
