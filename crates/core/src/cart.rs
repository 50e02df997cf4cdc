//! Cart lines and pure cart transitions.
//!
//! A [`Cart`] is an ordered sequence of [`CartLine`]s. Two lines are the same
//! line exactly when their [`LineKey`]s are equal: the product ID plus the
//! optional colour and size (an absent colour only matches an absent colour).
//!
//! Every mutation is a pure function from one cart to the next. Nothing in
//! this module touches storage; callers persist the returned cart themselves.
//!
//! # Wire format
//!
//! A cart is stored as a JSON array of objects:
//!
//! ```json
//! [{"id":1,"name":"Men's Classic T-Shirt","price":25.0,"category":"Men",
//!   "image":"/men/pexels-mostafasanadd-878358.jpg","qty":2,"color":"White","size":"M"}]
//! ```
//!
//! `color` and `size` are omitted when absent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Price, ProductId};

/// Catalog attributes captured when an item is added to the cart.
///
/// These are denormalized copies; they are never re-fetched or checked
/// against the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Price,
    pub category: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl CartItem {
    /// Identity key of the line this item would merge into.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.color.clone(), self.size.clone())
    }
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: Price,
    pub category: String,
    pub image: String,
    #[serde(rename = "qty")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl CartLine {
    /// Build a line from an item and a quantity.
    #[must_use]
    pub fn new(item: CartItem, quantity: u32) -> Self {
        Self {
            product_id: item.product_id,
            name: item.name,
            unit_price: item.unit_price,
            category: item.category,
            image: item.image,
            quantity,
            color: item.color,
            size: item.size,
        }
    }

    /// Identity key of this line.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id, self.color.clone(), self.size.clone())
    }

    /// Whether this line has the given identity key.
    #[must_use]
    pub fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.color == key.color && self.size == key.size
    }

    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity)
    }
}

/// Identity of a cart line: `(product_id, color, size)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl LineKey {
    /// Create a new identity key.
    #[must_use]
    pub const fn new(product_id: ProductId, color: Option<String>, size: Option<String>) -> Self {
        Self {
            product_id,
            color,
            size,
        }
    }
}

/// A cart mutation requested by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOp {
    /// Add `quantity` units of `item`, merging into an existing line.
    Add { item: CartItem, quantity: u32 },
    /// Remove the whole line with this key.
    Remove(LineKey),
}

/// Why a stored value could not be read as a cart.
#[derive(Debug, Error)]
pub enum CartDecodeError {
    /// The value is not valid JSON.
    #[error("malformed cart JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The value is valid JSON but not an array.
    #[error("stored cart is a JSON {0}, expected an array")]
    NotASequence(&'static str),
}

/// An ordered sequence of cart lines with unique identity keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Wrap already-ordered lines.
    ///
    /// Lines are taken as-is; this is how a stored cart is restored.
    #[must_use]
    pub const fn from_lines(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// The lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CartLine> {
        self.lines.iter()
    }

    /// Find the line with the given identity key.
    #[must_use]
    pub fn find(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.matches(key))
    }

    /// The cart after adding `quantity` units of `item`.
    ///
    /// An existing line with the same key keeps its position and its stored
    /// attributes; only its quantity grows. Otherwise a new line is appended.
    /// A zero quantity leaves the cart unchanged.
    #[must_use]
    pub fn with_added(&self, item: CartItem, quantity: u32) -> Self {
        if quantity == 0 {
            return self.clone();
        }

        let key = item.key();
        let mut lines = self.lines.clone();
        match lines.iter_mut().find(|line| line.matches(&key)) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => lines.push(CartLine::new(item, quantity)),
        }
        Self { lines }
    }

    /// The cart without the line identified by `key`.
    ///
    /// The line is removed whatever its quantity. Removing a key that is not
    /// present returns an identical cart.
    #[must_use]
    pub fn without(&self, key: &LineKey) -> Self {
        Self {
            lines: self
                .lines
                .iter()
                .filter(|line| !line.matches(key))
                .cloned()
                .collect(),
        }
    }

    /// Apply a mutation.
    #[must_use]
    pub fn apply(&self, op: &CartOp) -> Self {
        match op {
            CartOp::Add { item, quantity } => self.with_added(item.clone(), *quantity),
            CartOp::Remove(key) => self.without(key),
        }
    }

    /// Read a cart from its stored JSON form.
    ///
    /// Array elements that do not decode as a [`CartLine`] are dropped; the
    /// remaining lines keep their stored order.
    ///
    /// # Errors
    ///
    /// Returns `CartDecodeError` if `raw` is not JSON or is not an array.
    pub fn decode(raw: &str) -> Result<Self, CartDecodeError> {
        Self::decode_lossy(raw).map(|(cart, _)| cart)
    }

    /// Like [`decode`](Self::decode), also returning how many elements were
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns `CartDecodeError` if `raw` is not JSON or is not an array.
    pub fn decode_lossy(raw: &str) -> Result<(Self, usize), CartDecodeError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(CartDecodeError::Malformed)?;
        let elements = match value {
            serde_json::Value::Array(elements) => elements,
            other => return Err(CartDecodeError::NotASequence(json_kind(&other))),
        };

        let total = elements.len();
        let lines: Vec<CartLine> = elements
            .into_iter()
            .filter_map(|element| serde_json::from_value(element).ok())
            .collect();
        let dropped = total - lines.len();
        Ok((Self { lines }, dropped))
    }

    /// Stored JSON form of the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn item(id: i32, color: Option<&str>, size: Option<&str>) -> CartItem {
        CartItem {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: Price::from_cents(2500),
            category: "Men".to_string(),
            image: format!("/men/{id}.jpg"),
            color: color.map(String::from),
            size: size.map(String::from),
        }
    }

    fn shirt() -> CartItem {
        CartItem {
            product_id: ProductId::new(1),
            name: "Shirt".to_string(),
            unit_price: Price::from_cents(2500),
            category: "Men".to_string(),
            image: "x".to_string(),
            color: None,
            size: None,
        }
    }

    #[test]
    fn test_add_same_key_merges_quantities() {
        let red_m = item(1, Some("Red"), Some("M"));
        let cart = Cart::new()
            .with_added(red_m.clone(), 1)
            .with_added(item(2, None, None), 4)
            .with_added(red_m.clone(), 2)
            .with_added(item(3, Some("Blue"), None), 1)
            .with_added(red_m.clone(), 5);

        let matching: Vec<_> = cart.iter().filter(|l| l.matches(&red_m.key())).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].quantity, 8);
        assert_eq!(cart.len(), 3);
    }

    #[test]
    fn test_merge_keeps_position_and_stored_fields() {
        let original = item(1, Some("Red"), None);
        let mut renamed = original.clone();
        renamed.name = "Renamed".to_string();
        renamed.unit_price = Price::from_cents(9900);

        let cart = Cart::new()
            .with_added(original, 1)
            .with_added(item(2, None, None), 1)
            .with_added(renamed, 3);

        assert_eq!(cart.lines()[0].product_id, ProductId::new(1));
        assert_eq!(cart.lines()[0].quantity, 4);
        assert_eq!(cart.lines()[0].name, "Product 1");
        assert_eq!(cart.lines()[0].unit_price, Price::from_cents(2500));
        assert_eq!(cart.lines()[1].product_id, ProductId::new(2));
    }

    #[test]
    fn test_different_size_is_a_distinct_line() {
        let cart = Cart::new()
            .with_added(item(1, Some("Red"), Some("M")), 1)
            .with_added(item(1, Some("Red"), Some("L")), 1);

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.lines()[0].size.as_deref(), Some("M"));
        assert_eq!(cart.lines()[1].size.as_deref(), Some("L"));
    }

    #[test]
    fn test_absent_variant_only_matches_absent() {
        let cart = Cart::new()
            .with_added(item(1, None, None), 1)
            .with_added(item(1, Some("Red"), None), 1)
            .with_added(item(1, None, Some("M")), 1)
            .with_added(item(1, None, None), 1);

        assert_eq!(cart.len(), 3);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_zero_quantity_add_is_ignored() {
        let cart = Cart::new().with_added(item(1, None, None), 2);
        assert_eq!(cart.with_added(item(1, None, None), 0), cart);
        assert!(Cart::new().with_added(item(5, None, None), 0).is_empty());
    }

    #[test]
    fn test_quantity_saturates() {
        let cart = Cart::new()
            .with_added(item(1, None, None), u32::MAX)
            .with_added(item(1, None, None), 10);
        assert_eq!(cart.lines()[0].quantity, u32::MAX);
    }

    #[test]
    fn test_remove_drops_whole_line() {
        let x = item(1, Some("Red"), Some("M"));
        let cart = Cart::new().with_added(x.clone(), 3).without(&x.key());
        assert!(cart.find(&x.key()).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let cart = Cart::new()
            .with_added(item(1, Some("Red"), Some("M")), 1)
            .with_added(item(2, None, None), 2);

        let after = cart.without(&LineKey::new(ProductId::new(1), Some("Red".into()), None));
        assert_eq!(after, cart);

        let after = cart.without(&LineKey::new(ProductId::new(9), None, None));
        assert_eq!(after, cart);
    }

    #[test]
    fn test_apply_dispatches_ops() {
        let x = item(4, None, Some("XL"));
        let cart = Cart::new().apply(&CartOp::Add {
            item: x.clone(),
            quantity: 2,
        });
        assert_eq!(cart.lines()[0].quantity, 2);

        let cart = cart.apply(&CartOp::Remove(x.key()));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_end_to_end_shirt_scenario() {
        let cart = Cart::new().with_added(shirt(), 2);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);

        let cart = cart.with_added(shirt(), 1);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);

        let cart = cart.without(&LineKey::new(ProductId::new(1), None, None));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_encode_uses_stored_field_names() {
        let cart = Cart::new().with_added(item(1, Some("White"), None), 2);
        let value: serde_json::Value = serde_json::from_str(&cart.encode().unwrap()).unwrap();

        let line = &value[0];
        assert_eq!(line["id"], 1);
        assert_eq!(line["qty"], 2);
        assert_eq!(line["color"], "White");
        assert!(line["price"].is_number());
        assert!(line.get("size").is_none());
        assert!(line.get("quantity").is_none());
    }

    #[test]
    fn test_encode_decode_preserves_lines_and_order() {
        let cart = Cart::new()
            .with_added(item(3, Some("Blue"), Some("L")), 1)
            .with_added(item(1, None, None), 2)
            .with_added(item(2, Some("Red"), None), 5);

        let decoded = Cart::decode(&cart.encode().unwrap()).unwrap();
        assert_eq!(decoded, cart);
    }

    #[test]
    fn test_decode_stored_browser_format() {
        let raw = r#"[{"id":2,"name":"Women's Summer Dress","price":40,"category":"Women","image":"/women/dress.jpg","qty":1,"color":"Red","size":"M"}]"#;
        let cart = Cart::decode(raw).unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].unit_price, Price::from_cents(4000));
        assert_eq!(cart.lines()[0].size.as_deref(), Some("M"));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(matches!(
            Cart::decode("not json"),
            Err(CartDecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_decode_rejects_non_array() {
        assert!(matches!(
            Cart::decode(r#"{"id":1}"#),
            Err(CartDecodeError::NotASequence("object"))
        ));
        assert!(matches!(
            Cart::decode("null"),
            Err(CartDecodeError::NotASequence("null"))
        ));
    }

    #[test]
    fn test_decode_drops_foreign_elements() {
        let (cart, dropped) = Cart::decode_lossy(r#"[1, 2, 3]"#).unwrap();
        assert!(cart.is_empty());
        assert_eq!(dropped, 3);
    }

    #[test]
    fn test_decode_keeps_valid_lines_among_foreign_elements() {
        let raw = r#"[
            {"id":1,"name":"Men's Classic T-Shirt","price":25,"category":"Men","image":"/men/tee.jpg","qty":2},
            "stray",
            {"id":3,"qty":1},
            {"id":4,"name":"Women's Blouse","price":30,"category":"Women","image":"/women/blouse.jpg","qty":1,"color":"Pink"}
        ]"#;
        let (cart, dropped) = Cart::decode_lossy(raw).unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.lines()[0].product_id, ProductId::new(1));
        assert_eq!(cart.lines()[1].color.as_deref(), Some("Pink"));
    }

    #[test]
    fn test_decode_empty_array() {
        assert!(Cart::decode("[]").unwrap().is_empty());
    }
}
