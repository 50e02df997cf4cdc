//! Print the product catalog.

use ecomcloth_core::catalog::{self, SIZES};
use tracing::info;

/// List every product with its colours.
pub fn list() {
    for product in catalog::products() {
        info!(
            id = %product.id,
            name = %product.name,
            category = %product.category,
            price = %product.price,
            colors = %product.colors.join(", "),
            "Product"
        );
    }
    info!(sizes = %SIZES.join(", "), "Available sizes");
}
