//! Product catalog route handlers.

use axum::{
    Json,
    extract::{Path, Query},
};
use ecomcloth_core::ProductId;
use ecomcloth_core::catalog::{self, Category, DEFAULT_SIZE, Product, SIZES};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};

/// Query parameters for the product listing.
#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

/// Product detail with the choices the detail view starts from.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: &'static Product,
    pub sizes: &'static [&'static str],
    pub default_color: Option<&'static str>,
    pub default_size: &'static str,
}

/// List products, optionally filtered by category.
///
/// An absent or unrecognized category lists the whole catalog.
#[instrument]
pub async fn index(Query(query): Query<ProductQuery>) -> Json<Vec<&'static Product>> {
    let category = query
        .category
        .as_deref()
        .and_then(|value| value.parse::<Category>().ok());

    Json(catalog::by_category(category).collect())
}

/// Show a single product.
#[instrument]
pub async fn show(Path(id): Path<ProductId>) -> Result<Json<ProductDetail>> {
    let product =
        catalog::find(id).ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(Json(ProductDetail {
        product,
        sizes: &SIZES,
        default_color: product.default_color(),
        default_size: DEFAULT_SIZE,
    }))
}
