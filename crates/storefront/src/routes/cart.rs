//! Cart route handlers.
//!
//! Every handler works on the cart of one tab session. The session is
//! checked out through the [`TabRegistry`](crate::tabs::TabRegistry), which
//! first delivers any changes made by sibling tabs, so a response always
//! reflects the latest stored cart. Mutating handlers answer with an
//! `HX-Trigger: cart-updated` header so badges and dropdowns refresh.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
};
use ecomcloth_core::catalog::{self, SIZES};
use ecomcloth_core::{CartLine, LineKey, Price, ProductId};
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::instrument;

use crate::cart::CartManager;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::state::AppState;
use crate::storage::TabId;

/// Header telling HTMX clients the cart changed.
const CART_UPDATED: (&str, &str) = ("HX-Trigger", "cart-updated");

/// Cart display data returned by the JSON endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub loaded: bool,
    pub lines: Vec<CartLine>,
    pub item_count: u64,
    pub subtotal: Price,
}

impl From<&CartManager> for CartView {
    fn from(manager: &CartManager) -> Self {
        let cart = manager.cart();
        Self {
            loaded: manager.is_loaded(),
            lines: cart.lines().to_vec(),
            item_count: cart.iter().map(|line| u64::from(line.quantity)).sum(),
            subtotal: cart.iter().map(CartLine::line_total).sum(),
        }
    }
}

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: Option<u32>,
}

/// Query identifying the line to remove.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartQuery {
    pub id: ProductId,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl RemoveFromCartQuery {
    fn into_key(self) -> LineKey {
        LineKey::new(self.id, self.color, self.size)
    }
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub loaded: bool,
    pub count: u64,
}

/// One line of the cart dropdown.
pub struct DropdownRow {
    pub name: String,
    pub image: String,
    pub variant: String,
    pub quantity: u32,
    pub line_total: String,
    pub remove_url: String,
}

impl DropdownRow {
    fn new(tab: TabId, line: &CartLine) -> Self {
        let variant = [line.color.as_deref(), line.size.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" / ");

        let mut remove_url = format!("/api/tabs/{tab}/cart/items?id={}", line.product_id);
        if let Some(color) = &line.color {
            remove_url.push_str("&color=");
            remove_url.push_str(&urlencoding::encode(color));
        }
        if let Some(size) = &line.size {
            remove_url.push_str("&size=");
            remove_url.push_str(&urlencoding::encode(size));
        }

        Self {
            name: line.name.clone(),
            image: line.image.clone(),
            variant,
            quantity: line.quantity,
            line_total: line.line_total().to_string(),
            remove_url,
        }
    }
}

/// Cart dropdown fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_dropdown.html")]
pub struct CartDropdownTemplate {
    pub tab_id: TabId,
    pub loaded: bool,
    pub rows: Vec<DropdownRow>,
    pub item_count: u64,
    pub subtotal: String,
}

impl From<&CartManager> for CartDropdownTemplate {
    fn from(manager: &CartManager) -> Self {
        let view = CartView::from(manager);
        let tab = manager.tab();
        Self {
            tab_id: tab,
            loaded: view.loaded,
            rows: view.lines.iter().map(|line| DropdownRow::new(tab, line)).collect(),
            item_count: view.item_count,
            subtotal: view.subtotal.to_string(),
        }
    }
}

/// Check out a tab's cart manager, or 404 for unknown tabs.
async fn manager(state: &AppState, tab: TabId) -> Result<OwnedMutexGuard<CartManager>> {
    state
        .tabs()
        .checkout(tab)
        .await
        .ok_or_else(|| AppError::NotFound(format!("tab {tab}")))
}

/// Show the cart.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(tab): Path<TabId>) -> Result<Json<CartView>> {
    let manager = manager(&state, tab).await?;
    Ok(Json(CartView::from(&*manager)))
}

/// Add a product to the cart.
///
/// Colour and size are stored as sent. A request without them adds the
/// plain product, which is a different line from any of its variants.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    Path(tab): Path<TabId>,
    Json(request): Json<AddToCartRequest>,
) -> Result<Response> {
    let mut manager = manager(&state, tab).await?;

    let quantity = request.quantity.unwrap_or(1);
    if quantity == 0 {
        return Err(AppError::BadRequest(
            "quantity must be at least 1".to_string(),
        ));
    }

    let product = catalog::find(request.product_id)
        .ok_or_else(|| AppError::NotFound(format!("product {}", request.product_id)))?;

    if let Some(color) = &request.color
        && !product.colors.contains(color)
    {
        return Err(AppError::BadRequest(format!(
            "{} is not available in {color}",
            product.name
        )));
    }
    if let Some(size) = &request.size
        && !SIZES.contains(&size.as_str())
    {
        return Err(AppError::BadRequest(format!("unknown size {size}")));
    }

    manager.add_to_cart(product.to_cart_item(request.color, request.size), quantity);

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[
            ("product_id", &product.id.to_string()),
            ("quantity", &quantity.to_string()),
        ]),
    );

    Ok((
        AppendHeaders([CART_UPDATED]),
        Json(CartView::from(&*manager)),
    )
        .into_response())
}

/// Remove a line from the cart. Removing an absent line is not an error.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    Path(tab): Path<TabId>,
    Query(query): Query<RemoveFromCartQuery>,
) -> Result<Response> {
    let mut manager = manager(&state, tab).await?;
    let key = query.into_key();
    manager.remove_from_cart(&key);

    add_breadcrumb(
        "cart",
        "Removed from cart",
        Some(&[("product_id", &key.product_id.to_string())]),
    );

    Ok((
        AppendHeaders([CART_UPDATED]),
        Json(CartView::from(&*manager)),
    )
        .into_response())
}

/// Cart count badge (HTMX fragment).
#[instrument(skip(state))]
pub async fn count(
    State(state): State<AppState>,
    Path(tab): Path<TabId>,
) -> Result<CartCountTemplate> {
    let manager = manager(&state, tab).await?;
    let view = CartView::from(&*manager);
    Ok(CartCountTemplate {
        loaded: view.loaded,
        count: view.item_count,
    })
}

/// Cart dropdown (HTMX fragment).
#[instrument(skip(state))]
pub async fn dropdown(
    State(state): State<AppState>,
    Path(tab): Path<TabId>,
) -> Result<CartDropdownTemplate> {
    let manager = manager(&state, tab).await?;
    Ok(CartDropdownTemplate::from(&*manager))
}

/// Checkout placeholder. Accepts a non-empty cart and leaves it untouched.
#[instrument(skip(state))]
pub async fn checkout(
    State(state): State<AppState>,
    Path(tab): Path<TabId>,
) -> Result<StatusCode> {
    let manager = manager(&state, tab).await?;
    if manager.cart().is_empty() {
        return Err(AppError::BadRequest("cart is empty".to_string()));
    }

    tracing::info!(
        %tab,
        lines = manager.cart().len(),
        "checkout requested"
    );
    Ok(StatusCode::NO_CONTENT)
}
