//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Health check
//! GET    /health/ready                        - Readiness (storage reachable)
//!
//! # Catalog
//! GET    /api/products                        - Product listing (?category=Men|Women)
//! GET    /api/products/{id}                   - Product detail
//!
//! # Tab sessions
//! POST   /api/tabs                            - Open a tab session (?defer_load=true)
//! POST   /api/tabs/{tab_id}/load              - Load a deferred tab's cart
//! DELETE /api/tabs/{tab_id}                   - Close a tab session
//!
//! # Cart (per tab)
//! GET    /api/tabs/{tab_id}/cart              - Cart view
//! POST   /api/tabs/{tab_id}/cart/items        - Add to cart (triggers cart-updated)
//! DELETE /api/tabs/{tab_id}/cart/items        - Remove a line (?id&color&size)
//! GET    /api/tabs/{tab_id}/cart/count        - Cart count badge (fragment)
//! GET    /api/tabs/{tab_id}/cart/dropdown     - Cart dropdown (fragment)
//! POST   /api/tabs/{tab_id}/checkout          - Checkout placeholder
//! ```

pub mod cart;
pub mod products;
pub mod tabs;

use axum::{
    Router,
    extract::State,
    middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::index))
        .route("/api/products/{id}", get(products::show))
}

/// Create the tab session and cart routes router.
pub fn tab_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tabs", post(tabs::open))
        .route("/api/tabs/{tab_id}", axum::routing::delete(tabs::close))
        .route("/api/tabs/{tab_id}/load", post(tabs::load))
        .route("/api/tabs/{tab_id}/cart", get(cart::show))
        .route(
            "/api/tabs/{tab_id}/cart/items",
            post(cart::add).delete(cart::remove),
        )
        .route("/api/tabs/{tab_id}/cart/count", get(cart::count))
        .route("/api/tabs/{tab_id}/cart/dropdown", get(cart::dropdown))
        .route("/api/tabs/{tab_id}/checkout", post(cart::checkout))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(product_routes())
        .merge(tab_routes())
}

/// Build the storefront application with request tracing.
///
/// Sentry layers are added by the binary, outside of this router.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if durable storage cannot be read.
async fn readiness(State(state): State<AppState>) -> Result<&'static str> {
    state.storage().get_item(&state.config().cart_key)?;
    Ok("ok")
}
