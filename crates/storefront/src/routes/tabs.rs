//! Tab session route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::cart::CartView;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::storage::TabId;

/// Response to opening a tab session.
#[derive(Debug, Serialize)]
pub struct TabOpened {
    pub tab_id: TabId,
    pub loaded: bool,
    pub cart: CartView,
}

/// Query parameters for opening a tab session.
#[derive(Debug, Default, Deserialize)]
pub struct OpenTabQuery {
    /// Leave the cart unloaded until `POST /api/tabs/{tab_id}/load`.
    #[serde(default)]
    pub defer_load: bool,
}

/// Open a tab session.
///
/// The cart is loaded from storage before responding, unless `defer_load`
/// is set.
#[instrument(skip(state))]
pub async fn open(
    State(state): State<AppState>,
    Query(query): Query<OpenTabQuery>,
) -> (StatusCode, Json<TabOpened>) {
    let (tab_id, cart) = if query.defer_load {
        state.tabs().open_unloaded().await
    } else {
        state.tabs().open().await
    };
    let manager = cart.lock().await;
    let cart = CartView::from(&*manager);

    (
        StatusCode::CREATED,
        Json(TabOpened {
            tab_id,
            loaded: cart.loaded,
            cart,
        }),
    )
}

/// Load a deferred tab's cart, replaying anything requested before.
///
/// Loading an already loaded tab changes nothing.
#[instrument(skip(state))]
pub async fn load(State(state): State<AppState>, Path(tab): Path<TabId>) -> Result<Json<CartView>> {
    let mut manager = state
        .tabs()
        .checkout(tab)
        .await
        .ok_or_else(|| AppError::NotFound(format!("tab {tab}")))?;
    manager.initialize();
    Ok(Json(CartView::from(&*manager)))
}

/// Close a tab session and release its storage subscription.
#[instrument(skip(state))]
pub async fn close(State(state): State<AppState>, Path(tab): Path<TabId>) -> Result<StatusCode> {
    if state.tabs().close(tab).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("tab {tab}")))
    }
}
