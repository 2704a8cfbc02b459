//! Checkout route handlers.
//!
//! Orders are not persisted: placing one returns a confirmation and empties
//! the cart.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::routes::store::{CartLineView, Shopper, StoreView, SummaryView};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutView {
    pub items: Vec<CartLineView>,
    pub summary: SummaryView,
}

#[derive(Debug, Serialize)]
pub struct OrderConfirmation {
    pub confirmation: String,
    pub message: &'static str,
    pub items: Vec<CartLineView>,
    pub summary: SummaryView,
    pub store: StoreView,
}

/// Order review for the current cart.
///
/// GET /api/checkout
#[instrument(skip_all)]
pub async fn review(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<CheckoutView>> {
    let shopper = Shopper::load(&state, session, user.as_ref()).await?;
    let snapshot = shopper.manager.snapshot().await;
    Ok(Json(CheckoutView {
        summary: SummaryView::from(snapshot.summary()),
        items: snapshot
            .cart_items
            .into_iter()
            .map(CartLineView::from)
            .collect(),
    }))
}

/// Place the order.
///
/// POST /api/checkout
#[instrument(skip_all)]
pub async fn place_order(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<(StatusCode, Json<OrderConfirmation>)> {
    let shopper = Shopper::load(&state, session, user.as_ref()).await?;
    let snapshot = shopper.manager.snapshot().await;
    if snapshot.cart_items.is_empty() {
        return Err(AppError::BadRequest("Your cart is empty".to_string()));
    }

    let summary = snapshot.summary();
    let confirmation = confirmation_number();
    shopper.manager.clear_cart().await?;
    tracing::info!(
        confirmation = %confirmation,
        item_count = summary.item_count,
        grand_total = %summary.grand_total,
        "Order placed"
    );

    let Json(store) = shopper.finish().await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderConfirmation {
            confirmation,
            message: "Thank you for your order",
            items: snapshot
                .cart_items
                .into_iter()
                .map(CartLineView::from)
                .collect(),
            summary: SummaryView::from(summary),
            store,
        }),
    ))
}

/// Short confirmation reference, e.g. `MS-3F2A9C1E`.
fn confirmation_number() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("MS-{}", id.get(..8).unwrap_or(&id).to_uppercase())
}
