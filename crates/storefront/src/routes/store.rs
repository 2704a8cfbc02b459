//! Cart and wishlist route handlers.
//!
//! Signed-in shoppers act on their shared, realtime-synchronized store
//! manager. Anonymous shoppers get a manager over the set kept in their
//! session, which is written back whenever a request changes it.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use maison_core::{CartLine, OrderSummary, Price, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, session_keys};
use crate::routes::products::{ProductView, views};
use crate::services::{StoreManager, StoreState, SupabaseBackend};
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product: ProductView,
    pub quantity: i32,
    pub line_total: Price,
    pub formatted_line_total: String,
}

impl From<CartLine> for CartLineView {
    fn from(line: CartLine) -> Self {
        let line_total = line.line_total();
        Self {
            product: ProductView::from(line.product),
            quantity: line.quantity,
            line_total,
            formatted_line_total: line_total.display(),
        }
    }
}

/// Order totals with display strings.
#[derive(Debug, Serialize)]
pub struct SummaryView {
    #[serde(flatten)]
    pub totals: OrderSummary,
    pub formatted_subtotal: String,
    pub shipping_label: String,
    pub formatted_taxes: String,
    pub formatted_grand_total: String,
}

impl From<OrderSummary> for SummaryView {
    fn from(totals: OrderSummary) -> Self {
        Self {
            formatted_subtotal: totals.subtotal.display(),
            shipping_label: totals.shipping_label(),
            formatted_taxes: totals.taxes.display(),
            formatted_grand_total: totals.grand_total.display(),
            totals,
        }
    }
}

/// Cart and wishlist payload.
#[derive(Debug, Serialize)]
pub struct StoreView {
    pub signed_in: bool,
    pub cart_items: Vec<CartLineView>,
    pub cart_count: i64,
    pub wishlist_items: Vec<ProductView>,
    pub summary: SummaryView,
}

impl StoreView {
    #[must_use]
    pub fn new(state: StoreState, signed_in: bool) -> Self {
        Self {
            signed_in,
            cart_count: state.cart_count(),
            summary: SummaryView::from(state.summary()),
            cart_items: state.cart_items.into_iter().map(CartLineView::from).collect(),
            wishlist_items: views(state.wishlist_items),
        }
    }
}

// =============================================================================
// Shopper
// =============================================================================

/// The store manager serving one request.
pub struct Shopper {
    pub manager: StoreManager<SupabaseBackend>,
    session: Session,
    /// Anonymous set as loaded from the session; `None` when signed in.
    local: Option<StoreState>,
}

impl Shopper {
    /// The signed-in user's shared manager, or one over the session's
    /// anonymous set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn load(state: &AppState, session: Session, user: Option<&CurrentUser>) -> Result<Self> {
        let (manager, local) = match user {
            Some(user) => (state.stores().get_or_sign_in(user.store_context()).await, None),
            None => {
                let local = load_local(&session).await?;
                (state.stores().anonymous(local.clone()), Some(local))
            }
        };
        Ok(Self {
            manager,
            session,
            local,
        })
    }

    /// Persist a changed anonymous set and render the current state.
    ///
    /// Unchanged sets are not written, so read-only requests never create a
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn finish(self) -> Result<Json<StoreView>> {
        let snapshot = self.manager.snapshot().await;
        if needs_persist(self.local.as_ref(), &snapshot) {
            self.session
                .insert(session_keys::ANONYMOUS_STORE, &snapshot)
                .await?;
        }
        Ok(Json(StoreView::new(snapshot, self.local.is_none())))
    }
}

fn needs_persist(local: Option<&StoreState>, snapshot: &StoreState) -> bool {
    local.is_some_and(|loaded| loaded != snapshot)
}

/// The anonymous cart and wishlist kept in the session.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store fails.
pub async fn load_local(session: &Session) -> Result<StoreState> {
    Ok(session
        .get::<StoreState>(session_keys::ANONYMOUS_STORE)
        .await?
        .unwrap_or_default())
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ItemRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i32,
}

/// Current cart and wishlist.
///
/// GET /api/store
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<StoreView>> {
    Shopper::load(&state, session, user.as_ref()).await?.finish().await
}

/// Add one unit to the cart.
///
/// POST /api/cart/items
#[instrument(skip(state, user, session), fields(product_id = %request.product_id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(request): Json<ItemRequest>,
) -> Result<Json<StoreView>> {
    let shopper = Shopper::load(&state, session, user.as_ref()).await?;
    shopper.manager.add_to_cart(request.product_id).await?;
    shopper.finish().await
}

/// Set a cart line's quantity. Zero removes the line.
///
/// PATCH /api/cart/items/{product_id}
#[instrument(skip(state, user, session, request))]
pub async fn update_cart_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(product_id): Path<ProductId>,
    Json(request): Json<QuantityRequest>,
) -> Result<Json<StoreView>> {
    if request.quantity < 0 {
        return Err(AppError::BadRequest(
            "quantity cannot be negative".to_string(),
        ));
    }
    let shopper = Shopper::load(&state, session, user.as_ref()).await?;
    shopper
        .manager
        .update_cart_quantity(product_id, request.quantity)
        .await?;
    shopper.finish().await
}

/// Remove a cart line.
///
/// DELETE /api/cart/items/{product_id}
#[instrument(skip(state, user, session))]
pub async fn remove_cart_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<StoreView>> {
    let shopper = Shopper::load(&state, session, user.as_ref()).await?;
    shopper.manager.remove_from_cart(product_id).await?;
    shopper.finish().await
}

/// Wishlist a product.
///
/// POST /api/wishlist/items
#[instrument(skip(state, user, session), fields(product_id = %request.product_id))]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Json(request): Json<ItemRequest>,
) -> Result<Json<StoreView>> {
    let shopper = Shopper::load(&state, session, user.as_ref()).await?;
    shopper.manager.add_to_wishlist(request.product_id).await?;
    shopper.finish().await
}

/// Remove a product from the wishlist.
///
/// DELETE /api/wishlist/items/{product_id}
#[instrument(skip(state, user, session))]
pub async fn remove_wishlist_item(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<StoreView>> {
    let shopper = Shopper::load(&state, session, user.as_ref()).await?;
    shopper.manager.remove_from_wishlist(product_id).await?;
    shopper.finish().await
}
