//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                           - Liveness
//! GET    /health/ready                     - Readiness (Supabase reachable)
//!
//! # Catalog
//! GET    /api/home                         - Featured products
//! GET    /api/products                     - Filtered, sorted listing
//! GET    /api/products/facets              - Facet values
//! GET    /api/products/{reference}         - Detail by id or name slug
//! GET    /api/boutiques                    - Boutique locator
//!
//! # Support
//! GET    /api/support/faq                  - FAQ categories
//! POST   /api/support/contact              - Contact form
//! POST   /api/newsletter                   - Newsletter sign-up
//!
//! # Store (signed in or anonymous)
//! GET    /api/store                        - Cart, wishlist, totals
//! POST   /api/cart/items                   - Add one unit
//! PATCH  /api/cart/items/{product_id}      - Set quantity (0 removes)
//! DELETE /api/cart/items/{product_id}      - Remove line
//! POST   /api/wishlist/items               - Wishlist a product
//! DELETE /api/wishlist/items/{product_id}  - Remove from wishlist
//! GET    /api/checkout                     - Order review
//! POST   /api/checkout                     - Place order
//!
//! # Auth
//! POST   /api/auth/sign-in
//! POST   /api/auth/sign-up
//! POST   /api/auth/sign-out
//! GET    /api/auth/me
//!
//! # Admin (requires is_admin)
//! GET|POST    /api/admin/products
//! PUT|DELETE  /api/admin/products/{id}
//! GET|POST    /api/admin/boutiques
//! PUT|DELETE  /api/admin/boutiques/{id}
//! GET         /api/admin/stats
//! ```

pub mod admin;
pub mod auth;
pub mod boutiques;
pub mod checkout;
pub mod home;
pub mod products;
pub mod store;
pub mod support;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post, put},
};

use crate::middleware::{auth_rate_limiter, form_rate_limiter};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(home::home))
        .route("/products", get(products::index))
        .route("/products/facets", get(products::facets))
        .route("/products/{reference}", get(products::show))
        .route("/boutiques", get(boutiques::index))
}

/// Create the support routes router.
pub fn support_routes() -> Router<AppState> {
    Router::new()
        .route("/support/faq", get(support::faq))
        .merge(
            Router::new()
                .route("/support/contact", post(support::contact))
                .route("/newsletter", post(support::subscribe))
                .route_layer(form_rate_limiter()),
        )
}

/// Create the cart, wishlist and checkout routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/store", get(store::show))
        .route("/cart/items", post(store::add_to_cart))
        .route(
            "/cart/items/{product_id}",
            patch(store::update_cart_item).delete(store::remove_cart_item),
        )
        .route("/wishlist/items", post(store::add_to_wishlist))
        .route(
            "/wishlist/items/{product_id}",
            axum::routing::delete(store::remove_wishlist_item),
        )
        .route(
            "/checkout",
            get(checkout::review).post(checkout::place_order),
        )
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .merge(
            Router::new()
                .route("/sign-in", post(auth::sign_in))
                .route("/sign-up", post(auth::sign_up))
                .route_layer(auth_rate_limiter()),
        )
        .route("/sign-out", post(auth::sign_out))
        .route("/me", get(auth::me))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route(
            "/boutiques",
            get(admin::list_boutiques).post(admin::create_boutique),
        )
        .route(
            "/boutiques/{id}",
            put(admin::update_boutique).delete(admin::delete_boutique),
        )
        .route("/stats", get(admin::stats))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .merge(catalog_routes())
        .merge(support_routes())
        .merge(store_routes())
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if Supabase is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.data().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
