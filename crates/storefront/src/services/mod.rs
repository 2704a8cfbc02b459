//! Business logic services for storefront.
//!
//! - `auth` - email/password accounts and token refresh
//! - `store` - per-user cart and wishlist state

pub mod auth;
pub mod store;

pub use auth::{AuthError, AuthService, SignUp};
pub use store::{StoreError, StoreManager, StoreRegistry, StoreState, SupabaseBackend};
