//! Wire types for Supabase responses and writes.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use maison_core::{CartLine, Product, ProductId, UserId};

/// Session issued by `GoTrue` on sign-in, sign-up or refresh.
///
/// Implements `Debug` manually to redact tokens.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    /// Unix timestamp; older `GoTrue` versions omit it.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Absolute expiry of the access token.
    #[must_use]
    pub fn expiry(&self, issued_at: DateTime<Utc>) -> DateTime<Utc> {
        self.expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(|| {
                issued_at + TimeDelta::try_seconds(self.expires_in).unwrap_or_else(TimeDelta::zero)
            })
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// The authenticated user as reported by `GoTrue`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Result of a sign-up call.
///
/// Projects with email confirmation enabled return the bare user and no
/// session until the address is confirmed.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    Session(AuthSession),
    ConfirmationRequired(AuthUser),
}

/// `cart_items` row with its product embedded (`select=quantity,products(*)`).
#[derive(Debug, Deserialize)]
pub(crate) struct CartItemRow {
    pub quantity: i32,
    pub products: Option<Product>,
}

impl CartItemRow {
    /// Rows whose product was deleted concurrently embed `null` and are skipped.
    pub fn into_line(self) -> Option<CartLine> {
        self.products.map(|product| CartLine {
            product,
            quantity: self.quantity,
        })
    }
}

/// `wishlist` row with its product embedded.
#[derive(Debug, Deserialize)]
pub(crate) struct WishlistRow {
    pub products: Option<Product>,
}

/// `profiles` row, reduced to the admin flag.
#[derive(Debug, Deserialize)]
pub(crate) struct ProfileRow {
    #[serde(default)]
    pub is_admin: Option<bool>,
}

/// Body for `cart_items` upserts.
#[derive(Debug, Serialize)]
pub(crate) struct CartItemWrite {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Body for `wishlist` inserts.
#[derive(Debug, Serialize)]
pub(crate) struct WishlistWrite {
    pub user_id: UserId,
    pub product_id: ProductId,
}
