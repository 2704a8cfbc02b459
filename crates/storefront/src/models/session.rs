//! Session-related types.
//!
//! Types stored in the session for authentication state.

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use maison_core::UserId;

use crate::services::store::UserContext;
use crate::supabase::AuthSession;

/// Refresh this long before the access token actually expires.
const EXPIRY_LEEWAY_SECONDS: i64 = 60;

/// Session-stored user identity and tokens.
///
/// Implements `Debug` manually to redact tokens.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Option<String>,
    pub is_admin: bool,
    access_token: String,
    refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CurrentUser {
    /// Build from a fresh auth session.
    #[must_use]
    pub fn from_session(session: AuthSession, is_admin: bool, issued_at: DateTime<Utc>) -> Self {
        let expires_at = session.expiry(issued_at);
        Self {
            id: session.user.id,
            email: session.user.email,
            is_admin,
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at,
        }
    }

    /// Whether the access token is expired (or about to be) at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + TimeDelta::seconds(EXPIRY_LEEWAY_SECONDS) >= self.expires_at
    }

    #[must_use]
    pub fn access_token(&self) -> SecretString {
        SecretString::from(self.access_token.as_str())
    }

    #[must_use]
    pub fn refresh_token(&self) -> SecretString {
        SecretString::from(self.refresh_token.as_str())
    }

    /// Identity the store manager acts for.
    #[must_use]
    pub fn store_context(&self) -> UserContext {
        UserContext {
            id: self.id,
            access_token: self.access_token(),
        }
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("is_admin", &self.is_admin)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous cart and wishlist.
    pub const ANONYMOUS_STORE: &str = "anonymous_store";
}
