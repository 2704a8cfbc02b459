//! Supabase clients: `PostgREST` tables, `GoTrue` auth, Realtime change feed.
//!
//! # Architecture
//!
//! - Supabase is the source of truth. No local database, direct API calls.
//! - Catalog reads (products, boutiques) are cached with `moka`; per-user
//!   rows (cart, wishlist, profile) never are.
//! - Every request carries the project anon key as `apikey`. Row-level
//!   security is enforced by sending the signed-in user's access token as the
//!   bearer, or the anon key for public reads.
//!
//! # Example
//!
//! ```rust,ignore
//! use maison_storefront::supabase::DataClient;
//!
//! let data = DataClient::new(&config.supabase, config.catalog_cache_ttl);
//! let products = data.list_products().await?;
//! ```

mod auth;
pub mod realtime;
mod rest;
pub mod types;

pub use auth::AuthClient;
pub use realtime::{ChangeKind, RealtimeClient, RealtimeError, TableChange, WatchedTable};
pub use rest::DataClient;
pub use types::{AuthSession, AuthUser, SignUpOutcome};

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when interacting with Supabase.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing, expired or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Unique constraint violation (e.g., duplicate wishlist entry).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited by Supabase.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl SupabaseError {
    /// Classify a non-success response.
    pub(crate) fn from_response(status: StatusCode, body: &str, retry_after: Option<u64>) -> Self {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(ApiErrorBody::into_message)
            .unwrap_or_else(|| body.chars().take(200).collect());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited(retry_after.unwrap_or(1)),
            _ => Self::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether this error came from a uniqueness constraint.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Error body shapes returned by `PostgREST` and `GoTrue`.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

impl ApiErrorBody {
    fn into_message(self) -> Option<String> {
        let message = self
            .message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)?;
        Some(match self.details {
            Some(details) if !details.is_empty() => format!("{message} ({details})"),
            _ => message,
        })
    }
}

/// Attach the project key and bearer token to a request.
///
/// Without a user token the anon key doubles as the bearer, which is what
/// the public catalog policies expect.
pub(crate) fn authorize(
    request: reqwest::RequestBuilder,
    anon_key: &SecretString,
    access_token: Option<&SecretString>,
) -> reqwest::RequestBuilder {
    let bearer = access_token.unwrap_or(anon_key).expose_secret();
    request
        .header("apikey", anon_key.expose_secret())
        .bearer_auth(bearer)
}

/// Read a response, mapping non-success statuses to [`SupabaseError`].
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String, SupabaseError> {
    let status = response.status();
    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());

    let body = response.text().await?;

    if !status.is_success() {
        tracing::debug!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Supabase returned non-success status"
        );
        return Err(SupabaseError::from_response(status, &body, retry_after));
    }

    Ok(body)
}
