//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Responses are JSON: `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::store::StoreError;
use crate::supabase::SupabaseError;

/// Listing the client is sent back to when a product cannot be resolved.
pub const COLLECTIONS_PATH: &str = "/collections";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Supabase API operation failed.
    #[error("Supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart or wishlist operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// No product matches the route parameter.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Supabase(err) => supabase_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::SessionExpired => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::Remote(err) => supabase_status(err),
            },
            Self::Store(err) => match err {
                StoreError::UnknownProduct(_) => StatusCode::NOT_FOUND,
                StoreError::AlreadyWishlisted(_) => StatusCode::CONFLICT,
                StoreError::Remote(err) => supabase_status(err),
            },
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ProductNotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Server-side failures are not detailed.
    fn message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return if status == StatusCode::BAD_GATEWAY {
                "External service error".to_string()
            } else {
                "Internal server error".to_string()
            };
        }

        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::SessionExpired => "Session expired, please sign in again".to_string(),
                AuthError::Remote(err) => err.to_string(),
            },
            Self::Store(err) => match err {
                StoreError::AlreadyWishlisted(_) => "Already in wishlist".to_string(),
                StoreError::Remote(SupabaseError::Conflict(_)) => "Already saved".to_string(),
                other => other.to_string(),
            },
            Self::ProductNotFound(_) => "Product not found".to_string(),
            other => other.to_string(),
        }
    }
}

/// Status for a failed upstream call, as seen by our client.
fn supabase_status(err: &SupabaseError) -> StatusCode {
    match err {
        SupabaseError::NotFound(_) => StatusCode::NOT_FOUND,
        SupabaseError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        SupabaseError::Conflict(_) => StatusCode::CONFLICT,
        SupabaseError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        SupabaseError::Http(_) | SupabaseError::Api { .. } | SupabaseError::Parse(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let message = self.message(status);
        let body = match &self {
            Self::ProductNotFound(reference) => json!({
                "error": message,
                "reference": reference,
                "link": COLLECTIONS_PATH,
                "search": format!("/api/products?q={}", urlencoding::encode(reference)),
            }),
            _ => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
