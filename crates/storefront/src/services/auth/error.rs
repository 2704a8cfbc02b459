//! Authentication error types.

use thiserror::Error;

use crate::supabase::SupabaseError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] maison_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The refresh token was rejected; the user must sign in again.
    #[error("session expired")]
    SessionExpired,

    /// Auth provider or profile lookup failed.
    #[error(transparent)]
    Remote(#[from] SupabaseError),
}

impl AuthError {
    /// Interpret a failed password sign-in.
    pub(crate) fn from_sign_in(error: SupabaseError) -> Self {
        match error {
            SupabaseError::Unauthorized(_) | SupabaseError::Api { status: 400, .. } => {
                Self::InvalidCredentials
            }
            other => Self::Remote(other),
        }
    }

    /// Interpret a failed sign-up.
    pub(crate) fn from_sign_up(error: SupabaseError) -> Self {
        match error {
            SupabaseError::Conflict(_) => Self::UserAlreadyExists,
            SupabaseError::Api { status: 400 | 422, message } => {
                let lower = message.to_lowercase();
                if lower.contains("already registered") || lower.contains("already exists") {
                    Self::UserAlreadyExists
                } else if lower.contains("password") {
                    Self::WeakPassword(message)
                } else {
                    Self::Remote(SupabaseError::Api {
                        status: 422,
                        message,
                    })
                }
            }
            other => Self::Remote(other),
        }
    }

    /// Interpret a failed token refresh.
    pub(crate) fn from_refresh(error: SupabaseError) -> Self {
        match error {
            SupabaseError::Unauthorized(_) | SupabaseError::Api { status: 400, .. } => {
                Self::SessionExpired
            }
            other => Self::Remote(other),
        }
    }
}
