//! Authentication service.
//!
//! Email/password accounts live with the auth provider; this service turns
//! its sessions into the [`CurrentUser`] kept in the HTTP session.

mod error;

pub use error::AuthError;

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{instrument, warn};

use maison_core::Email;

use crate::models::CurrentUser;
use crate::supabase::{AuthClient, AuthSession, DataClient, SignUpOutcome};

/// Minimum password length accepted by the auth provider.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Result of registering an account.
#[derive(Debug)]
pub enum SignUp {
    /// The account is active and signed in.
    SignedIn(CurrentUser),
    /// The provider sent a confirmation email; no session yet.
    ConfirmationRequired { email: String },
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    auth: AuthClient,
    data: DataClient,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(auth: AuthClient, data: DataClient) -> Self {
        Self { auth, data }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        let session = self
            .auth
            .sign_in_with_password(&email, password)
            .await
            .map_err(AuthError::from_sign_in)?;
        Ok(self.current_user(session).await)
    }

    /// Register with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &SecretString) -> Result<SignUp, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password.expose_secret())?;

        match self
            .auth
            .sign_up(&email, password)
            .await
            .map_err(AuthError::from_sign_up)?
        {
            SignUpOutcome::Session(session) => {
                Ok(SignUp::SignedIn(self.current_user(session).await))
            }
            SignUpOutcome::ConfirmationRequired(user) => Ok(SignUp::ConfirmationRequired {
                email: user.email.unwrap_or_else(|| email.as_str().to_string()),
            }),
        }
    }

    /// Refresh the user's tokens if the access token has expired.
    ///
    /// Returns `None` while the current token is still valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` if the refresh token is rejected.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn refresh_if_expired(
        &self,
        user: &CurrentUser,
    ) -> Result<Option<CurrentUser>, AuthError> {
        if !user.is_expired(Utc::now()) {
            return Ok(None);
        }
        let session = self
            .auth
            .refresh(&user.refresh_token())
            .await
            .map_err(AuthError::from_refresh)?;
        Ok(Some(CurrentUser::from_session(
            session,
            user.is_admin,
            Utc::now(),
        )))
    }

    /// Revoke the user's session with the provider. Failures are logged.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn sign_out(&self, user: &CurrentUser) {
        if let Err(e) = self.auth.sign_out(&user.access_token()).await {
            warn!(error = %e, "Failed to revoke session");
        }
    }

    /// Attach the profile's admin flag. A failed lookup reads as non-admin.
    async fn current_user(&self, session: AuthSession) -> CurrentUser {
        let token = SecretString::from(session.access_token.as_str());
        let is_admin = self
            .data
            .is_admin(session.user.id, &token)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read admin flag");
                false
            });
        CurrentUser::from_session(session, is_admin, Utc::now())
    }
}

/// Validate password requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supabase::SupabaseError;

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_wrong_credentials() {
        let err = AuthError::from_sign_in(SupabaseError::Api {
            status: 400,
            message: "Invalid login credentials".to_string(),
        });
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_sign_in_outage_stays_remote() {
        let err = AuthError::from_sign_in(SupabaseError::Api {
            status: 503,
            message: "unavailable".to_string(),
        });
        assert!(matches!(err, AuthError::Remote(_)));
    }

    #[test]
    fn test_sign_up_classification() {
        let taken = AuthError::from_sign_up(SupabaseError::Api {
            status: 422,
            message: "User already registered".to_string(),
        });
        assert!(matches!(taken, AuthError::UserAlreadyExists));

        let weak = AuthError::from_sign_up(SupabaseError::Api {
            status: 422,
            message: "Password should be at least 6 characters".to_string(),
        });
        assert!(matches!(weak, AuthError::WeakPassword(_)));
    }

    #[test]
    fn test_rejected_refresh_expires_session() {
        let err = AuthError::from_refresh(SupabaseError::Api {
            status: 400,
            message: "Invalid Refresh Token".to_string(),
        });
        assert!(matches!(err, AuthError::SessionExpired));
    }
}
