//! Authentication extractors.
//!
//! The signed-in user lives in the session under
//! [`session_keys::CURRENT_USER`]. Extracting it refreshes an expired access
//! token on the way; a rejected refresh token signs the user out.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::{debug, instrument};

use crate::error::AppError;
use crate::models::{CurrentUser, session_keys};
use crate::services::AuthError;
use crate::state::AppState;

/// Extractor that requires a signed-in user. Rejects with 401.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     Json(user.id)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that optionally gets the signed-in user.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Extractor that requires a signed-in admin. Rejects with 401 or 403.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };
        Ok(Self(session_user(session, state).await?))
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let OptionalAuth(user) = OptionalAuth::from_request_parts(parts, state).await?;
        user.map(Self)
            .ok_or_else(|| AppError::Unauthorized("sign in required".to_string()))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden("admin access required".to_string()));
        }
        Ok(Self(user))
    }
}

/// Read the session user, refreshing its tokens if they expired.
#[instrument(skip_all)]
async fn session_user(session: &Session, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let Some(user) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    match state.auth().refresh_if_expired(&user).await {
        Ok(None) => Ok(Some(user)),
        Ok(Some(refreshed)) => {
            debug!(user_id = %refreshed.id, "Access token refreshed");
            set_current_user(session, &refreshed).await?;
            state
                .stores()
                .update_token(refreshed.id, refreshed.access_token())
                .await;
            Ok(Some(refreshed))
        }
        Err(AuthError::SessionExpired) => {
            debug!(user_id = %user.id, "Refresh token rejected, signing out");
            clear_current_user(session).await?;
            state.stores().release(user.id).await;
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (sign-out).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
