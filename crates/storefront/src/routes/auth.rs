//! Authentication route handlers.
//!
//! Email/password sign-in and sign-up through the auth provider. The session
//! keeps the resulting [`CurrentUser`]; the store manager follows it.

use axum::{Json, extract::State, http::StatusCode};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use maison_core::UserId;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::routes::store::{Shopper, StoreView, load_local};
use crate::services::SignUp;
use crate::state::AppState;

/// Sign-in and sign-up body.
#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    password: String,
}

impl Credentials {
    fn password(&self) -> SecretString {
        SecretString::from(self.password.as_str())
    }
}

/// The signed-in user as shown to the client.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl From<&CurrentUser> for UserView {
    fn from(user: &CurrentUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<UserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreView>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub confirmation_required: bool,
}

/// Store the user in a fresh session and load their store.
async fn start_session(
    state: &AppState,
    session: Session,
    user: &CurrentUser,
) -> Result<SessionResponse> {
    // New session id on privilege change
    session.cycle_id().await?;
    set_current_user(&session, user).await?;
    set_sentry_user(&user.id, user.email.as_deref());

    let Json(store) = Shopper::load(state, session, Some(user)).await?.finish().await?;
    Ok(SessionResponse {
        user: Some(UserView::from(user)),
        store: Some(store),
        confirmation_required: false,
    })
}

/// Sign in with email and password.
///
/// POST /api/auth/sign-in
#[instrument(skip_all)]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SessionResponse>> {
    let user = state
        .auth()
        .sign_in(&credentials.email, &credentials.password())
        .await?;
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Json(start_session(&state, session, &user).await?))
}

/// Register a new account.
///
/// POST /api/auth/sign-up
///
/// Returns 201 with a session, or 202 when the provider requires the email
/// address to be confirmed first.
#[instrument(skip_all)]
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    match state
        .auth()
        .sign_up(&credentials.email, &credentials.password())
        .await?
    {
        SignUp::SignedIn(user) => {
            tracing::info!(user_id = %user.id, "User registered");
            let response = start_session(&state, session, &user).await?;
            Ok((StatusCode::CREATED, Json(response)))
        }
        SignUp::ConfirmationRequired { email } => {
            tracing::info!(email = %email, "Registration awaiting email confirmation");
            Ok((
                StatusCode::ACCEPTED,
                Json(SessionResponse {
                    user: None,
                    store: None,
                    confirmation_required: true,
                }),
            ))
        }
    }
}

/// Sign out and return the anonymous store.
///
/// POST /api/auth/sign-out
#[instrument(skip_all)]
pub async fn sign_out(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<Json<SessionResponse>> {
    if let Some(user) = user {
        state.auth().sign_out(&user).await;
        clear_current_user(&session).await?;
        state.stores().release(user.id).await;
        clear_sentry_user();
        tracing::info!(user_id = %user.id, "User signed out");
    }

    let local = load_local(&session).await?;
    Ok(Json(SessionResponse {
        user: None,
        store: Some(StoreView::new(local, false)),
        confirmation_required: false,
    }))
}

/// The signed-in user, if any.
///
/// GET /api/auth/me
pub async fn me(OptionalAuth(user): OptionalAuth) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: user.as_ref().map(UserView::from),
        store: None,
        confirmation_required: false,
    })
}
