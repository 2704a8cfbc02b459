//! `GoTrue` client: password sign-in, sign-up, refresh and sign-out.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use maison_core::Email;

use crate::config::SupabaseConfig;
use crate::supabase::types::{AuthSession, SignUpOutcome};
use crate::supabase::{SupabaseError, authorize, read_body};

/// Client for the Supabase auth API.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
}

impl AuthClient {
    /// Create a new auth client.
    #[must_use]
    pub fn new(config: &SupabaseConfig) -> Self {
        Self {
            inner: Arc::new(AuthClientInner {
                client: reqwest::Client::new(),
                base_url: config.url.clone(),
                anon_key: config.anon_key.clone(),
            }),
        }
    }

    fn endpoint(&self, path: &str, grant_type: Option<&str>) -> Url {
        let mut url = self.inner.base_url.clone();
        url.set_path(&format!("auth/v1/{path}"));
        if let Some(grant_type) = grant_type {
            url.query_pairs_mut().append_pair("grant_type", grant_type);
        }
        url
    }

    async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &serde_json::Value,
    ) -> Result<T, SupabaseError> {
        let request = authorize(self.inner.client.post(url), &self.inner.anon_key, None).json(body);
        let text = read_body(request.send().await?).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::Api`] with status 400 for wrong credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, SupabaseError> {
        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });
        self.post(self.endpoint("token", Some("password")), &body)
            .await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is taken or the password is rejected.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<SignUpOutcome, SupabaseError> {
        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });
        self.post(self.endpoint("signup", None), &body).await
    }

    /// Trade a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is expired or revoked.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &SecretString) -> Result<AuthSession, SupabaseError> {
        let body = serde_json::json!({ "refresh_token": refresh_token.expose_secret() });
        self.post(self.endpoint("token", Some("refresh_token")), &body)
            .await
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &SecretString) -> Result<(), SupabaseError> {
        let request = authorize(
            self.inner.client.post(self.endpoint("logout", None)),
            &self.inner.anon_key,
            Some(access_token),
        );
        read_body(request.send().await?).await?;
        Ok(())
    }
}
