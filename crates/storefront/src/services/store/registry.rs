//! Per-user store managers shared across sessions.

use std::time::Duration;

use moka::future::Cache;
use secrecy::SecretString;
use tracing::{debug, instrument};

use maison_core::UserId;

use super::{StoreBackend, StoreManager, StoreState, UserContext};

/// Signed-in managers keyed by user, expired after a period without use.
///
/// Every session of one user shares the same manager and realtime feed.
/// Dropping the last handle to an evicted manager closes its feed.
pub struct StoreRegistry<B: StoreBackend + Clone> {
    backend: B,
    managers: Cache<UserId, StoreManager<B>>,
}

impl<B: StoreBackend + Clone> Clone for StoreRegistry<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            managers: self.managers.clone(),
        }
    }
}

impl<B: StoreBackend + Clone> StoreRegistry<B> {
    /// Create a registry that evicts managers idle for `idle`.
    #[must_use]
    pub fn new(backend: B, idle: Duration) -> Self {
        let managers = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(idle)
            .eviction_listener(|user_id, _manager, cause| {
                debug!(user_id = %user_id, ?cause, "Store manager evicted");
            })
            .build();
        Self { backend, managers }
    }

    /// The user's manager, signing a new one in on first use.
    ///
    /// An existing manager picks up `user`'s access token.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn get_or_sign_in(&self, user: UserContext) -> StoreManager<B> {
        let token = user.access_token.clone();
        let backend = self.backend.clone();
        let entry = self
            .managers
            .entry(user.id)
            .or_insert_with(async move {
                let manager = StoreManager::new(backend);
                manager.sign_in(user).await;
                manager
            })
            .await;

        let manager = entry.into_value();
        manager.set_access_token(token).await;
        manager
    }

    /// Hand a refreshed access token to the user's manager, if one is live.
    pub async fn update_token(&self, user_id: UserId, access_token: SecretString) {
        if let Some(manager) = self.managers.get(&user_id).await {
            manager.set_access_token(access_token).await;
        }
    }

    /// Sign the user's manager out and forget it.
    #[instrument(skip(self))]
    pub async fn release(&self, user_id: UserId) {
        if let Some(manager) = self.managers.remove(&user_id).await {
            manager.sign_out(StoreState::default()).await;
        }
    }

    /// A throwaway manager over an anonymous local set.
    #[must_use]
    pub fn anonymous(&self, local: StoreState) -> StoreManager<B> {
        StoreManager::with_local(self.backend.clone(), local)
    }
}
