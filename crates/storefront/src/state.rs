//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config::StorefrontConfig;
use crate::services::{AuthService, StoreRegistry, SupabaseBackend};
use crate::supabase::{AuthClient, DataClient, RealtimeClient};

/// Signed-in store managers unused for this long are dropped.
const STORE_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// Supabase clients, the auth service and the per-user store registry.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    data: DataClient,
    auth: AuthService,
    stores: StoreRegistry<SupabaseBackend>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// No connection is opened here; clients connect on first use.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let data = DataClient::new(&config.supabase, config.catalog_cache_ttl);
        let auth = AuthService::new(AuthClient::new(&config.supabase), data.clone());
        let backend = SupabaseBackend::new(data.clone(), RealtimeClient::new(&config.supabase));
        let stores = StoreRegistry::new(backend, STORE_IDLE_TIMEOUT);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                data,
                auth,
                stores,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Supabase REST client.
    #[must_use]
    pub fn data(&self) -> &DataClient {
        &self.inner.data
    }

    /// Get a reference to the authentication service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the per-user store registry.
    #[must_use]
    pub fn stores(&self) -> &StoreRegistry<SupabaseBackend> {
        &self.inner.stores
    }
}
