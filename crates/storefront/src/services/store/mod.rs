//! Cart and wishlist state manager.
//!
//! A [`StoreManager`] is the single source of truth for one shopper's cart
//! and wishlist. Signed in, every mutation is written to the backend and the
//! affected list is re-fetched (no optimistic updates); a realtime feed keeps
//! the lists current when another device writes. Anonymous, the same
//! operations act on a local set that the HTTP layer persists in the session.
//!
//! A feed that ends (socket closed, token rejected) is re-opened after
//! [`RESUBSCRIBE_DELAY`], and both lists are re-fetched to cover the gap.
//!
//! Mutations on one manager are serialized, so two concurrent
//! `add_to_cart` calls for the same product yield quantity 2 in one row.

mod backend;
#[cfg(any(test, feature = "test-util"))]
mod memory;
mod registry;

pub use backend::{StoreBackend, SupabaseBackend, UserContext};
#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryBackend;
pub use registry::StoreRegistry;

use std::sync::{Arc, Weak};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, mpsc};
use tracing::{debug, instrument, warn};

use maison_core::{CartLine, OrderSummary, Product, ProductId, UserId};

use crate::supabase::realtime::Subscription;
use crate::supabase::{RealtimeError, SupabaseError, TableChange, WatchedTable};

/// Pending change notifications per manager.
const CHANGE_BUFFER: usize = 32;

/// Wait before re-opening a change feed that ended.
pub const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Cap for the doubling wait between failed re-open attempts.
const MAX_RESUBSCRIBE_DELAY: Duration = Duration::from_secs(60);

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected or failed the write.
    #[error(transparent)]
    Remote(#[from] SupabaseError),

    /// No product with this id exists.
    #[error("product not found: {0}")]
    UnknownProduct(ProductId),

    /// The anonymous wishlist already holds this product.
    #[error("product already in wishlist: {0}")]
    AlreadyWishlisted(ProductId),
}

/// Cart and wishlist contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    pub cart_items: Vec<CartLine>,
    pub wishlist_items: Vec<Product>,
}

impl StoreState {
    /// Total units in the cart.
    #[must_use]
    pub fn cart_count(&self) -> i64 {
        self.cart_items.iter().map(|l| i64::from(l.quantity)).sum()
    }

    /// Checkout totals for the current cart.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        OrderSummary::from_lines(&self.cart_items)
    }

    /// Quantity of `product_id` in the cart, if present.
    #[must_use]
    pub fn cart_quantity(&self, product_id: ProductId) -> Option<i32> {
        self.cart_items
            .iter()
            .find(|l| l.product_id() == product_id)
            .map(|l| l.quantity)
    }

    /// Whether `product_id` is wishlisted.
    #[must_use]
    pub fn in_wishlist(&self, product_id: ProductId) -> bool {
        self.wishlist_items.iter().any(|p| p.id == product_id)
    }
}

/// State manager for one shopper. Cheap to clone; clones share state.
pub struct StoreManager<B: StoreBackend> {
    inner: Arc<ManagerInner<B>>,
}

impl<B: StoreBackend> Clone for StoreManager<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ManagerInner<B> {
    backend: B,
    state: RwLock<StoreState>,
    /// Serializes mutations and lifecycle transitions.
    ops: Mutex<()>,
    active: Mutex<Option<ActiveUser>>,
}

/// Signed-in user with the feeds that die with it.
struct ActiveUser {
    user: UserContext,
    feed: Option<Subscription>,
    listener: Option<Subscription>,
}

impl<B: StoreBackend> StoreManager<B> {
    /// Anonymous manager with empty lists.
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self::with_local(backend, StoreState::default())
    }

    /// Anonymous manager seeded with a previously persisted local set.
    #[must_use]
    pub fn with_local(backend: B, local: StoreState) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                backend,
                state: RwLock::new(local),
                ops: Mutex::new(()),
                active: Mutex::new(None),
            }),
        }
    }

    /// Copy of the current lists.
    pub async fn snapshot(&self) -> StoreState {
        self.inner.state.read().await.clone()
    }

    /// The signed-in user, if any.
    pub async fn user_id(&self) -> Option<UserId> {
        self.inner.active.lock().await.as_ref().map(|a| a.user.id)
    }

    async fn user(&self) -> Option<UserContext> {
        self.inner.active.lock().await.as_ref().map(|a| a.user.clone())
    }

    /// Replace the access token after a refresh.
    ///
    /// A new token is also handed to the live change feed.
    pub async fn set_access_token(&self, access_token: SecretString) {
        let mut guard = self.inner.active.lock().await;
        let Some(active) = guard.as_mut() else {
            return;
        };
        if active.user.access_token.expose_secret() == access_token.expose_secret() {
            return;
        }
        if let Some(feed) = &active.feed {
            feed.refresh_token(access_token.clone());
        }
        active.user.access_token = access_token;
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bind the manager to `user`: load both lists and watch for changes.
    ///
    /// Fetch and subscribe failures are logged; the manager stays usable
    /// with whatever could be loaded, and a failed subscription is retried.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn sign_in(&self, user: UserContext) {
        let _ops = self.inner.ops.lock().await;

        *self.inner.active.lock().await = Some(ActiveUser {
            user: user.clone(),
            feed: None,
            listener: None,
        });
        *self.inner.state.write().await = StoreState::default();

        let (cart, wishlist) = tokio::join!(
            self.inner.backend.fetch_cart(&user),
            self.inner.backend.fetch_wishlist(&user)
        );
        {
            let mut state = self.inner.state.write().await;
            match cart {
                Ok(lines) => state.cart_items = lines,
                Err(e) => warn!(error = %e, "Failed to fetch cart"),
            }
            match wishlist {
                Ok(products) => state.wishlist_items = products,
                Err(e) => warn!(error = %e, "Failed to fetch wishlist"),
            }
        }

        // On failure the sender is dropped with the error, so the listener
        // starts out resubscribing
        let (sender, receiver) = mpsc::channel(CHANGE_BUFFER);
        let feed = match self.inner.backend.subscribe(&user, sender).await {
            Ok(feed) => Some(feed),
            Err(e) => {
                warn!(error = %e, "Failed to subscribe to store changes");
                None
            }
        };
        let listener = spawn_listener(Arc::downgrade(&self.inner), user.id, receiver);
        if let Some(active) = self.inner.active.lock().await.as_mut() {
            active.feed = feed;
            active.listener = Some(listener);
        }
    }

    /// Drop the change feed, clear both lists and load `local`.
    #[instrument(skip(self, local))]
    pub async fn sign_out(&self, local: StoreState) {
        let _ops = self.inner.ops.lock().await;
        let previous = self.inner.active.lock().await.take();
        drop(previous);
        *self.inner.state.write().await = local;
    }

    /// Open a fresh feed for `user_id` and re-fetch both lists.
    ///
    /// Returns `Ok(None)` once `user_id` is no longer signed in.
    async fn resubscribe(
        &self,
        user_id: UserId,
    ) -> Result<Option<mpsc::Receiver<TableChange>>, RealtimeError> {
        let Some(user) = self.user().await.filter(|u| u.id == user_id) else {
            return Ok(None);
        };
        let (sender, receiver) = mpsc::channel(CHANGE_BUFFER);
        let feed = self.inner.backend.subscribe(&user, sender).await?;
        {
            let mut guard = self.inner.active.lock().await;
            match guard.as_mut() {
                Some(active) if active.user.id == user_id => active.feed = Some(feed),
                _ => return Ok(None),
            }
        }
        debug!("Store change feed re-opened");

        tokio::join!(self.reload_cart(&user), self.reload_wishlist(&user));
        Ok(Some(receiver))
    }

    /// Re-fetch one list from the backend.
    pub async fn reload(&self, table: WatchedTable) {
        let Some(user) = self.user().await else {
            return;
        };
        match table {
            WatchedTable::CartItems => self.reload_cart(&user).await,
            WatchedTable::Wishlist => self.reload_wishlist(&user).await,
        }
    }

    async fn reload_cart(&self, user: &UserContext) {
        match self.inner.backend.fetch_cart(user).await {
            Ok(lines) if self.user_id().await == Some(user.id) => {
                self.inner.state.write().await.cart_items = lines;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to re-fetch cart"),
        }
    }

    async fn reload_wishlist(&self, user: &UserContext) {
        match self.inner.backend.fetch_wishlist(user).await {
            Ok(products) if self.user_id().await == Some(user.id) => {
                self.inner.state.write().await.wishlist_items = products;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to re-fetch wishlist"),
        }
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add one unit of `product_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the write fails, or
    /// [`StoreError::UnknownProduct`] for an anonymous add of a missing product.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, product_id: ProductId) -> Result<(), StoreError> {
        let _ops = self.inner.ops.lock().await;
        let existing = self.inner.state.read().await.cart_quantity(product_id);

        if let Some(user) = self.user().await {
            let quantity = existing.map_or(1, |q| q.saturating_add(1));
            self.inner
                .backend
                .upsert_cart_item(&user, product_id, quantity)
                .await?;
            self.reload_cart(&user).await;
            return Ok(());
        }

        if existing.is_none() {
            let product = self.lookup(product_id).await?;
            self.inner
                .state
                .write()
                .await
                .cart_items
                .push(CartLine {
                    product,
                    quantity: 1,
                });
        } else {
            let mut state = self.inner.state.write().await;
            if let Some(line) = state
                .cart_items
                .iter_mut()
                .find(|l| l.product_id() == product_id)
            {
                line.quantity = line.quantity.saturating_add(1);
            }
        }
        Ok(())
    }

    /// Remove `product_id` from the cart. Removing an absent product succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the delete fails.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, product_id: ProductId) -> Result<(), StoreError> {
        let _ops = self.inner.ops.lock().await;
        self.remove_locked(product_id).await
    }

    async fn remove_locked(&self, product_id: ProductId) -> Result<(), StoreError> {
        if let Some(user) = self.user().await {
            self.inner
                .backend
                .delete_cart_item(&user, product_id)
                .await?;
            self.reload_cart(&user).await;
        } else {
            self.inner
                .state
                .write()
                .await
                .cart_items
                .retain(|l| l.product_id() != product_id);
        }
        Ok(())
    }

    /// Overwrite the quantity of `product_id`. Zero removes the line.
    ///
    /// Other values are passed through unchecked; callers validate input.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the write fails.
    #[instrument(skip(self))]
    pub async fn update_cart_quantity(
        &self,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), StoreError> {
        let _ops = self.inner.ops.lock().await;
        if quantity == 0 {
            return self.remove_locked(product_id).await;
        }

        if let Some(user) = self.user().await {
            self.inner
                .backend
                .update_cart_quantity(&user, product_id, quantity)
                .await?;
            self.reload_cart(&user).await;
        } else if let Some(line) = self
            .inner
            .state
            .write()
            .await
            .cart_items
            .iter_mut()
            .find(|l| l.product_id() == product_id)
        {
            line.quantity = quantity;
        }
        Ok(())
    }

    /// Empty the cart (after checkout).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the delete fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), StoreError> {
        let _ops = self.inner.ops.lock().await;
        if let Some(user) = self.user().await {
            self.inner.backend.clear_cart(&user).await?;
            self.reload_cart(&user).await;
        } else {
            self.inner.state.write().await.cart_items.clear();
        }
        Ok(())
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Wishlist `product_id`.
    ///
    /// There is no existence pre-check: signed in, a duplicate surfaces as
    /// the backend's conflict error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the insert fails,
    /// [`StoreError::AlreadyWishlisted`] for an anonymous duplicate, or
    /// [`StoreError::UnknownProduct`] for an anonymous add of a missing product.
    #[instrument(skip(self))]
    pub async fn add_to_wishlist(&self, product_id: ProductId) -> Result<(), StoreError> {
        let _ops = self.inner.ops.lock().await;

        if let Some(user) = self.user().await {
            self.inner
                .backend
                .insert_wishlist_item(&user, product_id)
                .await?;
            self.reload_wishlist(&user).await;
            return Ok(());
        }

        if self.inner.state.read().await.in_wishlist(product_id) {
            return Err(StoreError::AlreadyWishlisted(product_id));
        }
        let product = self.lookup(product_id).await?;
        self.inner.state.write().await.wishlist_items.push(product);
        Ok(())
    }

    /// Remove `product_id` from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the delete fails.
    #[instrument(skip(self))]
    pub async fn remove_from_wishlist(&self, product_id: ProductId) -> Result<(), StoreError> {
        let _ops = self.inner.ops.lock().await;

        if let Some(user) = self.user().await {
            self.inner
                .backend
                .delete_wishlist_item(&user, product_id)
                .await?;
            self.reload_wishlist(&user).await;
        } else {
            self.inner
                .state
                .write()
                .await
                .wishlist_items
                .retain(|p| p.id != product_id);
        }
        Ok(())
    }

    async fn lookup(&self, product_id: ProductId) -> Result<Product, StoreError> {
        self.inner
            .backend
            .fetch_product(product_id)
            .await?
            .ok_or(StoreError::UnknownProduct(product_id))
    }
}

/// Re-fetch on every change; re-open the feed whenever it ends.
///
/// Holds the manager weakly so an idle manager can still be dropped.
fn spawn_listener<B: StoreBackend>(
    manager: Weak<ManagerInner<B>>,
    user_id: UserId,
    mut changes: mpsc::Receiver<TableChange>,
) -> Subscription {
    Subscription::new(tokio::spawn(async move {
        loop {
            while let Some(change) = changes.recv().await {
                let Some(inner) = manager.upgrade() else {
                    return;
                };
                debug!(table = ?change.table, kind = ?change.kind, "Store change received");
                StoreManager { inner }.reload(change.table).await;
            }

            let mut delay = RESUBSCRIBE_DELAY;
            changes = loop {
                tokio::time::sleep(delay).await;
                let Some(inner) = manager.upgrade() else {
                    return;
                };
                match (StoreManager { inner }).resubscribe(user_id).await {
                    Ok(Some(next)) => break next,
                    Ok(None) => return,
                    Err(e) => {
                        delay = (delay * 2).min(MAX_RESUBSCRIBE_DELAY);
                        warn!(error = %e, retry_in = ?delay, "Failed to re-open store change feed");
                    }
                }
            };
        }
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use maison_core::Price;

    use super::*;
    use crate::supabase::ChangeKind;

    fn product(name: &str, dollars: i64) -> Product {
        Product {
            id: ProductId::random(),
            name: name.to_string(),
            subtitle: None,
            description: None,
            images: Vec::new(),
            category: Some("Classic".to_string()),
            is_featured: false,
            created_at: None,
            price: Price::from_cents(dollars * 100),
            material: None,
            size: None,
        }
    }

    fn user() -> UserContext {
        UserContext {
            id: UserId::random(),
            access_token: SecretString::from("jwt"),
        }
    }

    async fn eventually<F, Fut>(mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        // Long enough to span a resubscribe
        for _ in 0..400 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_anonymous_add_increments_existing_line() {
        let watch = product("Datejust 36", 8_950);
        let backend = MemoryBackend::with_products([watch.clone()]);
        let store = StoreManager::new(backend.clone());

        store.add_to_cart(watch.id).await.unwrap();
        store.add_to_cart(watch.id).await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.cart_items.len(), 1);
        assert_eq!(state.cart_items[0].quantity, 2);
        assert_eq!(backend.write_count(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_add_unknown_product() {
        let store = StoreManager::new(MemoryBackend::default());
        let missing = ProductId::random();
        assert!(matches!(
            store.add_to_cart(missing).await,
            Err(StoreError::UnknownProduct(id)) if id == missing
        ));
        assert!(store.snapshot().await.cart_items.is_empty());
    }

    #[tokio::test]
    async fn test_signed_in_add_writes_then_refetches() {
        let watch = product("Submariner", 10_250);
        let backend = MemoryBackend::with_products([watch.clone()]);
        let store = StoreManager::new(backend.clone());
        let user = user();
        store.sign_in(user.clone()).await;

        store.add_to_cart(watch.id).await.unwrap();
        store.add_to_cart(watch.id).await.unwrap();

        assert_eq!(backend.cart_rows(user.id).await, vec![(watch.id, 2)]);
        assert_eq!(store.snapshot().await.cart_quantity(watch.id), Some(2));
    }

    #[tokio::test]
    async fn test_concurrent_adds_do_not_lose_increments() {
        let watch = product("GMT-Master II", 10_900);
        let backend = MemoryBackend::with_products([watch.clone()]);
        let store = StoreManager::new(backend.clone());
        let user = user();
        store.sign_in(user.clone()).await;

        let adds = (0..10).map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.add_to_cart(watch.id).await })
        });
        for add in futures::future::join_all(adds).await {
            add.unwrap().unwrap();
        }

        assert_eq!(backend.cart_rows(user.id).await, vec![(watch.id, 10)]);
    }

    #[tokio::test]
    async fn test_update_quantity_and_zero_removes() {
        let watch = product("Explorer", 7_200);
        let backend = MemoryBackend::with_products([watch.clone()]);
        let store = StoreManager::new(backend.clone());
        let user = user();
        store.sign_in(user.clone()).await;
        store.add_to_cart(watch.id).await.unwrap();

        store.update_cart_quantity(watch.id, 5).await.unwrap();
        assert_eq!(store.snapshot().await.cart_quantity(watch.id), Some(5));

        store.update_cart_quantity(watch.id, 0).await.unwrap();
        assert!(store.snapshot().await.cart_items.is_empty());
        assert!(backend.cart_rows(user.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let watch = product("Explorer", 7_200);
        let backend = MemoryBackend::with_products([watch.clone()]);
        let store = StoreManager::new(backend.clone());
        store.sign_in(user()).await;
        store.add_to_cart(watch.id).await.unwrap();

        store.remove_from_cart(watch.id).await.unwrap();
        store.remove_from_cart(watch.id).await.unwrap();
        assert!(store.snapshot().await.cart_items.is_empty());
    }

    #[tokio::test]
    async fn test_wishlist_duplicate_surfaces_backend_conflict() {
        let watch = product("Day-Date 40", 40_500);
        let backend = MemoryBackend::with_products([watch.clone()]);
        let store = StoreManager::new(backend.clone());
        let user = user();
        store.sign_in(user.clone()).await;

        store.add_to_wishlist(watch.id).await.unwrap();
        let err = store.add_to_wishlist(watch.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Remote(ref e) if e.is_conflict()));
        assert_eq!(backend.wishlist_rows(user.id).await, vec![watch.id]);

        store.remove_from_wishlist(watch.id).await.unwrap();
        assert!(store.snapshot().await.wishlist_items.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_wishlist_duplicate() {
        let watch = product("Day-Date 40", 40_500);
        let store = StoreManager::new(MemoryBackend::with_products([watch.clone()]));
        store.add_to_wishlist(watch.id).await.unwrap();
        assert!(matches!(
            store.add_to_wishlist(watch.id).await,
            Err(StoreError::AlreadyWishlisted(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_failure_is_returned_without_rollback() {
        let watch = product("Sky-Dweller", 44_000);
        let backend = MemoryBackend::with_products([watch.clone()]);
        let store = StoreManager::new(backend.clone());
        store.sign_in(user()).await;
        store.add_to_cart(watch.id).await.unwrap();

        backend.set_failing(true);
        assert!(matches!(
            store.add_to_cart(watch.id).await,
            Err(StoreError::Remote(_))
        ));
        assert_eq!(store.snapshot().await.cart_quantity(watch.id), Some(1));
    }

    #[tokio::test]
    async fn test_sign_in_swallows_fetch_failures() {
        let backend = MemoryBackend::default();
        backend.set_failing(true);
        let store = StoreManager::new(backend);
        let user = user();

        store.sign_in(user.clone()).await;

        assert_eq!(store.user_id().await, Some(user.id));
        assert_eq!(store.snapshot().await, StoreState::default());
    }

    #[tokio::test]
    async fn test_change_notification_triggers_refetch() {
        let watch = product("Yacht-Master", 14_300);
        let backend = MemoryBackend::with_products([watch.clone()]);
        let store = StoreManager::new(backend.clone());
        let user = user();
        store.sign_in(user.clone()).await;

        // Another device adds three units
        backend.put_cart_row(user.id, watch.id, 3).await;
        backend
            .push_change(
                user.id,
                TableChange {
                    table: WatchedTable::CartItems,
                    kind: ChangeKind::Insert,
                },
            )
            .await;

        eventually(|| {
            let store = store.clone();
            async move { store.snapshot().await.cart_quantity(watch.id) == Some(3) }
        })
        .await;
    }

    #[tokio::test]
    async fn test_closed_feed_is_reopened_and_refetched() {
        let watch = product("Sea-Dweller", 13_950);
        let backend = MemoryBackend::with_products([watch.clone()]);
        let store = StoreManager::new(backend.clone());
        let user = user();
        store.sign_in(user.clone()).await;
        assert_eq!(backend.live_subscriptions(user.id).await, 1);

        backend.close_feeds(user.id).await;
        // Written while no feed was listening
        backend.put_cart_row(user.id, watch.id, 2).await;

        eventually(|| {
            let backend = backend.clone();
            async move { backend.live_subscriptions(user.id).await == 1 }
        })
        .await;
        eventually(|| {
            let store = store.clone();
            async move { store.snapshot().await.cart_quantity(watch.id) == Some(2) }
        })
        .await;

        // The new feed delivers changes
        backend.put_cart_row(user.id, watch.id, 4).await;
        backend
            .push_change(
                user.id,
                TableChange {
                    table: WatchedTable::CartItems,
                    kind: ChangeKind::Update,
                },
            )
            .await;
        eventually(|| {
            let store = store.clone();
            async move { store.snapshot().await.cart_quantity(watch.id) == Some(4) }
        })
        .await;
    }

    #[tokio::test]
    async fn test_refreshed_token_reaches_feed() {
        let backend = MemoryBackend::default();
        let store = StoreManager::new(backend.clone());
        let user = user();
        store.sign_in(user.clone()).await;
        assert_eq!(backend.feed_token(user.id).await.as_deref(), Some("jwt"));

        store.set_access_token(SecretString::from("refreshed.jwt")).await;
        assert_eq!(
            backend.feed_token(user.id).await.as_deref(),
            Some("refreshed.jwt")
        );

        // A re-opened feed joins with the newest token
        backend.close_feeds(user.id).await;
        eventually(|| {
            let backend = backend.clone();
            async move { backend.live_subscriptions(user.id).await == 1 }
        })
        .await;
        assert_eq!(
            backend.feed_token(user.id).await.as_deref(),
            Some("refreshed.jwt")
        );
    }

    #[tokio::test]
    async fn test_signed_out_manager_does_not_resubscribe() {
        let backend = MemoryBackend::default();
        let store = StoreManager::new(backend.clone());
        let user = user();
        store.sign_in(user.clone()).await;
        store.sign_out(StoreState::default()).await;

        backend.close_feeds(user.id).await;
        tokio::time::sleep(RESUBSCRIBE_DELAY * 2).await;
        assert_eq!(backend.live_subscriptions(user.id).await, 0);
    }

    #[tokio::test]
    async fn test_sign_out_drops_feed_and_loads_local() {
        let watch = product("Cellini", 19_000);
        let local_item = product("Air-King", 7_400);
        let backend = MemoryBackend::with_products([watch.clone(), local_item.clone()]);
        let store = StoreManager::new(backend.clone());
        let user = user();
        store.sign_in(user.clone()).await;
        store.add_to_cart(watch.id).await.unwrap();
        assert_eq!(backend.live_subscriptions(user.id).await, 1);

        let local = StoreState {
            cart_items: vec![CartLine {
                product: local_item.clone(),
                quantity: 1,
            }],
            wishlist_items: Vec::new(),
        };
        store.sign_out(local.clone()).await;

        assert_eq!(store.user_id().await, None);
        assert_eq!(store.snapshot().await, local);
        eventually(|| {
            let backend = backend.clone();
            async move { backend.live_subscriptions(user.id).await == 0 }
        })
        .await;

        // Signed-out mutations stay local
        store.add_to_cart(local_item.id).await.unwrap();
        assert_eq!(backend.cart_rows(user.id).await, vec![(watch.id, 1)]);
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let a = product("Submariner", 10_250);
        let b = product("Explorer", 7_200);
        let backend = MemoryBackend::with_products([a.clone(), b.clone()]);
        let store = StoreManager::new(backend.clone());
        let user = user();
        store.sign_in(user.clone()).await;
        store.add_to_cart(a.id).await.unwrap();
        store.add_to_cart(b.id).await.unwrap();
        assert_eq!(store.snapshot().await.cart_count(), 2);

        store.clear_cart().await.unwrap();
        assert!(store.snapshot().await.cart_items.is_empty());
        assert!(backend.cart_rows(user.id).await.is_empty());
    }

    #[test]
    fn test_state_summary() {
        let state = StoreState {
            cart_items: vec![CartLine {
                product: product("Datejust", 10_000),
                quantity: 2,
            }],
            wishlist_items: Vec::new(),
        };
        assert_eq!(state.cart_count(), 2);
        assert_eq!(state.summary().grand_total, Price::from_cents(2_200_000));
    }
}
