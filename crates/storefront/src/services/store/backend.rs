//! Remote operations the store manager depends on.

use std::future::Future;

use secrecy::SecretString;
use tokio::sync::mpsc;

use maison_core::{CartLine, Product, ProductId, UserId};

use crate::supabase::realtime::Subscription;
use crate::supabase::{DataClient, RealtimeClient, RealtimeError, SupabaseError, TableChange};

/// The signed-in user a store manager acts for.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub id: UserId,
    pub access_token: SecretString,
}

/// Remote persistence and change notification for carts and wishlists.
///
/// Every write is keyed by (user, product) and relies on the remote unique
/// constraint; implementations do not pre-check existence.
pub trait StoreBackend: Send + Sync + 'static {
    fn fetch_cart(
        &self,
        user: &UserContext,
    ) -> impl Future<Output = Result<Vec<CartLine>, SupabaseError>> + Send;

    fn fetch_wishlist(
        &self,
        user: &UserContext,
    ) -> impl Future<Output = Result<Vec<Product>, SupabaseError>> + Send;

    /// Insert the row or overwrite its quantity.
    fn upsert_cart_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<(), SupabaseError>> + Send;

    fn update_cart_quantity(
        &self,
        user: &UserContext,
        product_id: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<(), SupabaseError>> + Send;

    fn delete_cart_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), SupabaseError>> + Send;

    fn clear_cart(
        &self,
        user: &UserContext,
    ) -> impl Future<Output = Result<(), SupabaseError>> + Send;

    /// Fails with [`SupabaseError::Conflict`] if the pair already exists.
    fn insert_wishlist_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), SupabaseError>> + Send;

    fn delete_wishlist_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
    ) -> impl Future<Output = Result<(), SupabaseError>> + Send;

    /// Product record for a new anonymous cart or wishlist line.
    fn fetch_product(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, SupabaseError>> + Send;

    /// Start forwarding changes to the user's cart and wishlist rows.
    fn subscribe(
        &self,
        user: &UserContext,
        changes: mpsc::Sender<TableChange>,
    ) -> impl Future<Output = Result<Subscription, RealtimeError>> + Send;
}

/// [`StoreBackend`] backed by Supabase REST and Realtime.
#[derive(Clone)]
pub struct SupabaseBackend {
    data: DataClient,
    realtime: RealtimeClient,
}

impl SupabaseBackend {
    #[must_use]
    pub const fn new(data: DataClient, realtime: RealtimeClient) -> Self {
        Self { data, realtime }
    }
}

impl StoreBackend for SupabaseBackend {
    async fn fetch_cart(&self, user: &UserContext) -> Result<Vec<CartLine>, SupabaseError> {
        self.data.fetch_cart(user.id, &user.access_token).await
    }

    async fn fetch_wishlist(&self, user: &UserContext) -> Result<Vec<Product>, SupabaseError> {
        self.data.fetch_wishlist(user.id, &user.access_token).await
    }

    async fn upsert_cart_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), SupabaseError> {
        self.data
            .upsert_cart_item(user.id, product_id, quantity, &user.access_token)
            .await
    }

    async fn update_cart_quantity(
        &self,
        user: &UserContext,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), SupabaseError> {
        self.data
            .update_cart_quantity(user.id, product_id, quantity, &user.access_token)
            .await
    }

    async fn delete_cart_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
    ) -> Result<(), SupabaseError> {
        self.data
            .delete_cart_item(user.id, product_id, &user.access_token)
            .await
    }

    async fn clear_cart(&self, user: &UserContext) -> Result<(), SupabaseError> {
        self.data.clear_cart(user.id, &user.access_token).await
    }

    async fn insert_wishlist_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
    ) -> Result<(), SupabaseError> {
        self.data
            .insert_wishlist_item(user.id, product_id, &user.access_token)
            .await
    }

    async fn delete_wishlist_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
    ) -> Result<(), SupabaseError> {
        self.data
            .delete_wishlist_item(user.id, product_id, &user.access_token)
            .await
    }

    async fn fetch_product(&self, product_id: ProductId) -> Result<Option<Product>, SupabaseError> {
        self.data.product(product_id).await
    }

    async fn subscribe(
        &self,
        user: &UserContext,
        changes: mpsc::Sender<TableChange>,
    ) -> Result<Subscription, RealtimeError> {
        self.realtime
            .subscribe(user.id, &user.access_token, changes)
            .await
    }
}
