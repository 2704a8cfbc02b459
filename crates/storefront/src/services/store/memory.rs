//! In-memory [`StoreBackend`] for tests.
//!
//! Keeps rows in insertion order like the remote tables, enforces the
//! (user, product) uniqueness of the wishlist, and lets tests push change
//! notifications, close feeds, or make every call fail.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, mpsc, watch};

use maison_core::{CartLine, Product, ProductId, UserId};

use super::backend::{StoreBackend, UserContext};
use crate::supabase::realtime::Subscription;
use crate::supabase::{RealtimeError, SupabaseError, TableChange};

/// Shared in-memory tables. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct Feed {
    user_id: UserId,
    sender: mpsc::Sender<TableChange>,
    tokens: watch::Receiver<SecretString>,
}

#[derive(Default)]
struct MemoryInner {
    products: Mutex<HashMap<ProductId, Product>>,
    cart_items: Mutex<Vec<(UserId, ProductId, i32)>>,
    wishlist: Mutex<Vec<(UserId, ProductId)>>,
    feeds: Mutex<Vec<Feed>>,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    /// Backend whose catalog holds `products`.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let catalog = products.into_iter().map(|p| (p.id, p)).collect();
        Self {
            inner: Arc::new(MemoryInner {
                products: Mutex::new(catalog),
                ..MemoryInner::default()
            }),
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// The user's cart rows as (product, quantity), in insertion order.
    pub async fn cart_rows(&self, user_id: UserId) -> Vec<(ProductId, i32)> {
        self.inner
            .cart_items
            .lock()
            .await
            .iter()
            .filter(|(u, _, _)| *u == user_id)
            .map(|(_, p, q)| (*p, *q))
            .collect()
    }

    /// The user's wishlisted product ids, in insertion order.
    pub async fn wishlist_rows(&self, user_id: UserId) -> Vec<ProductId> {
        self.inner
            .wishlist
            .lock()
            .await
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, p)| *p)
            .collect()
    }

    /// Write a cart row directly, as another device would.
    pub async fn put_cart_row(&self, user_id: UserId, product_id: ProductId, quantity: i32) {
        upsert(&mut *self.inner.cart_items.lock().await, user_id, product_id, quantity);
    }

    /// Deliver a change notification to the user's live subscriptions.
    pub async fn push_change(&self, user_id: UserId, change: TableChange) {
        let mut feeds = self.inner.feeds.lock().await;
        let mut open = Vec::with_capacity(feeds.len());
        for feed in feeds.drain(..) {
            if feed.user_id == user_id && feed.sender.send(change).await.is_err() {
                continue;
            }
            open.push(feed);
        }
        *feeds = open;
    }

    /// End the user's feeds, as a dropped socket would.
    pub async fn close_feeds(&self, user_id: UserId) {
        self.inner
            .feeds
            .lock()
            .await
            .retain(|feed| feed.user_id != user_id);
    }

    /// Access token the user's newest live feed currently holds.
    pub async fn feed_token(&self, user_id: UserId) -> Option<String> {
        self.inner
            .feeds
            .lock()
            .await
            .iter()
            .rev()
            .find(|feed| feed.user_id == user_id && !feed.sender.is_closed())
            .map(|feed| feed.tokens.borrow().expose_secret().to_owned())
    }

    /// Number of subscriptions whose receiver is still alive.
    pub async fn live_subscriptions(&self, user_id: UserId) -> usize {
        self.inner
            .feeds
            .lock()
            .await
            .iter()
            .filter(|feed| feed.user_id == user_id && !feed.sender.is_closed())
            .count()
    }

    fn check(&self) -> Result<(), SupabaseError> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(SupabaseError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn record_write(&self) {
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
    }

    async fn product_map(&self) -> HashMap<ProductId, Product> {
        self.inner.products.lock().await.clone()
    }
}

fn upsert(rows: &mut Vec<(UserId, ProductId, i32)>, user_id: UserId, product_id: ProductId, quantity: i32) {
    match rows
        .iter_mut()
        .find(|(u, p, _)| *u == user_id && *p == product_id)
    {
        Some(row) => row.2 = quantity,
        None => rows.push((user_id, product_id, quantity)),
    }
}

impl StoreBackend for MemoryBackend {
    async fn fetch_cart(&self, user: &UserContext) -> Result<Vec<CartLine>, SupabaseError> {
        self.check()?;
        let products = self.product_map().await;
        Ok(self
            .cart_rows(user.id)
            .await
            .into_iter()
            .filter_map(|(product_id, quantity)| {
                products.get(&product_id).map(|product| CartLine {
                    product: product.clone(),
                    quantity,
                })
            })
            .collect())
    }

    async fn fetch_wishlist(&self, user: &UserContext) -> Result<Vec<Product>, SupabaseError> {
        self.check()?;
        let products = self.product_map().await;
        Ok(self
            .wishlist_rows(user.id)
            .await
            .into_iter()
            .filter_map(|product_id| products.get(&product_id).cloned())
            .collect())
    }

    async fn upsert_cart_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), SupabaseError> {
        self.check()?;
        self.put_cart_row(user.id, product_id, quantity).await;
        self.record_write();
        Ok(())
    }

    async fn update_cart_quantity(
        &self,
        user: &UserContext,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), SupabaseError> {
        self.check()?;
        let mut rows = self.inner.cart_items.lock().await;
        if let Some(row) = rows
            .iter_mut()
            .find(|(u, p, _)| *u == user.id && *p == product_id)
        {
            row.2 = quantity;
        }
        self.record_write();
        Ok(())
    }

    async fn delete_cart_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
    ) -> Result<(), SupabaseError> {
        self.check()?;
        self.inner
            .cart_items
            .lock()
            .await
            .retain(|(u, p, _)| !(*u == user.id && *p == product_id));
        self.record_write();
        Ok(())
    }

    async fn clear_cart(&self, user: &UserContext) -> Result<(), SupabaseError> {
        self.check()?;
        self.inner
            .cart_items
            .lock()
            .await
            .retain(|(u, _, _)| *u != user.id);
        self.record_write();
        Ok(())
    }

    async fn insert_wishlist_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
    ) -> Result<(), SupabaseError> {
        self.check()?;
        let mut rows = self.inner.wishlist.lock().await;
        if rows.contains(&(user.id, product_id)) {
            return Err(SupabaseError::Conflict(
                "duplicate key value violates unique constraint".to_string(),
            ));
        }
        rows.push((user.id, product_id));
        self.record_write();
        Ok(())
    }

    async fn delete_wishlist_item(
        &self,
        user: &UserContext,
        product_id: ProductId,
    ) -> Result<(), SupabaseError> {
        self.check()?;
        self.inner
            .wishlist
            .lock()
            .await
            .retain(|row| *row != (user.id, product_id));
        self.record_write();
        Ok(())
    }

    async fn fetch_product(&self, product_id: ProductId) -> Result<Option<Product>, SupabaseError> {
        self.check()?;
        Ok(self.inner.products.lock().await.get(&product_id).cloned())
    }

    async fn subscribe(
        &self,
        user: &UserContext,
        changes: mpsc::Sender<TableChange>,
    ) -> Result<Subscription, RealtimeError> {
        let (sender, mut receiver) = mpsc::channel(16);
        let (token_sender, tokens) = watch::channel(user.access_token.clone());
        self.inner.feeds.lock().await.push(Feed {
            user_id: user.id,
            sender,
            tokens,
        });

        let handle = tokio::spawn(async move {
            while let Some(change) = receiver.recv().await {
                if changes.send(change).await.is_err() {
                    break;
                }
            }
        });
        Ok(Subscription::with_token_updates(handle, token_sender))
    }
}
