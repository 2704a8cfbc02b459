//! `PostgREST` client for the storefront tables.
//!
//! Uses `reqwest` 0.13 with hand-built filter query strings
//! (`id=eq.…`, `name=ilike.*…*`). Products and boutiques are cached with
//! `moka`; admin writes invalidate the whole catalog cache.

mod cache;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::Method;
use secrecy::SecretString;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use maison_core::{
    Boutique, BoutiqueDraft, BoutiqueId, CartLine, Product, ProductDraft, ProductId, ProductRef,
    UserId,
};

use crate::config::SupabaseConfig;
use crate::supabase::types::{CartItemRow, CartItemWrite, ProfileRow, WishlistRow, WishlistWrite};
use crate::supabase::{SupabaseError, authorize, read_body};

use cache::{CacheKey, CacheValue};

const PRODUCTS: &str = "products";
const BOUTIQUES: &str = "boutiques";
const CART_ITEMS: &str = "cart_items";
const WISHLIST: &str = "wishlist";
const PROFILES: &str = "profiles";

/// `Prefer` header for upserts keyed on the table's unique constraint.
const PREFER_MERGE: &str = "resolution=merge-duplicates,return=minimal";
const PREFER_MINIMAL: &str = "return=minimal";
const PREFER_REPRESENTATION: &str = "return=representation";

// =============================================================================
// DataClient
// =============================================================================

/// Client for the Supabase REST API.
///
/// Cheap to clone. Catalog reads use the anon key; per-user reads and writes
/// take the user's access token so row-level security applies.
#[derive(Clone)]
pub struct DataClient {
    inner: Arc<DataClientInner>,
}

struct DataClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    cache: Cache<CacheKey, CacheValue>,
}

impl DataClient {
    /// Create a new REST client.
    #[must_use]
    pub fn new(config: &SupabaseConfig, cache_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(cache_ttl)
            .build();

        Self {
            inner: Arc::new(DataClientInner {
                client: reqwest::Client::new(),
                base_url: config.url.clone(),
                anon_key: config.anon_key.clone(),
                cache,
            }),
        }
    }

    /// Drop every cached catalog read.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
        token: Option<&SecretString>,
    ) -> Result<T, SupabaseError> {
        let url = table_url(&self.inner.base_url, table, params);
        let request = authorize(self.inner.client.get(url), &self.inner.anon_key, token);
        let body = read_body(request.send().await?).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                table,
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse PostgREST response"
            );
            SupabaseError::Parse(e)
        })
    }

    async fn write<B: Serialize + Sync>(
        &self,
        method: Method,
        table: &str,
        params: &[(&str, String)],
        body: Option<&B>,
        prefer: &str,
        token: Option<&SecretString>,
    ) -> Result<String, SupabaseError> {
        let url = table_url(&self.inner.base_url, table, params);
        let mut request = authorize(
            self.inner.client.request(method, url),
            &self.inner.anon_key,
            token,
        )
        .header("Prefer", prefer);
        if let Some(body) = body {
            request = request.json(body);
        }
        read_body(request.send().await?).await
    }

    async fn write_returning<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        table: &str,
        params: &[(&str, String)],
        body: &B,
        token: &SecretString,
    ) -> Result<T, SupabaseError> {
        let text = self
            .write(method, table, params, Some(body), PREFER_REPRESENTATION, Some(token))
            .await?;
        let rows: Vec<T> = serde_json::from_str(&text)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(format!("no {table} row matched")))
    }

    /// Liveness probe used by the readiness endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the REST API is unreachable or rejects the key.
    pub async fn ping(&self) -> Result<(), SupabaseError> {
        let _: Vec<serde_json::Value> = self
            .fetch(PRODUCTS, &[("select", "id".to_string()), ("limit", "1".to_string())], None)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// All products in table order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, SupabaseError> {
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self
            .fetch(PRODUCTS, &[("select", "*".to_string())], None)
            .await?;

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Resolve a product route parameter: exact id or partial name match.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails. A missing product is
    /// `Ok(None)`.
    #[instrument(skip(self), fields(reference = ?reference))]
    pub async fn find_product(
        &self,
        reference: &ProductRef,
    ) -> Result<Option<Product>, SupabaseError> {
        let cache_key = CacheKey::Product(cache_id(reference));

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(Some(*product));
        }

        let (column, filter) = product_filter(reference);
        let params = [
            ("select", "*".to_string()),
            (column, filter),
            ("limit", "1".to_string()),
        ];
        let products: Vec<Product> = self.fetch(PRODUCTS, &params, None).await?;

        let Some(product) = products.into_iter().next() else {
            return Ok(None);
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(Some(product))
    }

    /// Product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, SupabaseError> {
        self.find_product(&ProductRef::Id(id)).await
    }

    /// All boutiques in table order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_boutiques(&self) -> Result<Vec<Boutique>, SupabaseError> {
        if let Some(CacheValue::Boutiques(boutiques)) =
            self.inner.cache.get(&CacheKey::Boutiques).await
        {
            debug!("Cache hit for boutiques");
            return Ok(boutiques);
        }

        let boutiques: Vec<Boutique> = self
            .fetch(BOUTIQUES, &[("select", "*".to_string())], None)
            .await?;

        self.inner
            .cache
            .insert(CacheKey::Boutiques, CacheValue::Boutiques(boutiques.clone()))
            .await;

        Ok(boutiques)
    }

    // =========================================================================
    // Cart & Wishlist
    // =========================================================================

    /// The user's cart lines with embedded products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn fetch_cart(
        &self,
        user_id: UserId,
        token: &SecretString,
    ) -> Result<Vec<CartLine>, SupabaseError> {
        let params = [
            ("select", "quantity,products(*)".to_string()),
            ("user_id", eq(user_id)),
        ];
        let rows: Vec<CartItemRow> = self.fetch(CART_ITEMS, &params, Some(token)).await?;
        Ok(rows.into_iter().filter_map(CartItemRow::into_line).collect())
    }

    /// The user's wishlisted products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn fetch_wishlist(
        &self,
        user_id: UserId,
        token: &SecretString,
    ) -> Result<Vec<Product>, SupabaseError> {
        let params = [
            ("select", "products(*)".to_string()),
            ("user_id", eq(user_id)),
        ];
        let rows: Vec<WishlistRow> = self.fetch(WISHLIST, &params, Some(token)).await?;
        Ok(rows.into_iter().filter_map(|row| row.products).collect())
    }

    /// Insert or overwrite the (user, product) cart row.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn upsert_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
        token: &SecretString,
    ) -> Result<(), SupabaseError> {
        let body = [CartItemWrite {
            user_id,
            product_id,
            quantity,
        }];
        self.write(
            Method::POST,
            CART_ITEMS,
            &[("on_conflict", "user_id,product_id".to_string())],
            Some(&body),
            PREFER_MERGE,
            Some(token),
        )
        .await?;
        Ok(())
    }

    /// Set the quantity of an existing cart row.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn update_cart_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
        token: &SecretString,
    ) -> Result<(), SupabaseError> {
        self.write(
            Method::PATCH,
            CART_ITEMS,
            &row_match(user_id, product_id),
            Some(&serde_json::json!({ "quantity": quantity })),
            PREFER_MINIMAL,
            Some(token),
        )
        .await?;
        Ok(())
    }

    /// Delete the (user, product) cart row. Deleting a missing row succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn delete_cart_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        token: &SecretString,
    ) -> Result<(), SupabaseError> {
        self.delete(CART_ITEMS, &row_match(user_id, product_id), token)
            .await
    }

    /// Delete every cart row of the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: UserId, token: &SecretString) -> Result<(), SupabaseError> {
        self.delete(CART_ITEMS, &[("user_id", eq(user_id))], token)
            .await
    }

    /// Insert a wishlist row. A duplicate is a [`SupabaseError::Conflict`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the row already exists.
    #[instrument(skip(self, token), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn insert_wishlist_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        token: &SecretString,
    ) -> Result<(), SupabaseError> {
        let body = [WishlistWrite {
            user_id,
            product_id,
        }];
        self.write(
            Method::POST,
            WISHLIST,
            &[],
            Some(&body),
            PREFER_MINIMAL,
            Some(token),
        )
        .await?;
        Ok(())
    }

    /// Delete a wishlist row.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn delete_wishlist_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        token: &SecretString,
    ) -> Result<(), SupabaseError> {
        self.delete(WISHLIST, &row_match(user_id, product_id), token)
            .await
    }

    async fn delete(
        &self,
        table: &str,
        params: &[(&str, String)],
        token: &SecretString,
    ) -> Result<(), SupabaseError> {
        self.write::<()>(Method::DELETE, table, params, None, PREFER_MINIMAL, Some(token))
            .await?;
        Ok(())
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Whether the user's profile carries the admin flag. A missing profile
    /// row or a null flag reads as `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn is_admin(&self, user_id: UserId, token: &SecretString) -> Result<bool, SupabaseError> {
        let params = [("select", "is_admin".to_string()), ("id", eq(user_id))];
        let rows: Vec<ProfileRow> = self.fetch(PROFILES, &params, Some(token)).await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.is_admin)
            .unwrap_or(false))
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Insert a product and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or policies reject the write.
    #[instrument(skip(self, draft, token), fields(name = %draft.name))]
    pub async fn create_product(
        &self,
        draft: &ProductDraft,
        token: &SecretString,
    ) -> Result<Product, SupabaseError> {
        let product = self
            .write_returning(Method::POST, PRODUCTS, &[], &[draft], token)
            .await?;
        self.invalidate_catalog();
        Ok(product)
    }

    /// Overwrite a product's editable columns.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::NotFound`] if no row has this id.
    #[instrument(skip(self, draft, token), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
        token: &SecretString,
    ) -> Result<Product, SupabaseError> {
        let product = self
            .write_returning(Method::PATCH, PRODUCTS, &[("id", eq(id))], draft, token)
            .await?;
        self.invalidate_catalog();
        Ok(product)
    }

    /// Delete a product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId, token: &SecretString) -> Result<(), SupabaseError> {
        self.delete(PRODUCTS, &[("id", eq(id))], token).await?;
        self.invalidate_catalog();
        Ok(())
    }

    /// Insert a boutique and return the stored row.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or policies reject the write.
    #[instrument(skip(self, draft, token), fields(name = %draft.name))]
    pub async fn create_boutique(
        &self,
        draft: &BoutiqueDraft,
        token: &SecretString,
    ) -> Result<Boutique, SupabaseError> {
        let boutique = self
            .write_returning(Method::POST, BOUTIQUES, &[], &[draft], token)
            .await?;
        self.invalidate_catalog();
        Ok(boutique)
    }

    /// Overwrite a boutique's editable columns.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::NotFound`] if no row has this id.
    #[instrument(skip(self, draft, token), fields(boutique_id = %id))]
    pub async fn update_boutique(
        &self,
        id: BoutiqueId,
        draft: &BoutiqueDraft,
        token: &SecretString,
    ) -> Result<Boutique, SupabaseError> {
        let boutique = self
            .write_returning(Method::PATCH, BOUTIQUES, &[("id", eq(id))], draft, token)
            .await?;
        self.invalidate_catalog();
        Ok(boutique)
    }

    /// Delete a boutique by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, token), fields(boutique_id = %id))]
    pub async fn delete_boutique(&self, id: BoutiqueId, token: &SecretString) -> Result<(), SupabaseError> {
        self.delete(BOUTIQUES, &[("id", eq(id))], token).await?;
        self.invalidate_catalog();
        Ok(())
    }
}

// =============================================================================
// Query Helpers
// =============================================================================

/// `{base}/rest/v1/{table}?{params}`.
fn table_url(base: &Url, table: &str, params: &[(&str, String)]) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("rest/v1/{table}"));
    if !params.is_empty() {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }
    url
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

fn row_match(user_id: UserId, product_id: ProductId) -> [(&'static str, String); 2] {
    [("user_id", eq(user_id)), ("product_id", eq(product_id))]
}

/// Column filter for a product route parameter.
fn product_filter(reference: &ProductRef) -> (&'static str, String) {
    match reference {
        ProductRef::Id(id) => ("id", eq(id)),
        ProductRef::Slug(slug) => ("name", format!("ilike.*{slug}*")),
    }
}

fn cache_id(reference: &ProductRef) -> String {
    match reference {
        ProductRef::Id(id) => format!("id:{id}"),
        ProductRef::Slug(slug) => format!("slug:{}", slug.to_lowercase()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://abcd.supabase.co").unwrap()
    }

    #[test]
    fn test_table_url_without_params() {
        assert_eq!(
            table_url(&base(), PRODUCTS, &[]).as_str(),
            "https://abcd.supabase.co/rest/v1/products"
        );
    }

    #[test]
    fn test_cart_select_url() {
        let user: UserId = "0b6f1c9e-3c1d-4b8e-9a51-2f1f4f0e7d11".parse().unwrap();
        let url = table_url(
            &base(),
            CART_ITEMS,
            &[
                ("select", "quantity,products(*)".to_string()),
                ("user_id", eq(user)),
            ],
        );
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("select".into(), "quantity,products(*)".into()));
        assert_eq!(
            pairs[1],
            ("user_id".into(), "eq.0b6f1c9e-3c1d-4b8e-9a51-2f1f4f0e7d11".into())
        );
    }

    #[test]
    fn test_product_filter() {
        let id: ProductId = "3f2504e0-4f89-41d3-9a0c-0305e82c3301".parse().unwrap();
        assert_eq!(
            product_filter(&ProductRef::Id(id)),
            ("id", "eq.3f2504e0-4f89-41d3-9a0c-0305e82c3301".to_string())
        );
        assert_eq!(
            product_filter(&ProductRef::parse("gmt-master")),
            ("name", "ilike.*gmt-master*".to_string())
        );
    }

    #[test]
    fn test_slug_cache_key_ignores_case() {
        assert_eq!(
            cache_id(&ProductRef::parse("GMT-Master")),
            cache_id(&ProductRef::parse("gmt-master"))
        );
    }
}
