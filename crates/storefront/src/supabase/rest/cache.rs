//! Cache types for catalog reads.

use maison_core::{Boutique, Product};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    /// Product lookup by route parameter (id or slug).
    Product(String),
    Boutiques,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Vec<Product>),
    Product(Box<Product>),
    Boutiques(Vec<Boutique>),
}
