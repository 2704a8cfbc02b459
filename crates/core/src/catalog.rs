//! Collection listing: facet filtering and sorting.
//!
//! A [`CatalogFilter`] is applied to an in-memory product list in a single
//! pass. Facets combine with logical AND; within one facet any selected value
//! matches. An empty selection leaves the facet unconstrained.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::product::Product;
use crate::types::Price;

/// Sort order for the collection listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Keep the source order.
    #[default]
    Relevance,
    /// Price, lowest first.
    #[serde(rename = "price-low")]
    PriceAscending,
    /// Price, highest first. Exactly the reverse of [`SortKey::PriceAscending`].
    #[serde(rename = "price-high")]
    PriceDescending,
    /// Name, case-insensitive.
    Name,
}

impl SortKey {
    /// The query-string value for this key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::PriceAscending => "price-low",
            Self::PriceDescending => "price-high",
            Self::Name => "name",
        }
    }
}

/// Error for an unrecognized sort key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort key: {0}")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "relevance" => Ok(Self::Relevance),
            "price-low" => Ok(Self::PriceAscending),
            "price-high" => Ok(Self::PriceDescending),
            "name" => Ok(Self::Name),
            other => Err(UnknownSortKey(other.to_string())),
        }
    }
}

/// Inclusive price bounds. A missing bound is unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<Price>,
    pub max: Option<Price>,
}

impl PriceRange {
    /// Whether `price` falls inside the range.
    #[must_use]
    pub fn contains(&self, price: Price) -> bool {
        self.min.is_none_or(|min| price >= min) && self.max.is_none_or(|max| price <= max)
    }
}

/// Active facets and sort order for a collection listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub categories: Vec<String>,
    pub materials: Vec<String>,
    pub sizes: Vec<String>,
    pub price: PriceRange,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub sort: SortKey,
}

impl CatalogFilter {
    /// Whether `product` satisfies every active facet.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        facet_matches(&self.categories, product.category.as_deref())
            && facet_matches(&self.materials, product.material.as_deref())
            && facet_matches(&self.sizes, product.size.as_deref())
            && self.price.contains(product.price)
            && self.search_matches(&product.name)
    }

    fn search_matches(&self, name: &str) -> bool {
        match self.search.as_deref() {
            None | Some("") => true,
            Some(needle) => name.to_lowercase().contains(&needle.to_lowercase()),
        }
    }

    /// Filter then sort `products`, returning the listing order.
    #[must_use]
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let mut listed: Vec<Product> = products
            .iter()
            .filter(|product| self.matches(product))
            .cloned()
            .collect();
        sort_products(&mut listed, self.sort);
        listed
    }

    /// Values of every active facet, in display order.
    #[must_use]
    pub fn active_facets(&self) -> Vec<&str> {
        self.categories
            .iter()
            .chain(&self.materials)
            .chain(&self.sizes)
            .map(String::as_str)
            .collect()
    }
}

fn facet_matches(selected: &[String], value: Option<&str>) -> bool {
    selected.is_empty() || selected.iter().any(|s| s == value.unwrap_or_default())
}

/// Sort in place. All orders are stable.
pub fn sort_products(products: &mut [Product], key: SortKey) {
    match key {
        SortKey::Relevance => {}
        SortKey::PriceAscending => products.sort_by_key(|p| p.price),
        SortKey::PriceDescending => {
            products.sort_by_key(|p| p.price);
            products.reverse();
        }
        SortKey::Name => products.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        }),
    }
}

/// Distinct facet values present in a product list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Facets {
    pub categories: BTreeSet<String>,
    pub materials: BTreeSet<String>,
    pub sizes: BTreeSet<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
}

impl Facets {
    /// Collect the facet values offered by `products`.
    #[must_use]
    pub fn from_products(products: &[Product]) -> Self {
        let mut facets = Self::default();
        for product in products {
            if let Some(category) = &product.category {
                facets.categories.insert(category.clone());
            }
            if let Some(material) = &product.material {
                facets.materials.insert(material.clone());
            }
            if let Some(size) = &product.size {
                facets.sizes.insert(size.clone());
            }
            facets.min_price = Some(facets.min_price.map_or(product.price, |p| p.min(product.price)));
            facets.max_price = Some(facets.max_price.map_or(product.price, |p| p.max(product.price)));
        }
        facets
    }
}

/// Featured products, in source order.
#[must_use]
pub fn featured(products: &[Product]) -> Vec<Product> {
    products.iter().filter(|p| p.is_featured).cloned().collect()
}
