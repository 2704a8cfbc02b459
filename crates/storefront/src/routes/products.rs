//! Product route handlers.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use maison_core::{CatalogFilter, Facets, Price, PriceRange, Product, ProductRef, SortKey};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Product with its display fields.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub formatted_price: String,
    pub badge: Option<&'static str>,
    pub reference: String,
    /// Listing thumbnail.
    pub image: Option<String>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            formatted_price: product.formatted_price(),
            badge: product.badge(),
            reference: product.reference(),
            image: product.primary_image().map(str::to_string),
            product,
        }
    }
}

/// Convert a product list for display.
pub fn views(products: Vec<Product>) -> Vec<ProductView> {
    products.into_iter().map(ProductView::from).collect()
}

/// Listing query parameters. Facet values are comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub material: Option<String>,
    pub size: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
}

impl ListQuery {
    /// Build the catalog filter.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown sort key or a
    /// non-numeric price bound.
    pub fn into_filter(self) -> Result<CatalogFilter> {
        let sort = self
            .sort
            .as_deref()
            .map(SortKey::from_str)
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?
            .unwrap_or_default();

        Ok(CatalogFilter {
            categories: split_values(self.category.as_deref()),
            materials: split_values(self.material.as_deref()),
            sizes: split_values(self.size.as_deref()),
            price: PriceRange {
                min: parse_price("min_price", self.min_price.as_deref())?,
                max: parse_price("max_price", self.max_price.as_deref())?,
            },
            search: self.q.filter(|q| !q.is_empty()),
            sort,
        })
    }
}

fn split_values(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

fn parse_price(name: &str, raw: Option<&str>) -> Result<Option<Price>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => Decimal::from_str(value)
            .map(|amount| Some(Price::new(amount)))
            .map_err(|_| AppError::BadRequest(format!("{name} is not a number: {value}"))),
    }
}

/// Listing response.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub products: Vec<ProductView>,
    pub total: usize,
    pub active_facets: Vec<String>,
    pub sort: &'static str,
}

/// List products matching the filter.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let filter = query.into_filter()?;
    let products = state.data().list_products().await?;
    let matched = filter.apply(&products);

    Ok(Json(ListResponse {
        total: matched.len(),
        products: views(matched),
        active_facets: filter
            .active_facets()
            .into_iter()
            .map(String::from)
            .collect(),
        sort: filter.sort.as_str(),
    }))
}

/// Distinct facet values over the whole catalog.
///
/// GET /api/products/facets
#[instrument(skip(state))]
pub async fn facets(State(state): State<AppState>) -> Result<Json<Facets>> {
    let products = state.data().list_products().await?;
    Ok(Json(Facets::from_products(&products)))
}

/// Product detail by id or name slug.
///
/// GET /api/products/{reference}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<ProductView>> {
    let lookup = ProductRef::parse(&reference);
    state
        .data()
        .find_product(&lookup)
        .await?
        .map(|product| Json(ProductView::from(product)))
        .ok_or(AppError::ProductNotFound(reference))
}
