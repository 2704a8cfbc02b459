//! Catalog product records.
//!
//! [`Product`] mirrors a row of the `products` table as returned by the data
//! service. The storefront only ever holds read-through copies; writes go
//! through [`ProductDraft`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::types::{Price, ProductId};

/// Badge shown on featured products.
pub const FEATURED_BADGE: &str = "Featured";

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_featured: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Price,
    /// Case material, when the deployment stores it.
    #[serde(default)]
    pub material: Option<String>,
    /// Case diameter (e.g. `41mm`), when the deployment stores it.
    #[serde(default)]
    pub size: Option<String>,
}

impl Product {
    /// Price formatted for display (`$12,500.00`).
    #[must_use]
    pub fn formatted_price(&self) -> String {
        self.price.display()
    }

    /// Badge label for listing cards.
    #[must_use]
    pub const fn badge(&self) -> Option<&'static str> {
        if self.is_featured {
            Some(FEATURED_BADGE)
        } else {
            None
        }
    }

    /// Short catalog reference: the first group of the id, upper-cased.
    #[must_use]
    pub fn reference(&self) -> String {
        let id = self.id.to_string();
        id.split('-').next().unwrap_or(&id).to_uppercase()
    }

    /// First image, used as the listing thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Errors from validating admin product input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("name is required")]
    MissingName,
    #[error("price is not a number: {0}")]
    InvalidPrice(String),
    #[error("price cannot be negative")]
    NegativePrice,
}

/// Column values written when an admin creates or edits a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub subtitle: Option<String>,
    pub price: Price,
    pub description: Option<String>,
    pub category: Option<String>,
    pub images: Vec<String>,
}

impl ProductDraft {
    /// Build a draft from raw form fields.
    ///
    /// `images` is a comma-separated list of URLs; entries are trimmed and
    /// blank entries dropped. Blank optional text fields become `None`.
    ///
    /// # Errors
    ///
    /// Returns a [`DraftError`] if the name is blank or the price is not a
    /// non-negative decimal.
    pub fn from_form(
        name: &str,
        subtitle: &str,
        price: &str,
        description: &str,
        category: &str,
        images: &str,
    ) -> Result<Self, DraftError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DraftError::MissingName);
        }

        let amount: Decimal = price
            .trim()
            .parse()
            .map_err(|_| DraftError::InvalidPrice(price.to_string()))?;
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DraftError::NegativePrice);
        }

        Ok(Self {
            name: name.to_string(),
            subtitle: non_blank(subtitle),
            price: Price::new(amount),
            description: non_blank(description),
            category: non_blank(category),
            images: parse_image_list(images),
        })
    }
}

/// Split a comma-separated image list, trimming entries and dropping blanks.
#[must_use]
pub fn parse_image_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
        .collect()
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "id": "3f2504e0-4f89-41d3-9a0c-0305e82c3301",
            "name": "Submariner Date",
            "subtitle": "Oyster, 41 mm, Oystersteel",
            "description": null,
            "images": null,
            "category": "Professional",
            "is_featured": null,
            "created_at": "2024-05-01T10:00:00+00:00",
            "price": 10250
        })
    }

    #[test]
    fn test_deserialize_row_with_nulls() {
        let product: Product = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(product.name, "Submariner Date");
        assert!(product.images.is_empty());
        assert!(!product.is_featured);
        assert_eq!(product.material, None);
        assert_eq!(product.formatted_price(), "$10,250.00");
    }

    #[test]
    fn test_reference_and_badge() {
        let mut product: Product = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(product.reference(), "3F2504E0");
        assert_eq!(product.badge(), None);
        product.is_featured = true;
        assert_eq!(product.badge(), Some(FEATURED_BADGE));
    }

    #[test]
    fn test_parse_image_list() {
        assert_eq!(
            parse_image_list(" https://a/1.jpg ,https://a/2.jpg,, "),
            vec!["https://a/1.jpg".to_string(), "https://a/2.jpg".to_string()]
        );
        assert!(parse_image_list("").is_empty());
    }

    #[test]
    fn test_draft_from_form() {
        let draft = ProductDraft::from_form(
            " Datejust 36 ",
            "",
            "8950.50",
            "Classic",
            "Classic",
            "https://img/1.jpg",
        )
        .unwrap();
        assert_eq!(draft.name, "Datejust 36");
        assert_eq!(draft.subtitle, None);
        assert_eq!(draft.price, Price::from_cents(895_050));
        assert_eq!(draft.images.len(), 1);
    }

    #[test]
    fn test_draft_rejections() {
        assert_eq!(
            ProductDraft::from_form("  ", "", "1", "", "", ""),
            Err(DraftError::MissingName)
        );
        assert!(matches!(
            ProductDraft::from_form("GMT", "", "abc", "", "", ""),
            Err(DraftError::InvalidPrice(_))
        ));
        assert_eq!(
            ProductDraft::from_form("GMT", "", "-5", "", "", ""),
            Err(DraftError::NegativePrice)
        );
    }
}
