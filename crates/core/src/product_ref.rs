//! Product detail route parameters.
//!
//! The product page accepts either a database id or a free-text slug such as
//! `gmt-master`. Only strings matching the strict UUID pattern (version digit
//! 0-5, RFC 4122 variant) are treated as ids; everything else is a slug
//! matched against product names.

use std::sync::LazyLock;

use regex::Regex;

use crate::product::Product;
use crate::types::ProductId;

static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-5][0-9a-f]{3}-[089ab][0-9a-f]{3}-[0-9a-f]{12}$",
    )
    .expect("UUID pattern is a valid regex")
});

/// A parsed product route parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductRef {
    /// Exact id lookup.
    Id(ProductId),
    /// Case-insensitive partial name lookup.
    Slug(String),
}

impl ProductRef {
    /// Classify a route parameter.
    #[must_use]
    pub fn parse(param: &str) -> Self {
        let param = param.trim();
        if UUID_PATTERN.is_match(param)
            && let Ok(id) = param.parse()
        {
            return Self::Id(id);
        }
        Self::Slug(param.to_string())
    }

    /// Whether `product` satisfies this reference.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::Id(id) => product.id == *id,
            Self::Slug(slug) => product.name.to_lowercase().contains(&slug.to_lowercase()),
        }
    }

    /// First product in `products` satisfying this reference.
    #[must_use]
    pub fn resolve<'a>(&self, products: &'a [Product]) -> Option<&'a Product> {
        products.iter().find(|product| self.matches(product))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Price;

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.parse().unwrap(),
            name: name.to_string(),
            subtitle: None,
            description: None,
            images: Vec::new(),
            category: None,
            is_featured: false,
            created_at: None,
            price: Price::from_cents(100),
            material: None,
            size: None,
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("3f2504e0-4f89-41d3-9a0c-0305e82c3301", "Submariner Date"),
            product("6f9619ff-8b86-4011-b42d-00c04fc964ff", "GMT-MASTER II"),
            product("7c9e6679-7425-40de-944b-e07fc1f90ae7", "GMT-Master II Root Beer"),
        ]
    }

    #[test]
    fn test_parse_uuid() {
        let reference = ProductRef::parse("6F9619FF-8B86-4011-B42D-00C04FC964FF");
        assert!(matches!(reference, ProductRef::Id(_)));
    }

    #[test]
    fn test_parse_rejects_non_strict_uuid_forms() {
        // Valid for uuid::Uuid::parse_str but not for the strict pattern
        assert!(matches!(
            ProductRef::parse("6f9619ff8b864011b42d00c04fc964ff"),
            ProductRef::Slug(_)
        ));
        // Version digit outside 0-5
        assert!(matches!(
            ProductRef::parse("6f9619ff-8b86-9011-b42d-00c04fc964ff"),
            ProductRef::Slug(_)
        ));
        // Variant nibble outside [089ab]
        assert!(matches!(
            ProductRef::parse("6f9619ff-8b86-4011-c42d-00c04fc964ff"),
            ProductRef::Slug(_)
        ));
    }

    #[test]
    fn test_resolve_existing_id_returns_exact_record() {
        let products = catalog();
        let found = ProductRef::parse("7c9e6679-7425-40de-944b-e07fc1f90ae7")
            .resolve(&products)
            .unwrap();
        assert_eq!(found.name, "GMT-Master II Root Beer");
    }

    #[test]
    fn test_resolve_slug_returns_first_case_insensitive_match() {
        let products = catalog();
        let found = ProductRef::parse("gmt-master").resolve(&products).unwrap();
        assert_eq!(found.name, "GMT-MASTER II");
    }

    #[test]
    fn test_resolve_missing() {
        let products = catalog();
        assert!(ProductRef::parse("daytona").resolve(&products).is_none());
        assert!(
            ProductRef::parse("00000000-0000-4000-8000-000000000000")
                .resolve(&products)
                .is_none()
        );
    }
}
