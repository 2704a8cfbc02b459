//! Integration tests for catalog listing and product detail resolution.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use maison_core::{CatalogFilter, Facets, Price, PriceRange, ProductRef, SortKey};
use maison_integration_tests::catalog;

// =============================================================================
// Filtering
// =============================================================================

fn subsets(values: &[&str]) -> Vec<Vec<String>> {
    (0..1_u32 << values.len())
        .map(|mask| {
            values
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, v)| (*v).to_string())
                .collect()
        })
        .collect()
}

#[test]
fn test_every_filter_combination_yields_matching_subset() {
    let products = catalog();
    let prices = [
        PriceRange::default(),
        PriceRange {
            min: Some(Price::from_cents(1_000_000)),
            max: None,
        },
        PriceRange {
            min: None,
            max: Some(Price::from_cents(1_025_000)),
        },
        PriceRange {
            min: Some(Price::from_cents(1_025_000)),
            max: Some(Price::from_cents(1_025_000)),
        },
    ];
    let searches = [None, Some("date".to_string()), Some("  ".to_string())];

    let mut checked = 0;
    for categories in subsets(&["Datejust", "Submariner", "Day-Date"]) {
        for materials in subsets(&["Oystersteel", "Everose gold"]) {
            for sizes in subsets(&["41mm", "36mm"]) {
                for price in prices {
                    for search in &searches {
                        let filter = CatalogFilter {
                            categories: categories.clone(),
                            materials: materials.clone(),
                            sizes: sizes.clone(),
                            price,
                            search: search.clone(),
                            sort: SortKey::Relevance,
                        };
                        let listed = filter.apply(&products);
                        assert!(listed.len() <= products.len());
                        for product in &listed {
                            assert!(products.contains(product));
                            assert!(filter.matches(product));
                            if !categories.is_empty() {
                                assert!(categories.contains(product.category.as_ref().unwrap()));
                            }
                            assert!(price.contains(product.price));
                        }
                        checked += 1;
                    }
                }
            }
        }
    }
    assert_eq!(checked, 8 * 4 * 4 * 4 * 3);
}

#[test]
fn test_facets_combine_with_and() {
    let products = catalog();
    let filter = CatalogFilter {
        categories: vec!["Datejust".to_string(), "Submariner".to_string()],
        materials: vec!["Oystersteel".to_string()],
        ..CatalogFilter::default()
    };
    let names: Vec<_> = filter.apply(&products).into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["Submariner Date", "Datejust 36"]);
}

#[test]
fn test_search_is_case_insensitive_substring() {
    let filter = CatalogFilter {
        search: Some("DATEJUST".to_string()),
        ..CatalogFilter::default()
    };
    assert_eq!(filter.apply(&catalog()).len(), 2);
}

// =============================================================================
// Sorting
// =============================================================================

#[test]
fn test_price_descending_is_reverse_of_ascending() {
    let products = catalog();
    let ascending = CatalogFilter {
        sort: SortKey::PriceAscending,
        ..CatalogFilter::default()
    }
    .apply(&products);
    let descending = CatalogFilter {
        sort: SortKey::PriceDescending,
        ..CatalogFilter::default()
    }
    .apply(&products);

    assert!(ascending.windows(2).all(|w| w[0].price <= w[1].price));
    let reversed: Vec<_> = ascending.into_iter().rev().collect();
    assert_eq!(descending, reversed);
}

#[test]
fn test_relevance_keeps_source_order() {
    let products = catalog();
    assert_eq!(CatalogFilter::default().apply(&products), products);
}

#[test]
fn test_name_sort_ignores_case() {
    let listed = CatalogFilter {
        sort: SortKey::Name,
        ..CatalogFilter::default()
    }
    .apply(&catalog());
    let names: Vec<_> = listed.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "Cellini Moonphase",
            "Datejust 36",
            "datejust 41",
            "Day-Date 40",
            "GMT-Master II",
            "Submariner Date"
        ]
    );
}

#[test]
fn test_facets_from_catalog() {
    let facets = Facets::from_products(&catalog());
    assert_eq!(facets.categories.len(), 4);
    assert!(facets.materials.contains("Oystersteel"));
    assert_eq!(facets.min_price, Some(Price::from_cents(895_000)));
    assert_eq!(facets.max_price, Some(Price::from_cents(3_885_000)));
}

// =============================================================================
// Product references
// =============================================================================

#[test]
fn test_uuid_reference_returns_exact_record() {
    let products = catalog();
    let target = &products[3];
    let reference = ProductRef::parse(&target.id.to_string());
    assert!(matches!(reference, ProductRef::Id(_)));
    assert_eq!(reference.resolve(&products), Some(target));

    let upper = ProductRef::parse(&target.id.to_string().to_uppercase());
    assert_eq!(upper.resolve(&products), Some(target));
}

#[test]
fn test_slug_reference_returns_first_match_or_none() {
    let products = catalog();
    let reference = ProductRef::parse("DATEJUST");
    assert!(matches!(reference, ProductRef::Slug(_)));
    assert_eq!(reference.resolve(&products).unwrap().name, "Datejust 36");

    assert!(ProductRef::parse("daytona").resolve(&products).is_none());
}
