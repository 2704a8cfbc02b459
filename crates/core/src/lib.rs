//! Maison Core - Shared domain types and catalog logic.
//!
//! This crate provides the types and pure algorithms used across the Maison
//! components:
//! - `storefront` - Public JSON storefront and admin API
//! - `cli` - Command-line tools for catalog inspection and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no access to the hosted data service. Everything here can be
//! exercised synchronously in tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices and emails
//! - [`product`] - Catalog product records and admin drafts
//! - [`catalog`] - Facet filtering and sorting of product lists
//! - [`product_ref`] - Resolution of product route parameters (id or slug)
//! - [`cart`] - Cart lines and checkout order summaries
//! - [`boutique`] - Boutique records and search

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod boutique;
pub mod cart;
pub mod catalog;
pub mod product;
pub mod product_ref;
pub mod types;

pub use boutique::{Boutique, BoutiqueDraft};
pub use cart::{CartLine, OrderSummary};
pub use catalog::{CatalogFilter, Facets, PriceRange, SortKey};
pub use product::{Product, ProductDraft};
pub use product_ref::ProductRef;
pub use types::*;
