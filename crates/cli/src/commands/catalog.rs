//! Catalog commands.
//!
//! # Seed File
//!
//! ```yaml
//! products:
//!   - name: Submariner Date
//!     subtitle: Oystersteel
//!     price: 10250
//!     category: Submariner
//!     images:
//!       - https://cdn.maison.example/submariner.jpg
//! boutiques:
//!   - name: Maison Geneva
//!     address: Rue du Rhone 10, Geneva
//!     latitude: 46.2044
//!     longitude: 6.1432
//! ```

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;

use maison_core::{BoutiqueDraft, CatalogFilter, Email, Facets, ProductDraft, SortKey};
use maison_storefront::supabase::AuthClient;

use super::{CliError, data_client, supabase_config};

/// List products the way the storefront collection page would.
///
/// # Errors
///
/// Returns an error if the sort key is unknown or the catalog cannot be read.
pub async fn list(
    categories: Vec<String>,
    sort: &str,
    search: Option<String>,
) -> Result<(), CliError> {
    let filter = CatalogFilter {
        categories,
        sort: sort.parse::<SortKey>()?,
        search,
        ..CatalogFilter::default()
    };

    let config = supabase_config()?;
    let products = data_client(&config).list_products().await?;
    let facets = Facets::from_products(&products);
    let listed = filter.apply(&products);

    tracing::info!(
        shown = listed.len(),
        total = products.len(),
        categories = ?facets.categories,
        "Catalog"
    );
    for product in &listed {
        tracing::info!(
            "  {}  {:<32} {:>14}  {}",
            product.id,
            product.name,
            product.formatted_price(),
            product.category.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// A product entry in a seed file.
///
/// `price` may be written as a number or a quoted decimal.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub price: serde_yaml::Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl SeedProduct {
    /// Validate into a draft with the same rules as the admin form.
    ///
    /// # Errors
    ///
    /// Returns `CliError::InvalidProduct` if the name or price is invalid.
    pub fn into_draft(self) -> Result<ProductDraft, CliError> {
        let price = match &self.price {
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::String(s) => s.clone(),
            _ => String::new(),
        };
        ProductDraft::from_form(
            &self.name,
            self.subtitle.as_deref().unwrap_or_default(),
            &price,
            self.description.as_deref().unwrap_or_default(),
            self.category.as_deref().unwrap_or_default(),
            &self.images.join(","),
        )
        .map_err(|source| CliError::InvalidProduct {
            name: self.name,
            source,
        })
    }
}

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub products: Vec<SeedProduct>,
    pub boutiques: Vec<BoutiqueDraft>,
}

impl SeedFile {
    /// Parse and validate every entry before anything is written.
    ///
    /// # Errors
    ///
    /// Returns the first invalid entry.
    pub fn parse(content: &str) -> Result<(Vec<ProductDraft>, Vec<BoutiqueDraft>), CliError> {
        let file: Self = serde_yaml::from_str(content)?;
        let products = file
            .products
            .into_iter()
            .map(SeedProduct::into_draft)
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(bad) = file.boutiques.iter().find(|b| !b.is_valid()) {
            return Err(CliError::InvalidBoutique(bad.name.clone()));
        }
        Ok((products, file.boutiques))
    }
}

/// Rows written by a seed run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub products: usize,
    pub boutiques: usize,
}

/// Sign in as an admin and insert every entry of a seed file.
///
/// # Errors
///
/// Returns an error if the file is invalid, no password is available, the
/// credentials are rejected, or a write fails. Rows written before a failed
/// write are kept.
pub async fn seed(
    file_path: &str,
    email: &str,
    password: Option<String>,
) -> Result<SeedReport, CliError> {
    let content = tokio::fs::read_to_string(Path::new(file_path))
        .await
        .map_err(|source| CliError::Io {
            path: file_path.to_string(),
            source,
        })?;
    let (products, boutiques) = SeedFile::parse(&content)?;
    tracing::info!(
        products = products.len(),
        boutiques = boutiques.len(),
        "Seed file validated"
    );

    let email = Email::parse(email)?;
    let password = password
        .or_else(|| std::env::var("MAISON_ADMIN_PASSWORD").ok())
        .map(SecretString::from)
        .ok_or(CliError::MissingEnvVar("MAISON_ADMIN_PASSWORD"))?;

    let config = supabase_config()?;
    let session = AuthClient::new(&config)
        .sign_in_with_password(&email, &password)
        .await?;
    let token = SecretString::from(session.access_token);
    tracing::info!(user_id = %session.user.id, "Signed in");

    let data = data_client(&config);
    let mut report = SeedReport::default();
    for draft in &products {
        let product = data.create_product(draft, &token).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "Product created");
        report.products += 1;
    }
    for draft in &boutiques {
        let boutique = data.create_boutique(draft, &token).await?;
        tracing::info!(boutique_id = %boutique.id, name = %boutique.name, "Boutique created");
        report.boutiques += 1;
    }
    Ok(report)
}
