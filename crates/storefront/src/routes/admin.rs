//! Admin catalog management route handlers.
//!
//! Every handler requires a signed-in user whose profile carries the admin
//! flag. Writes go out with the admin's own token, so row-level policies on
//! the backend apply as well.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use maison_core::{Boutique, BoutiqueDraft, BoutiqueId, Product, ProductDraft, ProductId};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::products::{ProductView, views};
use crate::state::AppState;

/// Product form as submitted by the admin UI.
///
/// `price` may be sent as a string or a number; `images` is a comma-separated
/// list of URLs.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub name: String,
    pub subtitle: String,
    pub price: serde_json::Value,
    pub description: String,
    pub category: String,
    pub images: String,
}

impl ProductForm {
    /// Validate into a draft.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the name is blank or the price is
    /// not a non-negative number.
    pub fn into_draft(self) -> Result<ProductDraft> {
        let price = match self.price {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        ProductDraft::from_form(
            &self.name,
            &self.subtitle,
            &price,
            &self.description,
            &self.category,
            &self.images,
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

fn validate_boutique(draft: BoutiqueDraft) -> Result<BoutiqueDraft> {
    if draft.is_valid() {
        Ok(draft)
    } else {
        Err(AppError::BadRequest(
            "boutique needs a name and valid coordinates".to_string(),
        ))
    }
}

// =============================================================================
// Products
// =============================================================================

/// GET /api/admin/products
#[instrument(skip_all)]
pub async fn list_products(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<ProductView>>> {
    Ok(Json(views(state.data().list_products().await?)))
}

/// POST /api/admin/products
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let draft = form.into_draft()?;
    let product: Product = state
        .data()
        .create_product(&draft, &admin.access_token())
        .await?;
    tracing::info!(product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(ProductView::from(product))))
}

/// PUT /api/admin/products/{id}
#[instrument(skip(state, admin, form), fields(admin_id = %admin.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Json(form): Json<ProductForm>,
) -> Result<Json<ProductView>> {
    let draft = form.into_draft()?;
    let product = state
        .data()
        .update_product(id, &draft, &admin.access_token())
        .await?;
    tracing::info!(product_id = %id, "Product updated");
    Ok(Json(ProductView::from(product)))
}

/// DELETE /api/admin/products/{id}
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    state
        .data()
        .delete_product(id, &admin.access_token())
        .await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Boutiques
// =============================================================================

/// GET /api/admin/boutiques
#[instrument(skip_all)]
pub async fn list_boutiques(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<Boutique>>> {
    Ok(Json(state.data().list_boutiques().await?))
}

/// POST /api/admin/boutiques
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_boutique(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(draft): Json<BoutiqueDraft>,
) -> Result<(StatusCode, Json<Boutique>)> {
    let draft = validate_boutique(draft)?;
    let boutique = state
        .data()
        .create_boutique(&draft, &admin.access_token())
        .await?;
    tracing::info!(boutique_id = %boutique.id, "Boutique created");
    Ok((StatusCode::CREATED, Json(boutique)))
}

/// PUT /api/admin/boutiques/{id}
#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id))]
pub async fn update_boutique(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BoutiqueId>,
    Json(draft): Json<BoutiqueDraft>,
) -> Result<Json<Boutique>> {
    let draft = validate_boutique(draft)?;
    let boutique = state
        .data()
        .update_boutique(id, &draft, &admin.access_token())
        .await?;
    tracing::info!(boutique_id = %id, "Boutique updated");
    Ok(Json(boutique))
}

/// DELETE /api/admin/boutiques/{id}
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete_boutique(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<BoutiqueId>,
) -> Result<StatusCode> {
    state
        .data()
        .delete_boutique(id, &admin.access_token())
        .await?;
    tracing::info!(boutique_id = %id, "Boutique deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub products: usize,
    pub featured_products: usize,
    pub boutiques: usize,
}

impl DashboardStats {
    #[must_use]
    pub fn from_catalog(products: &[Product], boutiques: &[Boutique]) -> Self {
        Self {
            products: products.len(),
            featured_products: products.iter().filter(|p| p.is_featured).count(),
            boutiques: boutiques.len(),
        }
    }
}

/// GET /api/admin/stats
#[instrument(skip_all)]
pub async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<DashboardStats>> {
    let (products, boutiques) =
        tokio::try_join!(state.data().list_products(), state.data().list_boutiques())?;
    Ok(Json(DashboardStats::from_catalog(&products, &boutiques)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use maison_core::Price;

    use super::*;

    fn form(price: serde_json::Value) -> ProductForm {
        ProductForm {
            name: "Sea-Dweller".to_string(),
            price,
            images: "https://a.example/1.jpg, ,https://a.example/2.jpg".to_string(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_form_accepts_string_or_number_price() {
        let from_string = form(serde_json::json!("13250.00")).into_draft().unwrap();
        let from_number = form(serde_json::json!(13250)).into_draft().unwrap();
        assert_eq!(from_string.price, Price::from_cents(1_325_000));
        assert_eq!(from_number.price, from_string.price);
        assert_eq!(from_string.images.len(), 2);
        assert_eq!(from_string.subtitle, None);
    }

    #[test]
    fn test_form_rejects_bad_input() {
        assert!(matches!(
            form(serde_json::Value::Null).into_draft(),
            Err(AppError::BadRequest(_))
        ));
        let unnamed = ProductForm {
            name: "  ".to_string(),
            ..form(serde_json::json!("100"))
        };
        assert!(matches!(unnamed.into_draft(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_boutique_validation() {
        let draft = BoutiqueDraft {
            name: "Geneva".to_string(),
            address: None,
            latitude: Some(46.2),
            longitude: Some(6.14),
        };
        assert!(validate_boutique(draft.clone()).is_ok());
        let off_map = BoutiqueDraft {
            latitude: Some(123.0),
            ..draft
        };
        assert!(validate_boutique(off_map).is_err());
    }

    #[test]
    fn test_dashboard_stats() {
        let mut featured: Product = serde_json::from_value(serde_json::json!({
            "id": "3f2a9c1e-8b7d-4e6f-a5c4-1d2e3f4a5b6c",
            "name": "Daytona",
            "price": 31500
        }))
        .unwrap();
        let plain = featured.clone();
        featured.is_featured = true;
        let stats = DashboardStats::from_catalog(&[featured, plain], &[]);
        assert_eq!(
            stats,
            DashboardStats {
                products: 2,
                featured_products: 1,
                boutiques: 0
            }
        );
    }
}
