//! Home page route handler.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use crate::error::Result;
use crate::routes::products::{ProductView, views};
use crate::state::AppState;

/// Home page payload.
#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub featured: Vec<ProductView>,
}

/// Featured products for the home page.
///
/// GET /api/home
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeResponse>> {
    let products = state.data().list_products().await?;
    Ok(Json(HomeResponse {
        featured: views(maison_core::catalog::featured(&products)),
    }))
}
