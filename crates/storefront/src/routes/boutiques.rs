//! Boutique locator route handler.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use maison_core::Boutique;
use maison_core::boutique::search;

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BoutiqueQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BoutiqueResponse {
    pub boutiques: Vec<Boutique>,
    pub total: usize,
}

/// List boutiques, optionally filtered by name or address.
///
/// GET /api/boutiques
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<BoutiqueQuery>,
) -> Result<Json<BoutiqueResponse>> {
    let all = state.data().list_boutiques().await?;
    let boutiques: Vec<Boutique> = match query.q.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => search(&all, term).into_iter().cloned().collect(),
        _ => all,
    };

    Ok(Json(BoutiqueResponse {
        total: boutiques.len(),
        boutiques,
    }))
}
