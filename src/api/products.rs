use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::{AppState, graph_store::StoredProduct, http::AppError};

#[derive(Debug, Deserialize)]
pub struct ProductLookup {
    pub source_url: String,
}

pub async fn get_product(
    State(state): State<AppState>,
    Query(lookup): Query<ProductLookup>,
) -> Result<Json<StoredProduct>, AppError> {
    if lookup.source_url.is_empty() {
        return Err(AppError::bad_request("source_url must be non-empty".to_string()));
    }
    state
        .products
        .get_product(&lookup.source_url)
        .await
        .map_err(AppError::persistence)?
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("no product for {}", lookup.source_url)))
}
