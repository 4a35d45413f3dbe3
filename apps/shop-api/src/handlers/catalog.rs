//! Catalog reads.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use haven_core::Shoe;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ShoePage {
    pub shoes: Vec<Shoe>,
    pub total: i64,
}

/// GET /api/products/shoes
pub async fn list_shoes(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<ShoePage>> {
    let limit = page.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = page.offset.unwrap_or(0).max(0);

    let shoes = state.db.shoes().list(limit, offset).await?;
    let total = state.db.shoes().count().await?;

    Ok(Json(ShoePage { shoes, total }))
}

/// GET /api/products/shoes/:id
pub async fn get_shoe(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Shoe>> {
    let shoe = state
        .db
        .shoes()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shoe not found: {}", id)))?;

    Ok(Json(shoe))
}
