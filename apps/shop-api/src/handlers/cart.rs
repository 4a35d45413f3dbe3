//! Cart management, scoped to the authenticated user's unpaid lines.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use haven_core::{CartItem, CoreError, MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub shoe_id: String,
    pub size: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
}

fn validate_quantity(quantity: i64) -> ApiResult<()> {
    if quantity < 1 || quantity > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity,
            max: MAX_ITEM_QUANTITY,
        }
        .into());
    }
    Ok(())
}

/// GET /api/cart
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<CartResponse>> {
    let items = state.db.carts().unpaid_for_user(&user.user_id).await?;
    Ok(Json(CartResponse { items }))
}

/// POST /api/cart/items
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<CartItem>)> {
    validate_quantity(req.quantity)?;

    let shoe = state
        .db
        .shoes()
        .get_by_id(&req.shoe_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Shoe not found: {}", req.shoe_id)))?;

    if !shoe.sizes.split(',').any(|s| s.trim() == req.size) {
        return Err(ApiError::InvalidRequest(format!(
            "Size {} is not available for {}",
            req.size, shoe.name
        )));
    }

    // Advisory only; the binding check is the reservation at checkout.
    if !shoe.can_fulfil(req.quantity) {
        return Err(CoreError::InsufficientStock {
            name: shoe.name,
            available: shoe.stock,
            requested: req.quantity,
        }
        .into());
    }

    let existing = state.db.carts().unpaid_for_user(&user.user_id).await?;
    if existing.len() >= MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        }
        .into());
    }

    let line_id = state
        .db
        .carts()
        .add_line(&user.user_id, &req.shoe_id, &req.size, req.quantity)
        .await?;

    let item = state
        .db
        .carts()
        .get_unpaid(&line_id, &user.user_id)
        .await?
        .ok_or_else(|| ApiError::Internal("Cart line vanished after insert".to_string()))?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /api/cart/items/:id
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<Json<CartItem>> {
    validate_quantity(req.quantity)?;

    state
        .db
        .carts()
        .set_quantity(&id, &user.user_id, req.quantity)
        .await?;

    let item = state
        .db
        .carts()
        .get_unpaid(&id, &user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Cart item not found: {}", id)))?;

    Ok(Json(item))
}

/// DELETE /api/cart/items/:id
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.carts().remove(&id, &user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
