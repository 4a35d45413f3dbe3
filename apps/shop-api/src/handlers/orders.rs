//! Order endpoints: checkout entry points, history, receipts.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::capture::CaptureService;
use crate::services::checkout::CheckoutService;
use crate::services::receipt::render_receipt;
use crate::state::AppState;
use haven_core::Order;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub phone_number: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub checkout_request_id: Option<String>,
    pub total_cents: i64,
    pub status: haven_core::OrderStatus,
}

impl From<Order> for CheckoutResponse {
    fn from(order: Order) -> Self {
        CheckoutResponse {
            order_id: order.id,
            checkout_request_id: order.checkout_request_id,
            total_cents: order.total_cents,
            status: order.status,
        }
    }
}

/// POST /api/orders/checkout — push-payment (M-Pesa) checkout.
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<CheckoutResponse>)> {
    let service = CheckoutService::new(state.db.clone(), state.push_gateway.clone());
    let order = service.checkout(&user.user_id, &req.phone_number).await?;

    Ok((StatusCode::ACCEPTED, Json(order.into())))
}

#[derive(Debug, Serialize)]
pub struct RemoteOrderResponse {
    pub remote_order_id: String,
}

/// POST /api/orders/paypal — open a capture-flow remote order.
pub async fn create_paypal_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<(StatusCode, Json<RemoteOrderResponse>)> {
    let service = CaptureService::new(state.db.clone(), state.capture_gateway.clone());
    let remote_order_id = service.create_remote_order(&user.user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(RemoteOrderResponse { remote_order_id }),
    ))
}

/// POST /api/orders/paypal/:remote_id/capture — capture and finalize.
pub async fn capture_paypal_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(remote_id): Path<String>,
) -> ApiResult<Json<CheckoutResponse>> {
    let service = CaptureService::new(state.db.clone(), state.capture_gateway.clone());
    let order = service.capture_and_finalize(&user.user_id, &remote_id).await?;

    Ok(Json(order.into()))
}

/// GET /api/orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<Order>>> {
    let orders = state.db.orders().list_for_user(&user.user_id).await?;
    Ok(Json(orders))
}

/// GET /api/orders/:id
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Order>> {
    let order = state
        .db
        .orders()
        .get_for_user(&id, &user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {}", id)))?;

    Ok(Json(order))
}

/// GET /api/orders/:id/receipt — downloadable plain-text receipt.
pub async fn download_receipt(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let order = state
        .db
        .orders()
        .get_for_user(&id, &user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {}", id)))?;

    let lines = state.db.orders().lines(&order.id).await?;
    let payment = state.db.orders().payment_for_order(&order.id).await?;

    let bytes = render_receipt(&order, &lines, payment.as_ref())?;

    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"receipt-{}.txt\"", order.id),
        ),
    ];

    Ok((headers, bytes).into_response())
}
