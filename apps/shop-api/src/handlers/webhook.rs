//! Gateway-facing payment confirmation webhook.
//!
//! The provider delivers at-least-once and retries on non-2xx. Every
//! settled disposition of a payload — applied, duplicate, unknown
//! tracking id, unusable metadata — is acknowledged with 200, because
//! redelivering those payloads changes nothing. A failure of our own
//! processing (the database unavailable mid-confirm) propagates as a
//! 5xx instead, so the provider redelivers and the order is not left
//! stranded pending.

use axum::extract::State;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiResult;
use crate::services::checkout::{CheckoutService, ConfirmOutcome, StkCallbackEnvelope};
use crate::state::AppState;

/// POST /api/orders/callback
pub async fn payment_callback(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<StkCallbackEnvelope>,
) -> ApiResult<Json<serde_json::Value>> {
    let callback = envelope.body.stk_callback;
    info!(
        checkout_request_id = %callback.checkout_request_id,
        result_code = callback.result_code,
        "Payment callback received"
    );

    let service = CheckoutService::new(state.db.clone(), state.push_gateway.clone());

    let body = match service.confirm(&callback).await? {
        ConfirmOutcome::Completed { order_id } | ConfirmOutcome::Cancelled { order_id } => {
            json!({ "ResultCode": 0, "ResultDesc": "Accepted", "order_id": order_id })
        }
        ConfirmOutcome::Duplicate { order_id } => {
            json!({ "ResultCode": 0, "ResultDesc": "Duplicate ignored", "order_id": order_id })
        }
        ConfirmOutcome::UnknownOrder {
            checkout_request_id,
        } => {
            json!({
                "ResultCode": 0,
                "ResultDesc": "Unknown order",
                "checkout_request_id": checkout_request_id,
            })
        }
        ConfirmOutcome::Malformed { order_id, reason } => {
            json!({
                "ResultCode": 0,
                "ResultDesc": format!("Unusable metadata: {reason}"),
                "order_id": order_id,
            })
        }
    };

    Ok(Json(body))
}
