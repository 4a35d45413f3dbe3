//! Capture-payment checkout (PayPal-style order-then-capture).
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_remote_order()                 capture_and_finalize()           │
//! │                                                                         │
//! │  total cart ──► gateway order ──► CaptureIntent snapshot                │
//! │  (no inventory touched)                                                 │
//! │                                        gateway capture                  │
//! │                                            │ COMPLETED                  │
//! │                                            ▼                            │
//! │                      re-read cart, compare against the snapshot         │
//! │                          │ match                  │ differs             │
//! │                          ▼                        ▼                     │
//! │                one tx: order(completed) +     CartChanged error,        │
//! │                items + reserve + claim        nothing finalized         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unlike the push flow, inventory is only touched after the funds are
//! captured. The snapshot re-validation closes the window in which the
//! customer edits the cart between approval and capture.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::gateway::{CaptureGateway, CaptureOutcome};
use crate::services::{price_cart, reserve_stock};
use haven_core::{CaptureIntent, CoreError, Order, OrderItem, OrderStatus};
use haven_db::{
    generate_order_id, generate_order_item_id, CartRepository, Database, OrderRepository,
};

/// The capture-payment checkout service.
pub struct CaptureService {
    db: Database,
    gateway: Arc<dyn CaptureGateway>,
}

impl CaptureService {
    pub fn new(db: Database, gateway: Arc<dyn CaptureGateway>) -> Self {
        CaptureService { db, gateway }
    }

    /// Opens a remote order for the user's current cart total and records
    /// the snapshot. No local inventory or order state changes.
    pub async fn create_remote_order(&self, user_id: &str) -> ApiResult<String> {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .map_err(haven_db::DbError::from)?;

        let items = CartRepository::unpaid_for_user_tx(&mut conn, user_id).await?;
        let cart = price_cart(&mut conn, items).await?;
        drop(conn);

        let remote_order_id = self.gateway.create_order(cart.total).await?;

        self.db
            .orders()
            .insert_capture_intent(&CaptureIntent {
                remote_order_id: remote_order_id.clone(),
                user_id: user_id.to_string(),
                total_cents: cart.total.cents(),
                lines_digest: cart.lines_digest(),
                created_at: Utc::now(),
            })
            .await?;

        info!(%remote_order_id, user_id = %user_id, total = %cart.total, "Capture order opened");
        Ok(remote_order_id)
    }

    /// Captures the remote order and, if the funds completed, finalizes
    /// the purchase locally in one transaction.
    pub async fn capture_and_finalize(
        &self,
        user_id: &str,
        remote_order_id: &str,
    ) -> ApiResult<Order> {
        let outcome = self.gateway.capture(remote_order_id).await?;

        if let CaptureOutcome::NotCompleted(status) = outcome {
            return Err(CoreError::PaymentNotCompleted { status }.into());
        }

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(haven_db::DbError::from)?;

        let intent = OrderRepository::capture_intent_tx(&mut tx, remote_order_id)
            .await?
            .filter(|intent| intent.user_id == user_id)
            .ok_or_else(|| {
                ApiError::NotFound(format!("No payment in progress for {}", remote_order_id))
            })?;

        // Re-validate the cart against the snapshot the customer approved.
        // The digest check catches line swaps that leave the total intact.
        let items = CartRepository::unpaid_for_user_tx(&mut tx, user_id).await?;
        let cart = price_cart(&mut tx, items).await?;

        if cart.total.cents() != intent.total_cents || cart.lines_digest() != intent.lines_digest {
            return Err(CoreError::CartChanged {
                expected_cents: intent.total_cents,
                actual_cents: cart.total.cents(),
            }
            .into());
        }

        reserve_stock(&mut tx, &cart.stock_lines()).await?;

        let order = Order {
            id: generate_order_id(),
            user_id: user_id.to_string(),
            total_cents: cart.total.cents(),
            status: OrderStatus::Completed,
            checkout_request_id: None,
            paypal_order_id: Some(remote_order_id.to_string()),
            created_at: Utc::now(),
        };
        OrderRepository::insert_tx(&mut tx, &order).await?;

        for (item, _) in &cart.items {
            if !CartRepository::claim_tx(&mut tx, &item.id).await? {
                return Err(ApiError::Conflict(
                    "Cart was claimed by another checkout".to_string(),
                ));
            }

            OrderRepository::add_item_tx(
                &mut tx,
                &OrderItem {
                    id: generate_order_item_id(),
                    order_id: order.id.clone(),
                    cart_item_id: item.id.clone(),
                },
            )
            .await?;
        }

        OrderRepository::delete_capture_intent_tx(&mut tx, remote_order_id).await?;

        tx.commit().await.map_err(haven_db::DbError::from)?;

        info!(order_id = %order.id, %remote_order_id, "Capture order finalized");
        Ok(order)
    }
}
