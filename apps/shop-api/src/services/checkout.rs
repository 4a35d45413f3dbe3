//! Push-payment checkout orchestrator.
//!
//! ## State machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   checkout()                       confirm()                            │
//! │                                                                         │
//! │   NEW ──reserve + claim──► PENDING ──result 0──► COMPLETED (+Payment)  │
//! │    │                          │                                         │
//! │    │ gateway declines         └──result ≠0──► CANCELLED (stock back)   │
//! │    ▼                                                                    │
//! │   rolled back (no order, stock untouched, cart unpaid)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `checkout` holds one transaction across the gateway call: commit only
//! on synchronous acceptance, so a declined or unreachable gateway leaves
//! no trace. `confirm` transitions are conditional on `status = 'pending'`,
//! making redelivered callbacks no-ops.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::gateway::PushPaymentGateway;
use crate::services::{price_cart, release_stock, reserve_stock};
use haven_core::{
    normalize_phone, CoreError, Money, Order, OrderItem, OrderStatus, Payment, StockLine,
};
use haven_db::{
    generate_order_id, generate_order_item_id, generate_payment_id, CartRepository, Database,
    OrderRepository,
};

const CALLBACK_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// The push-payment checkout service.
pub struct CheckoutService {
    db: Database,
    gateway: Arc<dyn PushPaymentGateway>,
}

/// What a processed callback turned out to be. The webhook handler
/// acknowledges all of these; they differ only in logging and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// First successful confirmation; order completed, payment recorded.
    Completed { order_id: String },
    /// First failure confirmation; order cancelled, stock released.
    Cancelled { order_id: String },
    /// The order was already terminal; nothing changed.
    Duplicate { order_id: String },
    /// No order carries this tracking id.
    UnknownOrder { checkout_request_id: String },
    /// A success callback whose metadata was unusable. The order stays
    /// pending; redelivering the same payload would fail the same way.
    Malformed { order_id: String, reason: String },
}

impl CheckoutService {
    pub fn new(db: Database, gateway: Arc<dyn PushPaymentGateway>) -> Self {
        CheckoutService { db, gateway }
    }

    /// Runs the checkout for a user's unpaid cart.
    ///
    /// On success the order is pending with its tracking id persisted, the
    /// stock reserved, and the cart claimed. Every failure before commit
    /// rolls all of that back.
    pub async fn checkout(&self, user_id: &str, raw_phone: &str) -> ApiResult<Order> {
        // Validation happens before any mutation.
        let phone = normalize_phone(raw_phone).map_err(ApiError::from)?;

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(haven_db::DbError::from)?;

        let items = CartRepository::unpaid_for_user_tx(&mut tx, user_id).await?;
        let cart = price_cart(&mut tx, items).await?;

        reserve_stock(&mut tx, &cart.stock_lines()).await?;

        let order = Order {
            id: generate_order_id(),
            user_id: user_id.to_string(),
            total_cents: cart.total.cents(),
            status: OrderStatus::Pending,
            checkout_request_id: None,
            paypal_order_id: None,
            created_at: Utc::now(),
        };
        OrderRepository::insert_tx(&mut tx, &order).await?;

        for (item, _) in &cart.items {
            if !CartRepository::claim_tx(&mut tx, &item.id).await? {
                // A concurrent checkout got this line first.
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

        // The gateway call rides inside the transaction: a decline or a
        // transport failure drops the tx and with it every change above.
        let account_ref = format!("Order_{}", order.id);
        let accepted = self
            .gateway
            .initiate_push(&phone, cart.total, &account_ref)
            .await?;

        OrderRepository::set_checkout_request_id_tx(
            &mut tx,
            &order.id,
            &accepted.checkout_request_id,
        )
        .await?;

        tx.commit().await.map_err(haven_db::DbError::from)?;

        info!(
            order_id = %order.id,
            checkout_request_id = %accepted.checkout_request_id,
            total = %cart.total,
            "Checkout accepted, awaiting payment confirmation"
        );

        Ok(Order {
            checkout_request_id: Some(accepted.checkout_request_id),
            ..order
        })
    }

    /// Applies an asynchronous payment confirmation.
    ///
    /// Idempotent: redelivered callbacks find the order already terminal
    /// and report [`ConfirmOutcome::Duplicate`]. Every settled disposition
    /// of the payload is a [`ConfirmOutcome`]; an `Err` means processing
    /// itself failed (the database was unavailable mid-confirm) and the
    /// same payload is worth redelivering.
    pub async fn confirm(&self, callback: &StkCallback) -> ApiResult<ConfirmOutcome> {
        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(haven_db::DbError::from)?;

        let order = match OrderRepository::find_by_checkout_request_id_tx(
            &mut tx,
            &callback.checkout_request_id,
        )
        .await?
        {
            Some(order) => order,
            None => {
                warn!(
                    checkout_request_id = %callback.checkout_request_id,
                    "Callback references no known order"
                );
                return Ok(ConfirmOutcome::UnknownOrder {
                    checkout_request_id: callback.checkout_request_id.clone(),
                });
            }
        };

        if callback.result_code == 0 {
            // Extract typed payment details before touching state so a
            // malformed callback fails without a half-applied transition.
            // A bad payload stays bad on redelivery, so it is reported as
            // an outcome the webhook acknowledges rather than an error.
            let details = match callback.payment_details() {
                Ok(details) => details,
                Err(e) => {
                    warn!(
                        order_id = %order.id,
                        error = %e,
                        "Success callback carries unusable metadata; order left pending"
                    );
                    return Ok(ConfirmOutcome::Malformed {
                        order_id: order.id,
                        reason: e.to_string(),
                    });
                }
            };

            if !OrderRepository::complete_if_pending_tx(&mut tx, &order.id).await? {
                info!(order_id = %order.id, "Duplicate success confirmation ignored");
                return Ok(ConfirmOutcome::Duplicate { order_id: order.id });
            }

            OrderRepository::insert_payment_tx(
                &mut tx,
                &Payment {
                    id: generate_payment_id(),
                    order_id: order.id.clone(),
                    mpesa_code: details.receipt_number,
                    amount_cents: details.amount.cents(),
                    phone_number: details.phone_number,
                    transaction_date: details.transaction_date,
                },
            )
            .await?;

            tx.commit().await.map_err(haven_db::DbError::from)?;

            info!(order_id = %order.id, "Order completed");
            Ok(ConfirmOutcome::Completed { order_id: order.id })
        } else {
            if !OrderRepository::cancel_if_pending_tx(&mut tx, &order.id).await? {
                info!(order_id = %order.id, "Duplicate failure confirmation ignored");
                return Ok(ConfirmOutcome::Duplicate { order_id: order.id });
            }

            // Give the reservation back in the same transaction as the
            // cancellation.
            let lines: Vec<StockLine> = OrderRepository::lines_tx(&mut tx, &order.id)
                .await?
                .into_iter()
                .map(|line| StockLine::new(line.shoe_id, line.quantity))
                .collect();
            release_stock(&mut tx, &lines).await?;

            tx.commit().await.map_err(haven_db::DbError::from)?;

            info!(
                order_id = %order.id,
                result_code = callback.result_code,
                desc = %callback.result_desc,
                "Order cancelled, stock released"
            );
            Ok(ConfirmOutcome::Cancelled { order_id: order.id })
        }
    }
}

// =============================================================================
// Callback wire format
// =============================================================================

/// The callback envelope the gateway posts: `Body.stkCallback.{...}`.
#[derive(Debug, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

/// The confirmation payload proper.
#[derive(Debug, Deserialize)]
pub struct StkCallback {
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,

    #[serde(rename = "ResultCode")]
    pub result_code: i64,

    #[serde(rename = "ResultDesc", default)]
    pub result_desc: String,

    /// Present only on success (result code 0).
    #[serde(rename = "CallbackMetadata")]
    pub metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item")]
    pub items: Vec<MetadataItem>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataItem {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Value", default)]
    pub value: serde_json::Value,
}

/// Typed payment details extracted from the success metadata.
#[derive(Debug, Clone)]
pub struct PaymentDetails {
    pub receipt_number: String,
    pub amount: Money,
    pub phone_number: String,
    pub transaction_date: DateTime<Utc>,
}

impl StkCallback {
    fn metadata_value(&self, field: &str) -> Result<&serde_json::Value, CoreError> {
        self.metadata
            .as_ref()
            .and_then(|m| m.items.iter().find(|item| item.name == field))
            .map(|item| &item.value)
            .ok_or_else(|| CoreError::MissingCallbackField {
                field: field.to_string(),
            })
    }

    fn string_field(&self, field: &str) -> Result<String, CoreError> {
        let value = self.metadata_value(field)?;
        match value {
            serde_json::Value::String(s) => Ok(s.clone()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            other => Err(CoreError::MalformedCallbackField {
                field: field.to_string(),
                reason: format!("expected string, got {}", other),
            }),
        }
    }

    /// Extracts the typed payment details; every missing or malformed
    /// metadata item is a distinct error naming the field.
    pub fn payment_details(&self) -> Result<PaymentDetails, CoreError> {
        let receipt_number = self.string_field("MpesaReceiptNumber")?;
        let phone_number = self.string_field("PhoneNumber")?;

        let amount = self
            .metadata_value("Amount")?
            .as_f64()
            .map(|shillings| Money::from_cents((shillings * 100.0).round() as i64))
            .ok_or_else(|| CoreError::MalformedCallbackField {
                field: "Amount".to_string(),
                reason: "expected a number".to_string(),
            })?;

        let raw_date = self.string_field("TransactionDate")?;
        let transaction_date = NaiveDateTime::parse_from_str(&raw_date, CALLBACK_DATE_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| CoreError::MalformedCallbackField {
                field: "TransactionDate".to_string(),
                reason: e.to_string(),
            })?;

        Ok(PaymentDetails {
            receipt_number,
            amount,
            phone_number,
            transaction_date,
        })
    }
}
