//! End-to-end checkout tests against the in-memory database with stub
//! payment gateways.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use haven_core::{CoreError, Money, OrderStatus, Shoe, User};
use haven_db::{generate_shoe_id, generate_user_id, Database, DbConfig};
use haven_shop_api::error::ApiError;
use haven_shop_api::gateway::{
    CaptureGateway, CaptureOutcome, GatewayError, GatewayResult, PushAccepted, PushPaymentGateway,
};
use haven_shop_api::services::capture::CaptureService;
use haven_shop_api::services::checkout::{CheckoutService, ConfirmOutcome, StkCallbackEnvelope};

// =============================================================================
// Stub gateways
// =============================================================================

/// Accepts every push and hands out sequential tracking ids.
struct AcceptingPush {
    counter: AtomicUsize,
}

impl AcceptingPush {
    fn new() -> Arc<Self> {
        Arc::new(AcceptingPush {
            counter: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PushPaymentGateway for AcceptingPush {
    async fn initiate_push(
        &self,
        _phone: &str,
        _amount: Money,
        _account_ref: &str,
    ) -> GatewayResult<PushAccepted> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(PushAccepted {
            checkout_request_id: format!("ws_CO_{n}"),
        })
    }
}

/// Declines every push.
struct DecliningPush;

#[async_trait]
impl PushPaymentGateway for DecliningPush {
    async fn initiate_push(
        &self,
        _phone: &str,
        _amount: Money,
        _account_ref: &str,
    ) -> GatewayResult<PushAccepted> {
        Err(GatewayError::Rejected("insufficient balance".to_string()))
    }
}

/// Capture gateway with a scripted capture outcome.
struct StubCapture {
    outcome: CaptureOutcome,
}

#[async_trait]
impl CaptureGateway for StubCapture {
    async fn create_order(&self, _amount: Money) -> GatewayResult<String> {
        Ok("PAYPAL-ORDER-1".to_string())
    }

    async fn capture(&self, _remote_order_id: &str) -> GatewayResult<CaptureOutcome> {
        Ok(self.outcome.clone())
    }
}

// =============================================================================
// Fixtures
// =============================================================================

async fn setup_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn seed_user(db: &Database) -> String {
    let user = User {
        id: generate_user_id(),
        email: format!("{}@example.com", uuid::Uuid::new_v4()),
        password_hash: Some("argon2-hash".to_string()),
        created_at: Utc::now(),
    };
    db.users().insert(&user).await.unwrap();
    user.id
}

async fn seed_shoe(db: &Database, name: &str, price_cents: i64, stock: i64) -> String {
    let shoe = Shoe {
        id: generate_shoe_id(),
        name: name.to_string(),
        brand: "TestBrand".to_string(),
        description: "A test shoe".to_string(),
        price_cents,
        details: "Leather".to_string(),
        sizes: "40,41,42".to_string(),
        image: "shoe.png".to_string(),
        rating: 4.5,
        stock,
    };
    db.shoes().insert(&shoe).await.unwrap();
    shoe.id
}

async fn stock_of(db: &Database, shoe_id: &str) -> i64 {
    db.shoes().get_by_id(shoe_id).await.unwrap().unwrap().stock
}

fn success_callback(checkout_request_id: &str, amount_shillings: u64) -> StkCallbackEnvelope {
    serde_json::from_value(json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "mr-1",
                "CheckoutRequestID": checkout_request_id,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        { "Name": "Amount", "Value": amount_shillings },
                        { "Name": "MpesaReceiptNumber", "Value": "SHX1AB2CD3" },
                        { "Name": "TransactionDate", "Value": 20260830143000u64 },
                        { "Name": "PhoneNumber", "Value": 254712345678u64 }
                    ]
                }
            }
        }
    }))
    .unwrap()
}

fn failure_callback(checkout_request_id: &str) -> StkCallbackEnvelope {
    serde_json::from_value(json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "mr-1",
                "CheckoutRequestID": checkout_request_id,
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user"
            }
        }
    }))
    .unwrap()
}

// =============================================================================
// Push-payment flow
// =============================================================================

#[tokio::test]
async fn checkout_reserves_stock_and_creates_pending_order() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    db.carts().add_line(&user, &shoe, "42", 2).await.unwrap();

    let service = CheckoutService::new(db.clone(), AcceptingPush::new());
    let order = service.checkout(&user, "0712345678").await.unwrap();

    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_cents, 900_000);
    assert!(order.checkout_request_id.is_some());

    // Stock reserved, cart claimed.
    assert_eq!(stock_of(&db, &shoe).await, 3);
    assert!(db.carts().unpaid_for_user(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn insufficient_stock_aborts_with_no_changes() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe_a = seed_shoe(&db, "Shoe A", 100_000, 5).await;
    let shoe_b = seed_shoe(&db, "Shoe B", 200_000, 0).await;
    db.carts().add_line(&user, &shoe_a, "41", 2).await.unwrap();
    db.carts().add_line(&user, &shoe_b, "42", 1).await.unwrap();

    let service = CheckoutService::new(db.clone(), AcceptingPush::new());
    let err = service.checkout(&user, "0712345678").await.unwrap_err();

    // The error names the insufficient shoe and what is left.
    match err {
        ApiError::Conflict(msg) => {
            assert!(msg.contains("Shoe B"), "got: {msg}");
            assert!(msg.contains("available 0"), "got: {msg}");
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing changed: A's reservation rolled back with the transaction.
    assert_eq!(stock_of(&db, &shoe_a).await, 5);
    assert_eq!(stock_of(&db, &shoe_b).await, 0);
    assert_eq!(db.carts().unpaid_for_user(&user).await.unwrap().len(), 2);
    assert!(db.orders().list_for_user(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn gateway_decline_rolls_everything_back() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    db.carts().add_line(&user, &shoe, "42", 2).await.unwrap();

    let service = CheckoutService::new(db.clone(), Arc::new(DecliningPush));
    let err = service.checkout(&user, "0712345678").await.unwrap_err();
    assert!(matches!(err, ApiError::Gateway(_)));

    // No order, stock untouched, cart still unpaid.
    assert!(db.orders().list_for_user(&user).await.unwrap().is_empty());
    assert_eq!(stock_of(&db, &shoe).await, 5);
    assert_eq!(db.carts().unpaid_for_user(&user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_phone_fails_before_any_mutation() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    db.carts().add_line(&user, &shoe, "42", 1).await.unwrap();

    let service = CheckoutService::new(db.clone(), AcceptingPush::new());
    let err = service.checkout(&user, "12345").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidRequest(_)));

    assert_eq!(stock_of(&db, &shoe).await, 5);
    assert!(db.orders().list_for_user(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_cart_cannot_check_out() {
    let db = setup_db().await;
    let user = seed_user(&db).await;

    let service = CheckoutService::new(db.clone(), AcceptingPush::new());
    let err = service.checkout(&user, "0712345678").await.unwrap_err();

    match err {
        ApiError::Conflict(msg) => assert_eq!(msg, CoreError::EmptyCart.to_string()),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn success_confirmation_completes_order_once() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    db.carts().add_line(&user, &shoe, "42", 2).await.unwrap();

    let service = CheckoutService::new(db.clone(), AcceptingPush::new());
    let order = service.checkout(&user, "0712345678").await.unwrap();
    let crid = order.checkout_request_id.clone().unwrap();

    let callback = success_callback(&crid, 9000).body.stk_callback;
    let outcome = service.confirm(&callback).await.unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Completed {
            order_id: order.id.clone()
        }
    );

    let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);

    let payment = db
        .orders()
        .payment_for_order(&order.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.mpesa_code, "SHX1AB2CD3");
    assert_eq!(payment.amount_cents, 900_000);

    // No double decrement: stock reflects the checkout reservation only.
    assert_eq!(stock_of(&db, &shoe).await, 3);

    // Redelivery is a no-op.
    let outcome = service.confirm(&callback).await.unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Duplicate {
            order_id: order.id.clone()
        }
    );
    assert_eq!(stock_of(&db, &shoe).await, 3);
}

#[tokio::test]
async fn failure_confirmation_cancels_and_restores_stock() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    db.carts().add_line(&user, &shoe, "42", 2).await.unwrap();

    let service = CheckoutService::new(db.clone(), AcceptingPush::new());
    let order = service.checkout(&user, "0712345678").await.unwrap();
    let crid = order.checkout_request_id.clone().unwrap();
    assert_eq!(stock_of(&db, &shoe).await, 3);

    let callback = failure_callback(&crid).body.stk_callback;
    let outcome = service.confirm(&callback).await.unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Cancelled {
            order_id: order.id.clone()
        }
    );

    let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&db, &shoe).await, 5);

    // A late duplicate failure callback releases nothing twice.
    let outcome = service.confirm(&callback).await.unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Duplicate {
            order_id: order.id.clone()
        }
    );
    assert_eq!(stock_of(&db, &shoe).await, 5);
}

#[tokio::test]
async fn unusable_metadata_leaves_order_pending_and_recoverable() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    db.carts().add_line(&user, &shoe, "42", 2).await.unwrap();

    let service = CheckoutService::new(db.clone(), AcceptingPush::new());
    let order = service.checkout(&user, "0712345678").await.unwrap();
    let crid = order.checkout_request_id.clone().unwrap();

    // A success callback whose Amount is not a number.
    let envelope: StkCallbackEnvelope = serde_json::from_value(json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "mr-1",
                "CheckoutRequestID": crid,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        { "Name": "Amount", "Value": "nine thousand" },
                        { "Name": "MpesaReceiptNumber", "Value": "SHX1AB2CD3" },
                        { "Name": "TransactionDate", "Value": 20260830143000u64 },
                        { "Name": "PhoneNumber", "Value": 254712345678u64 }
                    ]
                }
            }
        }
    }))
    .unwrap();

    let outcome = service.confirm(&envelope.body.stk_callback).await.unwrap();
    match outcome {
        ConfirmOutcome::Malformed { order_id, reason } => {
            assert_eq!(order_id, order.id);
            assert!(reason.contains("Amount"), "got: {reason}");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    // Nothing transitioned: the order is still pending, the reservation
    // still held, and no payment row exists.
    let stored = db.orders().get_by_id(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(stock_of(&db, &shoe).await, 3);
    assert!(db
        .orders()
        .payment_for_order(&order.id)
        .await
        .unwrap()
        .is_none());

    // A later well-formed confirmation still completes the order.
    let callback = success_callback(&crid, 9000).body.stk_callback;
    let outcome = service.confirm(&callback).await.unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Completed {
            order_id: order.id.clone()
        }
    );
}

#[tokio::test]
async fn confirmation_failure_surfaces_instead_of_acknowledging() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    db.carts().add_line(&user, &shoe, "42", 2).await.unwrap();

    let service = CheckoutService::new(db.clone(), AcceptingPush::new());
    let order = service.checkout(&user, "0712345678").await.unwrap();
    let crid = order.checkout_request_id.clone().unwrap();

    // The database goes away before the callback lands. Confirmation
    // must error (the webhook then answers 5xx and the provider
    // redelivers) rather than report a settled outcome for a payload
    // that was never applied.
    db.pool().close().await;

    let callback = success_callback(&crid, 9000).body.stk_callback;
    let err = service.confirm(&callback).await.unwrap_err();
    assert!(matches!(err, ApiError::Internal(_)), "got: {err}");
}

#[tokio::test]
async fn unknown_tracking_id_is_acknowledged() {
    let db = setup_db().await;
    let service = CheckoutService::new(db.clone(), AcceptingPush::new());

    let callback = success_callback("ws_CO_unknown", 100).body.stk_callback;
    let outcome = service.confirm(&callback).await.unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::UnknownOrder {
            checkout_request_id: "ws_CO_unknown".to_string()
        }
    );
}

#[tokio::test]
async fn second_checkout_of_claimed_cart_aborts() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    db.carts().add_line(&user, &shoe, "42", 1).await.unwrap();

    let service = CheckoutService::new(db.clone(), AcceptingPush::new());
    service.checkout(&user, "0712345678").await.unwrap();

    // The cart is claimed now; a second attempt sees it empty.
    let err = service.checkout(&user, "0712345678").await.unwrap_err();
    match err {
        ApiError::Conflict(msg) => assert_eq!(msg, CoreError::EmptyCart.to_string()),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(stock_of(&db, &shoe).await, 4);
}

// =============================================================================
// Capture flow
// =============================================================================

#[tokio::test]
async fn completed_capture_finalizes_in_one_step() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    db.carts().add_line(&user, &shoe, "42", 2).await.unwrap();

    let service = CaptureService::new(
        db.clone(),
        Arc::new(StubCapture {
            outcome: CaptureOutcome::Completed,
        }),
    );

    let remote_id = service.create_remote_order(&user).await.unwrap();
    // Opening the remote order touches no inventory.
    assert_eq!(stock_of(&db, &shoe).await, 5);

    let order = service.capture_and_finalize(&user, &remote_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.total_cents, 900_000);
    assert_eq!(order.paypal_order_id.as_deref(), Some(remote_id.as_str()));

    assert_eq!(stock_of(&db, &shoe).await, 3);
    assert!(db.carts().unpaid_for_user(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn non_completed_capture_leaves_no_order() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    db.carts().add_line(&user, &shoe, "42", 2).await.unwrap();

    let service = CaptureService::new(
        db.clone(),
        Arc::new(StubCapture {
            outcome: CaptureOutcome::NotCompleted("PENDING".to_string()),
        }),
    );

    let remote_id = service.create_remote_order(&user).await.unwrap();
    let err = service
        .capture_and_finalize(&user, &remote_id)
        .await
        .unwrap_err();

    match err {
        ApiError::Conflict(msg) => assert!(msg.contains("PENDING"), "got: {msg}"),
        other => panic!("unexpected error: {other}"),
    }

    assert!(db.orders().list_for_user(&user).await.unwrap().is_empty());
    assert_eq!(stock_of(&db, &shoe).await, 5);
    assert_eq!(db.carts().unpaid_for_user(&user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn cart_edited_after_approval_is_rejected() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    let line = db.carts().add_line(&user, &shoe, "42", 1).await.unwrap();

    let service = CaptureService::new(
        db.clone(),
        Arc::new(StubCapture {
            outcome: CaptureOutcome::Completed,
        }),
    );

    let remote_id = service.create_remote_order(&user).await.unwrap();

    // Customer bumps the quantity between approval and capture.
    db.carts().set_quantity(&line, &user, 2).await.unwrap();

    let err = service
        .capture_and_finalize(&user, &remote_id)
        .await
        .unwrap_err();

    match err {
        ApiError::Conflict(msg) => assert!(msg.contains("changed"), "got: {msg}"),
        other => panic!("unexpected error: {other}"),
    }

    assert!(db.orders().list_for_user(&user).await.unwrap().is_empty());
    assert_eq!(stock_of(&db, &shoe).await, 5);
}

#[tokio::test]
async fn cart_swapped_at_the_same_total_is_rejected() {
    let db = setup_db().await;
    let user = seed_user(&db).await;
    let shoe_a = seed_shoe(&db, "Air Zoom", 450_000, 5).await;
    let shoe_b = seed_shoe(&db, "Court Vision", 450_000, 5).await;
    let line = db.carts().add_line(&user, &shoe_a, "42", 1).await.unwrap();

    let service = CaptureService::new(
        db.clone(),
        Arc::new(StubCapture {
            outcome: CaptureOutcome::Completed,
        }),
    );

    let remote_id = service.create_remote_order(&user).await.unwrap();

    // Customer replaces the approved shoe with a different one that
    // happens to cost exactly the same.
    db.carts().remove(&line, &user).await.unwrap();
    db.carts().add_line(&user, &shoe_b, "41", 1).await.unwrap();

    let err = service
        .capture_and_finalize(&user, &remote_id)
        .await
        .unwrap_err();

    match err {
        ApiError::Conflict(msg) => assert!(msg.contains("changed"), "got: {msg}"),
        other => panic!("unexpected error: {other}"),
    }

    // The swap was caught: nothing finalized, no stock moved.
    assert!(db.orders().list_for_user(&user).await.unwrap().is_empty());
    assert_eq!(stock_of(&db, &shoe_a).await, 5);
    assert_eq!(stock_of(&db, &shoe_b).await, 5);
    assert_eq!(db.carts().unpaid_for_user(&user).await.unwrap().len(), 1);
}
