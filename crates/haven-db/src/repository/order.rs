//! # Order Repository
//!
//! Database operations for orders, order items, payments, and capture
//! intents.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CHECKOUT (one transaction)                                         │
//! │     └── insert_tx() → Order { status: Pending }                        │
//! │     └── add_item_tx() per cart line                                    │
//! │     └── set_checkout_request_id_tx() once the gateway accepts          │
//! │                                                                         │
//! │  2. CONFIRMATION (webhook, one transaction)                            │
//! │     └── complete_if_pending_tx() → Completed  + insert_payment_tx()    │
//! │     └── cancel_if_pending_tx()   → Cancelled  + stock release          │
//! │                                                                         │
//! │  Both transitions carry `WHERE status = 'pending'` so a redelivered    │
//! │  confirmation affects zero rows and becomes a logged no-op.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use haven_core::{CaptureIntent, Order, OrderItem, OrderLine, OrderStatus, Payment};

const ORDER_COLUMNS: &str =
    "id, user_id, total_cents, status, checkout_request_id, paypal_order_id, created_at";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order owned by a specific user.
    pub async fn get_for_user(&self, id: &str, user_id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Lists a user's orders, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Looks an order up by push-payment tracking id, inside the caller's
    /// transaction. The webhook handler resolves confirmations through this.
    pub async fn find_by_checkout_request_id_tx(
        conn: &mut SqliteConnection,
        checkout_request_id: &str,
    ) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE checkout_request_id = ?1"
        ))
        .bind(checkout_request_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(order)
    }

    /// Fully-joined lines of an order: order_items → cart_items → shoes.
    ///
    /// Quantities come from the frozen cart line; prices from the shoe row
    /// (the catalog is append-only in this system, prices do not mutate).
    pub async fn lines_tx(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT s.id AS shoe_id,
                   s.name AS shoe_name,
                   c.size AS size,
                   c.quantity AS quantity,
                   s.price_cents AS unit_price_cents
            FROM order_items oi
            JOIN cart_items c ON c.id = oi.cart_item_id
            JOIN shoes s ON s.id = c.shoe_id
            WHERE oi.order_id = ?1
            ORDER BY c.created_at
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(lines)
    }

    /// Pool-based variant of [`Self::lines_tx`] for read-only consumers
    /// (receipts, order detail).
    pub async fn lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let mut conn = self.pool.acquire().await?;
        Self::lines_tx(&mut conn, order_id).await
    }

    // =========================================================================
    // Checkout-transaction writes
    // =========================================================================

    /// Inserts an order inside the caller's transaction.
    pub async fn insert_tx(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, total_cents = %order.total_cents, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, total_cents, status,
                checkout_request_id, paypal_order_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.total_cents)
        .bind(order.status)
        .bind(&order.checkout_request_id)
        .bind(&order.paypal_order_id)
        .bind(order.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts an order item inside the caller's transaction.
    pub async fn add_item_tx(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, cart_item_id)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.cart_item_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Persists the gateway tracking id on a freshly-created order.
    pub async fn set_checkout_request_id_tx(
        conn: &mut SqliteConnection,
        order_id: &str,
        checkout_request_id: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET checkout_request_id = ?2 WHERE id = ?1",
        )
        .bind(order_id)
        .bind(checkout_request_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", order_id));
        }

        Ok(())
    }

    // =========================================================================
    // Confirmation transitions (conditional, idempotent)
    // =========================================================================

    /// Transitions an order pending → completed.
    ///
    /// Returns false when the order was already terminal — the duplicate-
    /// confirmation signal.
    pub async fn complete_if_pending_tx(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<bool> {
        Self::transition_if_pending_tx(conn, order_id, OrderStatus::Completed).await
    }

    /// Transitions an order pending → cancelled.
    pub async fn cancel_if_pending_tx(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<bool> {
        Self::transition_if_pending_tx(conn, order_id, OrderStatus::Cancelled).await
    }

    async fn transition_if_pending_tx(
        conn: &mut SqliteConnection,
        order_id: &str,
        to: OrderStatus,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(to)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Records the push-payment confirmation inside the caller's
    /// transaction. The UNIQUE(order_id) constraint backs up the
    /// conditional transition: a second Payment for the same order can
    /// never be inserted.
    pub async fn insert_payment_tx(
        conn: &mut SqliteConnection,
        payment: &Payment,
    ) -> DbResult<()> {
        debug!(order_id = %payment.order_id, mpesa_code = %payment.mpesa_code, "Recording payment");

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_id, mpesa_code, amount_cents, phone_number, transaction_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(&payment.mpesa_code)
        .bind(payment.amount_cents)
        .bind(&payment.phone_number)
        .bind(payment.transaction_date)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets the payment record for an order, if one exists.
    pub async fn payment_for_order(&self, order_id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, order_id, mpesa_code, amount_cents, phone_number, transaction_date
            FROM payments
            WHERE order_id = ?1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    // =========================================================================
    // Capture intents
    // =========================================================================

    /// Records the cart snapshot taken when a capture-flow remote order is
    /// opened.
    pub async fn insert_capture_intent(&self, intent: &CaptureIntent) -> DbResult<()> {
        debug!(remote_order_id = %intent.remote_order_id, total_cents = %intent.total_cents, "Recording capture intent");

        sqlx::query(
            r#"
            INSERT INTO capture_intents (remote_order_id, user_id, total_cents, lines_digest, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&intent.remote_order_id)
        .bind(&intent.user_id)
        .bind(intent.total_cents)
        .bind(&intent.lines_digest)
        .bind(intent.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches the capture intent for a remote order id inside the
    /// caller's transaction.
    pub async fn capture_intent_tx(
        conn: &mut SqliteConnection,
        remote_order_id: &str,
    ) -> DbResult<Option<CaptureIntent>> {
        let intent = sqlx::query_as::<_, CaptureIntent>(
            r#"
            SELECT remote_order_id, user_id, total_cents, lines_digest, created_at
            FROM capture_intents
            WHERE remote_order_id = ?1
            "#,
        )
        .bind(remote_order_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(intent)
    }

    /// Deletes a consumed capture intent inside the caller's transaction.
    pub async fn delete_capture_intent_tx(
        conn: &mut SqliteConnection,
        remote_order_id: &str,
    ) -> DbResult<()> {
        sqlx::query("DELETE FROM capture_intents WHERE remote_order_id = ?1")
            .bind(remote_order_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}

/// Generates a new order ID.
pub fn generate_order_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new order item ID.
pub fn generate_order_item_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new payment ID.
pub fn generate_payment_id() -> String {
    Uuid::new_v4().to_string()
}
