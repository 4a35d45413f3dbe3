//! # Cart Repository
//!
//! Unpaid cart lines per user.
//!
//! ## Claiming
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Two checkouts racing over the same cart:                               │
//! │                                                                         │
//! │  Attempt A: UPDATE cart_items SET paid = 1 WHERE id = ? AND paid = 0   │
//! │             → rows_affected = 1  (claimed)                              │
//! │  Attempt B: same statement, same row                                    │
//! │             → rows_affected = 0  (cart already claimed → abort)         │
//! │                                                                         │
//! │  The claim happens inside the checkout transaction, so an aborted      │
//! │  attempt leaves the lines unpaid for the winner that never was.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use haven_core::CartItem;

/// Repository for cart operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Gets all unpaid cart lines for a user.
    pub async fn unpaid_for_user(&self, user_id: &str) -> DbResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, user_id, shoe_id, size, quantity, paid, created_at
            FROM cart_items
            WHERE user_id = ?1 AND paid = 0
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all unpaid cart lines for a user inside the caller's
    /// transaction. The checkout orchestrator reads the cart through this
    /// so the snapshot it acts on is the one it claims.
    pub async fn unpaid_for_user_tx(
        conn: &mut SqliteConnection,
        user_id: &str,
    ) -> DbResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, user_id, shoe_id, size, quantity, paid, created_at
            FROM cart_items
            WHERE user_id = ?1 AND paid = 0
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Gets a single unpaid line owned by the user.
    pub async fn get_unpaid(&self, id: &str, user_id: &str) -> DbResult<Option<CartItem>> {
        let item = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, user_id, shoe_id, size, quantity, paid, created_at
            FROM cart_items
            WHERE id = ?1 AND user_id = ?2 AND paid = 0
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Adds a line to the cart, folding into an existing unpaid line for
    /// the same (user, shoe, size) by bumping its quantity.
    ///
    /// Returns the id of the affected line.
    pub async fn add_line(
        &self,
        user_id: &str,
        shoe_id: &str,
        size: &str,
        quantity: i64,
    ) -> DbResult<String> {
        debug!(user_id = %user_id, shoe_id = %shoe_id, size = %size, quantity = %quantity, "Adding cart line");

        // Fold into an existing unpaid line first
        let result = sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = quantity + ?4
            WHERE user_id = ?1 AND shoe_id = ?2 AND size = ?3 AND paid = 0
            "#,
        )
        .bind(user_id)
        .bind(shoe_id)
        .bind(size)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            let id: String = sqlx::query_scalar(
                r#"
                SELECT id FROM cart_items
                WHERE user_id = ?1 AND shoe_id = ?2 AND size = ?3 AND paid = 0
                "#,
            )
            .bind(user_id)
            .bind(shoe_id)
            .bind(size)
            .fetch_one(&self.pool)
            .await?;
            return Ok(id);
        }

        // No existing line: insert a fresh one. A race against another
        // insert for the same key trips the partial unique index and
        // surfaces as UniqueViolation.
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO cart_items (id, user_id, shoe_id, size, quantity, paid, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(shoe_id)
        .bind(size)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Sets the quantity of an unpaid line owned by the user.
    pub async fn set_quantity(&self, id: &str, user_id: &str, quantity: i64) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = ?3
            WHERE id = ?1 AND user_id = ?2 AND paid = 0
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart item", id));
        }

        Ok(())
    }

    /// Removes an unpaid line owned by the user.
    pub async fn remove(&self, id: &str, user_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM cart_items
            WHERE id = ?1 AND user_id = ?2 AND paid = 0
            "#,
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart item", id));
        }

        Ok(())
    }

    /// Claims an unpaid line for an order inside the caller's transaction.
    ///
    /// Conditional on `paid = 0`: returns false when another checkout
    /// already claimed the line, in which case the caller must abort.
    pub async fn claim_tx(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items
            SET paid = 1
            WHERE id = ?1 AND paid = 0
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
