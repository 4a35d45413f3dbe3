//! # Shoe Repository
//!
//! Catalog reads and the stock-movement primitives used by checkout.
//!
//! ## Stock Movement Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read stock, compare, write absolute value                   │
//! │     (two checkouts can both pass the read and oversell)                │
//! │                                                                         │
//! │  ✅ CORRECT: conditional delta update                                  │
//! │     UPDATE shoes SET stock = stock - ?2                                │
//! │     WHERE id = ?1 AND stock >= ?2                                      │
//! │                                                                         │
//! │  rows_affected == 0 means the reservation lost the race or the         │
//! │  stock was simply insufficient; either way the caller rolls back.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use haven_core::Shoe;

/// Repository for shoe catalog and inventory operations.
#[derive(Debug, Clone)]
pub struct ShoeRepository {
    pool: SqlitePool,
}

impl ShoeRepository {
    /// Creates a new ShoeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShoeRepository { pool }
    }

    /// Gets a shoe by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shoe>> {
        let shoe = sqlx::query_as::<_, Shoe>(
            r#"
            SELECT id, name, brand, description, price_cents, details,
                   sizes, image, rating, stock
            FROM shoes
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shoe)
    }

    /// Gets a shoe by ID inside the caller's transaction.
    pub async fn get_by_id_tx(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Shoe>> {
        let shoe = sqlx::query_as::<_, Shoe>(
            r#"
            SELECT id, name, brand, description, price_cents, details,
                   sizes, image, rating, stock
            FROM shoes
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(shoe)
    }

    /// Lists shoes, newest rowid first, for the paginated catalog.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Shoe>> {
        let shoes = sqlx::query_as::<_, Shoe>(
            r#"
            SELECT id, name, brand, description, price_cents, details,
                   sizes, image, rating, stock
            FROM shoes
            ORDER BY rowid
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(shoes)
    }

    /// Counts catalog entries (for pagination metadata).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shoes")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts a shoe (seeding and tests).
    pub async fn insert(&self, shoe: &Shoe) -> DbResult<()> {
        debug!(id = %shoe.id, name = %shoe.name, "Inserting shoe");

        sqlx::query(
            r#"
            INSERT INTO shoes (
                id, name, brand, description, price_cents, details,
                sizes, image, rating, stock
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&shoe.id)
        .bind(&shoe.name)
        .bind(&shoe.brand)
        .bind(&shoe.description)
        .bind(shoe.price_cents)
        .bind(&shoe.details)
        .bind(&shoe.sizes)
        .bind(&shoe.image)
        .bind(shoe.rating)
        .bind(shoe.stock)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Transaction-scoped stock moves
    // =========================================================================

    /// Attempts to reserve `quantity` units of a shoe inside the caller's
    /// transaction.
    ///
    /// Returns `Ok(true)` when the conditional decrement succeeded and
    /// `Ok(false)` when stock was insufficient (nothing changed). The
    /// caller is expected to roll the surrounding transaction back on
    /// `false`, which also undoes any earlier lines it reserved.
    pub async fn try_reserve_tx(
        conn: &mut SqliteConnection,
        shoe_id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        debug!(shoe_id = %shoe_id, quantity = %quantity, "Reserving stock");

        let result = sqlx::query(
            r#"
            UPDATE shoes
            SET stock = stock - ?2
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(shoe_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Releases a prior reservation inside the caller's transaction.
    ///
    /// The compensating action for `try_reserve_tx`; must be called at most
    /// once per reservation (caller discipline, no dedup here).
    pub async fn release_tx(
        conn: &mut SqliteConnection,
        shoe_id: &str,
        quantity: i64,
    ) -> DbResult<()> {
        debug!(shoe_id = %shoe_id, quantity = %quantity, "Releasing stock");

        let result = sqlx::query(
            r#"
            UPDATE shoes
            SET stock = stock + ?2
            WHERE id = ?1
            "#,
        )
        .bind(shoe_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shoe", shoe_id));
        }

        Ok(())
    }

    /// Current (name, stock) of a shoe, read inside the caller's
    /// transaction. Used to build the insufficient-stock report.
    pub async fn availability_tx(
        conn: &mut SqliteConnection,
        shoe_id: &str,
    ) -> DbResult<Option<(String, i64)>> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT name, stock FROM shoes WHERE id = ?1",
        )
        .bind(shoe_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(row)
    }
}

/// Helper to generate a new shoe ID.
pub fn generate_shoe_id() -> String {
    Uuid::new_v4().to_string()
}
