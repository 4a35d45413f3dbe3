//! # Service Layer
//!
//! Orchestration between the repositories and the payment gateways:
//!
//! - [`checkout`] — the push-payment flow: reserve stock, create the
//!   pending order, fire the STK push, and apply webhook confirmations.
//! - [`capture`] — the order-then-capture flow (PayPal).
//! - [`receipt`] — renders the downloadable receipt for completed orders.

pub mod capture;
pub mod checkout;
pub mod receipt;

use haven_core::{CartItem, CoreError, Money, Shoe, StockLine};
use haven_db::{DbResult, ShoeRepository};
use sqlx::SqliteConnection;

use crate::error::{ApiError, ApiResult};

/// A priced cart: the unpaid lines with their shoes and the grand total.
pub(crate) struct PricedCart {
    pub items: Vec<(CartItem, Shoe)>,
    pub total: Money,
}

impl PricedCart {
    pub fn stock_lines(&self) -> Vec<StockLine> {
        self.items
            .iter()
            .map(|(item, _)| StockLine::new(item.shoe_id.clone(), item.quantity))
            .collect()
    }

    /// Canonical encoding of the cart lines, stable under reordering.
    ///
    /// Two carts encode to the same string exactly when they hold the same
    /// lines at the same prices; this is what lets capture detect edits
    /// that happen to leave the total unchanged.
    pub fn lines_digest(&self) -> String {
        let mut lines: Vec<String> = self
            .items
            .iter()
            .map(|(item, shoe)| {
                format!(
                    "{}:{}:{}:{}",
                    item.shoe_id,
                    item.size,
                    item.quantity,
                    shoe.price_cents
                )
            })
            .collect();
        lines.sort_unstable();
        lines.join("|")
    }
}

/// Joins cart items to their shoes and totals the cart inside the
/// caller's transaction. An empty cart is a domain error here; callers
/// that tolerate it check before calling.
pub(crate) async fn price_cart(
    conn: &mut SqliteConnection,
    items: Vec<CartItem>,
) -> ApiResult<PricedCart> {
    if items.is_empty() {
        return Err(CoreError::EmptyCart.into());
    }

    let mut priced = Vec::with_capacity(items.len());
    for item in items {
        let shoe = ShoeRepository::get_by_id_tx(conn, &item.shoe_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Shoe not found: {}", item.shoe_id)))?;
        priced.push((item, shoe));
    }

    let total = Money::checked_sum(
        priced
            .iter()
            .map(|(item, shoe)| shoe.price().checked_mul_qty(item.quantity))
            .collect::<Option<Vec<_>>>()
            .ok_or(CoreError::TotalOverflow)?,
    )
    .ok_or(CoreError::TotalOverflow)?;

    Ok(PricedCart {
        items: priced,
        total,
    })
}

/// Reserves stock for every line, all-or-nothing.
///
/// On the first line that cannot be fulfilled this returns
/// `InsufficientStock` naming the shoe and what is left; the caller rolls
/// the transaction back, which undoes the lines already reserved.
pub(crate) async fn reserve_stock(
    conn: &mut SqliteConnection,
    lines: &[StockLine],
) -> ApiResult<()> {
    for line in lines {
        if !ShoeRepository::try_reserve_tx(conn, &line.shoe_id, line.quantity).await? {
            let (name, available) = ShoeRepository::availability_tx(conn, &line.shoe_id)
                .await?
                .unwrap_or_else(|| (line.shoe_id.clone(), 0));

            return Err(CoreError::InsufficientStock {
                name,
                available,
                requested: line.quantity,
            }
            .into());
        }
    }

    Ok(())
}

/// Returns reserved stock, line by line. Runs in the same transaction as
/// the cancellation that triggered it.
pub(crate) async fn release_stock(
    conn: &mut SqliteConnection,
    lines: &[StockLine],
) -> DbResult<()> {
    for line in lines {
        ShoeRepository::release_tx(conn, &line.shoe_id, line.quantity).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn line(shoe_id: &str, size: &str, quantity: i64, price_cents: i64) -> (CartItem, Shoe) {
        (
            CartItem {
                id: format!("line-{shoe_id}"),
                user_id: "u-1".to_string(),
                shoe_id: shoe_id.to_string(),
                size: size.to_string(),
                quantity,
                paid: false,
                created_at: Utc::now(),
            },
            Shoe {
                id: shoe_id.to_string(),
                name: shoe_id.to_string(),
                brand: "B".to_string(),
                description: String::new(),
                price_cents,
                details: String::new(),
                sizes: "40,41,42".to_string(),
                image: String::new(),
                rating: 4.0,
                stock: 10,
            },
        )
    }

    fn cart_of(items: Vec<(CartItem, Shoe)>) -> PricedCart {
        let total = Money::checked_sum(
            items
                .iter()
                .map(|(item, shoe)| shoe.price().checked_mul_qty(item.quantity).unwrap()),
        )
        .unwrap();
        PricedCart { items, total }
    }

    #[test]
    fn test_lines_digest_ignores_line_order() {
        let a = cart_of(vec![line("s-1", "42", 1, 100), line("s-2", "41", 2, 200)]);
        let b = cart_of(vec![line("s-2", "41", 2, 200), line("s-1", "42", 1, 100)]);
        assert_eq!(a.lines_digest(), b.lines_digest());
    }

    #[test]
    fn test_lines_digest_distinguishes_equal_totals() {
        // Same grand total, different shoes.
        let a = cart_of(vec![line("s-1", "42", 1, 300)]);
        let b = cart_of(vec![line("s-2", "42", 1, 300)]);
        assert_eq!(a.total, b.total);
        assert_ne!(a.lines_digest(), b.lines_digest());
    }
}
