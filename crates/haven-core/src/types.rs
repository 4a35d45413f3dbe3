//! # Domain Types
//!
//! Core domain types used throughout the Shoe Haven backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Shoe        │   │     Order       │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  price_cents    │   │  status         │   │  order_id (FK)  │       │
//! │  │  stock          │   │  total_cents    │   │  mpesa_code     │       │
//! │  │  sizes          │   │  tracking ids   │   │  amount_cents   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    CartItem     │   │   OrderItem     │   │  OrderStatus    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  user+shoe+size │   │  order ↔ cart   │   │  Pending        │       │
//! │  │  quantity, paid │   │  link row       │   │  Completed      │       │
//! │  └─────────────────┘   └─────────────────┘   │  Cancelled      │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! - Order owns OrderItems (cascade delete)
//! - OrderItem references (does not own) the originating CartItem
//! - Payment is owned by Order, created once, immutable after

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Shoe (product)
// =============================================================================

/// A shoe available in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shoe {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown in the catalog and on receipts.
    pub name: String,

    /// Brand name.
    pub brand: String,

    /// Catalog description.
    pub description: String,

    /// Price in cents (smallest currency unit). Never a float.
    pub price_cents: i64,

    /// Extended details shown on the product page.
    pub details: String,

    /// Available sizes as a comma-separated list ("40,41,42").
    pub sizes: String,

    /// Image URL.
    pub image: String,

    /// Catalog rating (display only).
    pub rating: f64,

    /// Current stock level. Invariant: never negative.
    /// Decremented only through reservation, restored on cancellation.
    pub stock: i64,
}

impl Shoe {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether the requested quantity is currently available.
    ///
    /// Advisory only: the authoritative check is the conditional stock
    /// decrement performed inside the checkout transaction.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        quantity > 0 && self.stock >= quantity
    }
}

// =============================================================================
// Cart Item
// =============================================================================

/// An unpaid line in a user's cart.
///
/// ## Invariants
/// - Unique per (user, shoe, size) while unpaid; repeated adds mutate
///   `quantity` in place.
/// - `paid` flips to true exactly once, inside the checkout transaction
///   that folds the line into an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartItem {
    pub id: String,
    pub user_id: String,
    pub shoe_id: String,
    /// Size chosen by the customer ("42", "9.5").
    pub size: String,
    pub quantity: i64,
    /// Claimed by a checkout attempt. Unpaid lines form the active cart.
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// ## State Machine
/// ```text
/// NEW ──checkout──► Pending ──confirmation ok──► Completed
///                      │
///                      └────confirmation fail──► Cancelled (stock released)
/// ```
/// Transitions out of Pending are one-way and guarded by conditional
/// updates so duplicate webhook deliveries cannot re-fire them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Awaiting asynchronous payment confirmation.
    Pending,
    /// Payment confirmed; stock decrement is final.
    Completed,
    /// Payment failed or was declined; stock restored.
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Order
// =============================================================================

/// A checkout attempt, one per call of the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub total_cents: i64,
    pub status: OrderStatus,
    /// Push-payment tracking id (CheckoutRequestID). Set when the gateway
    /// synchronously accepts the STK push; correlates the later callback.
    pub checkout_request_id: Option<String>,
    /// Capture-gateway remote order id, set for the capture flow only.
    pub paypal_order_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Returns the order total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Whether the order has reached a terminal state.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status != OrderStatus::Pending
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// Links an Order to the CartItem it was created from.
///
/// The cart item preserves the frozen size/quantity context at purchase
/// time; the order item is just the ownership edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub cart_item_id: String,
}

// =============================================================================
// Order Line (denormalized view)
// =============================================================================

/// A fully-joined order line: order item + cart context + shoe snapshot.
///
/// Used by inventory release (quantities to restore) and the receipt
/// generator (names and prices to print).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub shoe_id: String,
    pub shoe_name: String,
    pub size: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl OrderLine {
    /// Line total (unit price × quantity), `None` on overflow.
    #[inline]
    pub fn line_total(&self) -> Option<Money> {
        Money::from_cents(self.unit_price_cents).checked_mul_qty(self.quantity)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Record of a successful push-payment confirmation.
///
/// Exists only for completed push-payment orders; one-to-one with Order
/// and immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    /// Provider transaction reference (M-Pesa receipt number).
    pub mpesa_code: String,
    pub amount_cents: i64,
    /// Payer phone in canonical 254... form.
    pub phone_number: String,
    pub transaction_date: DateTime<Utc>,
}

// =============================================================================
// Capture Intent
// =============================================================================

/// Cart snapshot taken when a capture-flow remote order is opened.
///
/// `capture_and_finalize` re-validates the live cart against this snapshot
/// and refuses to finalize if either the total or the line set drifted
/// (CartChanged). The line digest catches edits that leave the total intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CaptureIntent {
    /// Remote (PayPal) order id — primary key, returned to the caller.
    pub remote_order_id: String,
    pub user_id: String,
    /// Cart total at create-time.
    pub total_cents: i64,
    /// Canonical encoding of the cart lines at create-time.
    pub lines_digest: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// A registered customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub email: String,
    /// Argon2 hash; None for accounts created through OAuth.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Requisition
// =============================================================================

/// A (shoe, quantity) pair handed to the inventory reservation contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub shoe_id: String,
    pub quantity: i64,
}

impl StockLine {
    pub fn new(shoe_id: impl Into<String>, quantity: i64) -> Self {
        StockLine {
            shoe_id: shoe_id.into(),
            quantity,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_default() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_shoe_can_fulfil() {
        let shoe = Shoe {
            id: "s1".to_string(),
            name: "Runner".to_string(),
            brand: "Acme".to_string(),
            description: String::new(),
            price_cents: 450000,
            details: String::new(),
            sizes: "40,41,42".to_string(),
            image: String::new(),
            rating: 4.5,
            stock: 3,
        };

        assert!(shoe.can_fulfil(3));
        assert!(!shoe.can_fulfil(4));
        assert!(!shoe.can_fulfil(0));
    }

    #[test]
    fn test_order_terminal() {
        let mut order = Order {
            id: "o1".to_string(),
            user_id: "u1".to_string(),
            total_cents: 1000,
            status: OrderStatus::Pending,
            checkout_request_id: None,
            paypal_order_id: None,
            created_at: Utc::now(),
        };
        assert!(!order.is_terminal());

        order.status = OrderStatus::Completed;
        assert!(order.is_terminal());
    }

    #[test]
    fn test_order_line_total() {
        let line = OrderLine {
            shoe_id: "s1".to_string(),
            shoe_name: "Runner".to_string(),
            size: "42".to_string(),
            quantity: 3,
            unit_price_cents: 450000,
        };
        assert_eq!(line.line_total(), Some(Money::from_cents(1350000)));
    }

    #[test]
    fn test_order_line_total_overflow_is_none() {
        let line = OrderLine {
            shoe_id: "s1".to_string(),
            shoe_name: "Runner".to_string(),
            size: "42".to_string(),
            quantity: i64::MAX,
            unit_price_cents: 2,
        };
        assert_eq!(line.line_total(), None);
    }
}
