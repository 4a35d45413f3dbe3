//! # haven-core: Pure Business Logic for Shoe Haven
//!
//! This crate is the **heart** of the Shoe Haven backend. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Shoe Haven Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (apps/shop-api)                     │   │
//! │  │   catalog ──► cart ──► checkout ──► webhook ──► receipt         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ haven-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   phone   │  │   error   │  │   │
//! │  │   │   Shoe    │  │   Money   │  │ normalize │  │ CoreError │  │   │
//! │  │   │   Order   │  │  (cents)  │  │  254xxx   │  │  variants │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    haven-db (Database Layer)                    │   │
//! │  │          SQLite queries, migrations, stock reservations         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Shoe, CartItem, Order, Payment, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`phone`] - Kenyan MSISDN normalization for the push-payment gateway
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod phone;
pub mod types;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use haven_core::Money` instead of
// `use haven_core::money::Money`

pub use error::{CoreError, CoreResult};
pub use money::Money;
pub use phone::normalize_phone;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single shoe in a cart line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 99;

/// Maximum unpaid lines a cart may hold.
pub const MAX_CART_ITEMS: usize = 50;
