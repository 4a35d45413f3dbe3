//! # Repository Layer
//!
//! One repository per aggregate:
//!
//! - [`shoe`] — catalog reads plus the transaction-scoped stock moves
//!   (conditional reserve, release)
//! - [`cart`] — unpaid cart lines, upsert-by-(user, shoe, size), claiming
//! - [`order`] — orders, order items, payments, capture intents, and the
//!   status-guarded pending→terminal transition
//! - [`user`] — account rows
//!
//! Methods suffixed `_tx` take `&mut SqliteConnection` so callers can
//! compose them inside a single transaction; everything else runs on the
//! pool directly.

pub mod cart;
pub mod order;
pub mod shoe;
pub mod user;
