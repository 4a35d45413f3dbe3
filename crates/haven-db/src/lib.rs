//! # haven-db: SQLite Persistence for Shoe Haven
//!
//! All database access goes through this crate: connection pooling,
//! embedded migrations, and repositories for each aggregate.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apps/shop-api                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database ──► ShoeRepository / CartRepository / OrderRepository /      │
//! │               UserRepository                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqlitePool (WAL mode, foreign keys on)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repository methods come in two flavours: pool-based reads, and
//! `*_tx` variants taking `&mut SqliteConnection` so the checkout
//! orchestrator can compose them inside one transaction.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::cart::CartRepository;
pub use repository::order::{
    generate_order_id, generate_order_item_id, generate_payment_id, OrderRepository,
};
pub use repository::shoe::{generate_shoe_id, ShoeRepository};
pub use repository::user::{generate_user_id, UserRepository};
