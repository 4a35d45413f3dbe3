//! # Shoe Haven Shop API
//!
//! HTTP API for the Shoe Haven storefront: catalog, carts, authentication,
//! and the two checkout flows (M-Pesa push payment, PayPal capture).
//!
//! Exposed as a library so integration tests can drive the services and
//! router directly.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod state;
