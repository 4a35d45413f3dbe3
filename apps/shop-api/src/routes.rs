//! Router assembly.

use axum::routing::{get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers::{auth, cart, catalog, orders, webhook};
use crate::state::AppState;

/// Builds the full API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        // Catalog
        .route("/api/products/shoes", get(catalog::list_shoes))
        .route("/api/products/shoes/:id", get(catalog::get_shoe))
        // Cart
        .route("/api/cart", get(cart::get_cart))
        .route("/api/cart/items", post(cart::add_item))
        .route(
            "/api/cart/items/:id",
            put(cart::update_item).delete(cart::remove_item),
        )
        // Orders
        .route("/api/orders", get(orders::list_orders))
        .route("/api/orders/checkout", post(orders::checkout))
        .route("/api/orders/callback", post(webhook::payment_callback))
        .route("/api/orders/paypal", post(orders::create_paypal_order))
        .route(
            "/api/orders/paypal/:remote_id/capture",
            post(orders::capture_paypal_order),
        )
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/orders/:id/receipt", get(orders::download_receipt))
        // Health
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> axum::Json<serde_json::Value> {
    let healthy = state.db.health_check().await;
    axum::Json(serde_json::json!({ "status": if healthy { "ok" } else { "degraded" } }))
}
