//! Shared application state.

use std::sync::Arc;

use crate::auth::JwtManager;
use crate::config::ShopConfig;
use crate::gateway::{CaptureGateway, PushPaymentGateway};
use haven_db::Database;

/// State handed to every handler via `axum::extract::State`.
pub struct AppState {
    pub db: Database,
    pub push_gateway: Arc<dyn PushPaymentGateway>,
    pub capture_gateway: Arc<dyn CaptureGateway>,
    pub jwt: JwtManager,
    pub config: ShopConfig,
}

impl AppState {
    pub fn new(
        db: Database,
        push_gateway: Arc<dyn PushPaymentGateway>,
        capture_gateway: Arc<dyn CaptureGateway>,
        jwt: JwtManager,
        config: ShopConfig,
    ) -> Self {
        AppState {
            db,
            push_gateway,
            capture_gateway,
            jwt,
            config,
        }
    }
}
