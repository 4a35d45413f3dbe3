//! Shop API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. Gateway credentials are injected into constructed clients at
//! startup; nothing reads the environment after boot.

use serde::{Deserialize, Serialize};
use std::env;

/// Shop API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database path
    pub database_path: String,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// M-Pesa Daraja credentials
    pub mpesa: MpesaConfig,

    /// PayPal REST credentials
    pub paypal: PayPalConfig,
}

/// M-Pesa Daraja API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpesaConfig {
    /// Consumer key for the OAuth token endpoint
    pub consumer_key: String,

    /// Consumer secret for the OAuth token endpoint
    pub consumer_secret: String,

    /// STK push passkey
    pub passkey: String,

    /// Business short code (paybill number)
    pub short_code: String,

    /// Publicly reachable URL the gateway posts confirmations to
    pub callback_url: String,

    /// Use the sandbox API base instead of production
    pub sandbox: bool,
}

impl MpesaConfig {
    /// API base URL for the configured environment.
    pub fn base_url(&self) -> &'static str {
        if self.sandbox {
            "https://sandbox.safaricom.co.ke"
        } else {
            "https://api.safaricom.co.ke"
        }
    }
}

/// PayPal REST API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayPalConfig {
    /// REST client id
    pub client_id: String,

    /// REST client secret
    pub client_secret: String,

    /// API base URL (sandbox or live)
    pub api_base: String,
}

impl ShopConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ShopConfig {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "shoe_haven.db".to_string()),

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                // In production, this MUST be set via environment variable
                "shoe-haven-dev-secret-change-in-production".to_string()
            }),

            jwt_access_lifetime_secs: env::var("JWT_ACCESS_LIFETIME_SECS")
                .unwrap_or_else(|_| "86400".to_string()) // 24 hours
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()))?,

            mpesa: MpesaConfig {
                consumer_key: env::var("MPESA_CONSUMER_KEY")
                    .map_err(|_| ConfigError::MissingRequired("MPESA_CONSUMER_KEY".to_string()))?,

                consumer_secret: env::var("MPESA_CONSUMER_SECRET").map_err(|_| {
                    ConfigError::MissingRequired("MPESA_CONSUMER_SECRET".to_string())
                })?,

                passkey: env::var("MPESA_PASSKEY")
                    .map_err(|_| ConfigError::MissingRequired("MPESA_PASSKEY".to_string()))?,

                short_code: env::var("MPESA_SHORT_CODE")
                    .unwrap_or_else(|_| "174379".to_string()), // sandbox paybill

                callback_url: env::var("MPESA_CALLBACK_URL")
                    .map_err(|_| ConfigError::MissingRequired("MPESA_CALLBACK_URL".to_string()))?,

                sandbox: env::var("MPESA_SANDBOX")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .unwrap_or(true),
            },

            paypal: PayPalConfig {
                client_id: env::var("PAYPAL_CLIENT_ID")
                    .map_err(|_| ConfigError::MissingRequired("PAYPAL_CLIENT_ID".to_string()))?,

                client_secret: env::var("PAYPAL_CLIENT_SECRET").map_err(|_| {
                    ConfigError::MissingRequired("PAYPAL_CLIENT_SECRET".to_string())
                })?,

                api_base: env::var("PAYPAL_API_BASE")
                    .unwrap_or_else(|_| "https://api-m.sandbox.paypal.com".to_string()),
            },
        };

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
