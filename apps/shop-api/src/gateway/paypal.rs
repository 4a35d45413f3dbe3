//! PayPal checkout-orders client.
//!
//! Implements [`CaptureGateway`] against the REST v2 checkout API:
//! `/v1/oauth2/token` for the access token, `/v2/checkout/orders` to open
//! an order, `/v2/checkout/orders/{id}/capture` to capture it. Only a
//! `COMPLETED` capture status counts as paid.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::{CaptureGateway, CaptureOutcome, GatewayError, GatewayResult};
use crate::config::PayPalConfig;
use haven_core::Money;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// PayPal REST client.
pub struct PayPalClient {
    http: Client,
    config: PayPalConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CaptureResponse {
    status: String,
}

impl PayPalClient {
    /// Creates a client with the given credentials.
    pub fn new(config: PayPalConfig) -> GatewayResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(PayPalClient { http, config })
    }

    async fn access_token(&self) -> GatewayResult<String> {
        let url = format!("{}/v1/oauth2/token", self.config.api_base);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Auth(format!(
                "token endpoint returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("token response: {}", e)))?;

        Ok(token.access_token)
    }

    async fn check_status(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait::async_trait]
impl CaptureGateway for PayPalClient {
    async fn create_order(&self, amount: Money) -> GatewayResult<String> {
        let token = self.access_token().await?;
        let url = format!("{}/v2/checkout/orders", self.config.api_base);

        // The v2 API wants a decimal string, two places.
        let value = format!("{}.{:02}", amount.cents() / 100, amount.cents() % 100);

        let payload = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": "USD",
                    "value": value,
                }
            }],
        });

        debug!(%amount, "Creating PayPal order");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("order response: {}", e)))?;

        info!(remote_order_id = %order.id, "PayPal order created");
        Ok(order.id)
    }

    async fn capture(&self, remote_order_id: &str) -> GatewayResult<CaptureOutcome> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/v2/checkout/orders/{}/capture",
            self.config.api_base, remote_order_id
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let capture: CaptureResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("capture response: {}", e)))?;

        info!(%remote_order_id, status = %capture.status, "PayPal capture result");

        if capture.status == "COMPLETED" {
            Ok(CaptureOutcome::Completed)
        } else {
            Ok(CaptureOutcome::NotCompleted(capture.status))
        }
    }
}
