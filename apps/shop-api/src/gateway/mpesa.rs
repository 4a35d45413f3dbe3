//! M-Pesa Daraja STK push client.
//!
//! Implements [`PushPaymentGateway`] against the Daraja API:
//!
//! 1. Fetch an OAuth access token (Basic auth with consumer key/secret).
//! 2. POST an STK push request; the `Password` field is
//!    `base64(short_code + passkey + timestamp)`.
//! 3. A synchronous `ResponseCode == "0"` means the prompt was pushed; the
//!    actual payment outcome arrives later on the callback URL.
//!
//! The Daraja wire format carries whole shillings only, so amounts are
//! truncated via [`Money::to_whole_units`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use super::{GatewayError, GatewayResult, PushAccepted, PushPaymentGateway};
use crate::config::MpesaConfig;
use haven_core::Money;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Daraja API client.
pub struct MpesaClient {
    http: Client,
    config: MpesaConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushResponse {
    response_code: Option<String>,
    response_description: Option<String>,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: Option<String>,
}

impl MpesaClient {
    /// Creates a client with the given credentials.
    pub fn new(config: MpesaConfig) -> GatewayResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(MpesaClient { http, config })
    }

    /// Fetches a short-lived OAuth access token.
    async fn access_token(&self) -> GatewayResult<String> {
        let url = format!(
            "{}/oauth/v1/generate?grant_type=client_credentials",
            self.config.base_url()
        );

        let response = self
            .http
            .get(&url)
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
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

    /// The STK push `Password` field for a given timestamp.
    fn stk_password(&self, timestamp: &str) -> String {
        BASE64.encode(format!(
            "{}{}{}",
            self.config.short_code, self.config.passkey, timestamp
        ))
    }
}

#[async_trait::async_trait]
impl PushPaymentGateway for MpesaClient {
    async fn initiate_push(
        &self,
        phone: &str,
        amount: Money,
        account_ref: &str,
    ) -> GatewayResult<PushAccepted> {
        let token = self.access_token().await?;

        let timestamp = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        let url = format!(
            "{}/mpesa/stkpush/v1/processrequest",
            self.config.base_url()
        );

        let payload = json!({
            "BusinessShortCode": self.config.short_code,
            "Password": self.stk_password(&timestamp),
            "Timestamp": timestamp,
            "TransactionType": "CustomerPayBillOnline",
            "Amount": amount.to_whole_units().to_string(),
            "PartyA": phone,
            "PartyB": self.config.short_code,
            "PhoneNumber": phone,
            "CallBackURL": self.config.callback_url,
            "AccountReference": account_ref,
            "TransactionDesc": "Shoe Haven purchase",
        });

        debug!(%phone, %amount, %account_ref, "Sending STK push request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: StkPushResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("STK response: {}", e)))?;

        match body.response_code.as_deref() {
            Some("0") => {
                let checkout_request_id = body.checkout_request_id.ok_or_else(|| {
                    GatewayError::MalformedResponse(
                        "accepted STK push without CheckoutRequestID".to_string(),
                    )
                })?;

                info!(%checkout_request_id, "STK push accepted");
                Ok(PushAccepted {
                    checkout_request_id,
                })
            }
            other => Err(GatewayError::Rejected(format!(
                "STK push declined (code {:?}): {}",
                other,
                body.response_description.unwrap_or_default()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MpesaConfig {
        MpesaConfig {
            consumer_key: "key".to_string(),
            consumer_secret: "secret".to_string(),
            passkey: "passkey".to_string(),
            short_code: "174379".to_string(),
            callback_url: "https://example.com/api/orders/callback".to_string(),
            sandbox: true,
        }
    }

    #[test]
    fn test_stk_password_is_base64_of_parts() {
        let client = MpesaClient::new(test_config()).unwrap();
        let password = client.stk_password("20260830120000");

        let decoded = BASE64.decode(password).unwrap();
        assert_eq!(decoded, b"174379passkey20260830120000");
    }

    #[test]
    fn test_sandbox_base_url() {
        assert_eq!(test_config().base_url(), "https://sandbox.safaricom.co.ke");
    }
}
