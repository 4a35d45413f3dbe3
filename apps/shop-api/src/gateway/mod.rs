//! # Payment Gateway Adapters
//!
//! Two provider-agnostic traits sit between the checkout services and the
//! outside world:
//!
//! - [`PushPaymentGateway`] — asks the provider to push a payment prompt
//!   to the customer's phone (M-Pesa STK push). The transaction completes
//!   asynchronously via the webhook.
//! - [`CaptureGateway`] — the client-approval model: open a remote order,
//!   then capture it once the customer approved (PayPal).
//!
//! Services hold `Arc<dyn ...>` so tests substitute stub gateways.

pub mod mpesa;
pub mod paypal;

use async_trait::async_trait;

use haven_core::Money;

/// Errors crossing the gateway boundary.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway authentication failed: {0}")]
    Auth(String),

    #[error("Gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gateway returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Gateway rejected the request: {0}")]
    Rejected(String),

    #[error("Gateway response was malformed: {0}")]
    MalformedResponse(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Synchronous acceptance of a push-payment request.
#[derive(Debug, Clone)]
pub struct PushAccepted {
    /// Provider-issued tracking id the asynchronous confirmation will
    /// reference (`CheckoutRequestID`).
    pub checkout_request_id: String,
}

/// Outcome of a capture attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The funds were captured in full.
    Completed,
    /// Any other provider status; the value is the raw status string.
    NotCompleted(String),
}

/// A gateway that pushes a payment prompt to the customer's device.
#[async_trait]
pub trait PushPaymentGateway: Send + Sync {
    /// Initiates a push payment. `phone` is already normalized,
    /// `account_ref` labels the transaction on the customer's statement.
    async fn initiate_push(
        &self,
        phone: &str,
        amount: Money,
        account_ref: &str,
    ) -> GatewayResult<PushAccepted>;
}

/// A gateway using the order-then-capture model.
#[async_trait]
pub trait CaptureGateway: Send + Sync {
    /// Opens a remote order for `amount`; returns the provider's order id.
    async fn create_order(&self, amount: Money) -> GatewayResult<String>;

    /// Captures a previously approved remote order.
    async fn capture(&self, remote_order_id: &str) -> GatewayResult<CaptureOutcome>;
}
