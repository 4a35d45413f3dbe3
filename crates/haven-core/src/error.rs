//! # Error Types
//!
//! Domain-specific error types for haven-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  haven-core errors (this file)                                         │
//! │  └── CoreError        - Domain rule violations                         │
//! │                                                                         │
//! │  haven-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  shop-api errors (in app)                                              │
//! │  ├── GatewayError     - Payment provider transport/auth failures       │
//! │  └── ApiError         - What HTTP clients see (status + JSON body)     │
//! │                                                                         │
//! │  Flow: CoreError → DbError → ApiError → HTTP response                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (shoe name, available stock, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These represent business rule violations. Local validation variants
/// (InvalidPhone, EmptyCart, quantity checks) fire before any mutation;
/// the checkout transaction is rolled back whole when the rest fire.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Phone number does not match any accepted Kenyan format.
    #[error("Invalid phone number '{raw}'. Use 07xx, 01xx, or 254xx format")]
    InvalidPhone { raw: String },

    /// The user has no unpaid cart items to check out.
    #[error("Cart is empty")]
    EmptyCart,

    /// Insufficient stock to reserve a cart line.
    ///
    /// ## When This Occurs
    /// The conditional stock decrement inside the checkout transaction
    /// affected zero rows. Names the first shoe found insufficient; the
    /// whole reservation is rolled back.
    #[error("Not enough stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Item quantity exceeds the maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Cart has exceeded the maximum number of unpaid lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Cart total overflowed during computation.
    #[error("Cart total overflowed")]
    TotalOverflow,

    /// The cart changed between opening a capture-flow remote order and
    /// finalizing it; the live cart no longer matches the snapshot
    /// (total drifted, or the line set changed under the same total).
    #[error("Cart changed since the payment was created (approved total {expected_cents} cents, current total {actual_cents} cents)")]
    CartChanged {
        expected_cents: i64,
        actual_cents: i64,
    },

    /// Capture gateway reported anything other than a completed capture.
    #[error("Payment was not completed by the gateway (status: {status})")]
    PaymentNotCompleted { status: String },

    /// Push-payment gateway synchronously declined the STK push.
    #[error("Payment gateway rejected the request: {description}")]
    GatewayRejected { description: String },

    /// A required field was absent from the gateway callback metadata.
    #[error("Gateway callback is missing required field '{field}'")]
    MissingCallbackField { field: String },

    /// Callback metadata field present but unparseable.
    #[error("Gateway callback field '{field}' is malformed: {reason}")]
    MalformedCallbackField { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "Air Zoom".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Not enough stock for Air Zoom: available 3, requested 5"
        );
    }

    #[test]
    fn test_invalid_phone_message() {
        let err = CoreError::InvalidPhone {
            raw: "12345".to_string(),
        };
        assert!(err.to_string().contains("12345"));
    }

    #[test]
    fn test_cart_changed_message() {
        let err = CoreError::CartChanged {
            expected_cents: 1000,
            actual_cents: 1500,
        };
        assert!(err.to_string().contains("1000"));
        assert!(err.to_string().contains("1500"));
    }
}
