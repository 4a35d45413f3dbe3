//! # Phone Normalization
//!
//! Canonicalizes Kenyan phone numbers for the push-payment gateway.
//!
//! ## Accepted Input Forms
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   Input             Canonical form                                      │
//! │   ─────────────     ──────────────                                      │
//! │   0712345678        254712345678      (mobile, 07xx)                    │
//! │   0112345678        254112345678      (mobile, 01xx)                    │
//! │   +254712345678     254712345678                                        │
//! │   254712345678      254712345678      (already canonical, 12 digits)    │
//! │   "0712 345 678"    254712345678      (whitespace stripped)             │
//! │                                                                         │
//! │   Anything else → InvalidPhone                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gateway only accepts the 254-prefixed 12-digit form; normalization
//! happens once, before any state is mutated, so a malformed number can
//! never leave a half-created checkout behind.

use crate::error::{CoreError, CoreResult};

/// Normalizes a Kenyan phone number to the canonical `254...` form.
///
/// Fails with [`CoreError::InvalidPhone`] when the input does not match any
/// accepted format.
pub fn normalize_phone(raw: &str) -> CoreResult<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let digits = match cleaned.strip_prefix('+') {
        Some(rest) => rest,
        None => cleaned.as_str(),
    };

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::InvalidPhone { raw: raw.to_string() });
    }

    let canonical = if let Some(rest) = digits.strip_prefix("07") {
        format!("2547{rest}")
    } else if let Some(rest) = digits.strip_prefix("01") {
        format!("2541{rest}")
    } else if digits.starts_with("254") {
        digits.to_string()
    } else {
        return Err(CoreError::InvalidPhone { raw: raw.to_string() });
    };

    if canonical.len() != 12 {
        return Err(CoreError::InvalidPhone { raw: raw.to_string() });
    }

    Ok(canonical)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_local_mobile_format() {
        assert_eq!(normalize_phone("0712345678").unwrap(), "254712345678");
        assert_eq!(normalize_phone("0112345678").unwrap(), "254112345678");
    }

    #[test]
    fn test_normalizes_international_format() {
        assert_eq!(normalize_phone("+254712345678").unwrap(), "254712345678");
        assert_eq!(normalize_phone("254712345678").unwrap(), "254712345678");
    }

    #[test]
    fn test_strips_whitespace() {
        assert_eq!(normalize_phone("0712 345 678").unwrap(), "254712345678");
        assert_eq!(normalize_phone(" +254 712 345 678 ").unwrap(), "254712345678");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("07123456789999").is_err());
        assert!(normalize_phone("2547abc45678").is_err());
        // Wrong country prefix
        assert!(normalize_phone("+255712345678").is_err());
    }

    #[test]
    fn test_rejects_truncated_canonical() {
        // 254-prefixed but not 12 digits
        assert!(normalize_phone("25471234567").is_err());
        assert!(normalize_phone("2547123456789").is_err());
    }
}
