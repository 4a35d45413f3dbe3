//! Receipt rendering.
//!
//! Pure function over (order, lines, payment): no I/O, no allocation
//! beyond the output buffer. Only completed orders have receipts; orders
//! paid through the push flow additionally need their payment record for
//! the reference line.

use std::fmt::Write;

use crate::error::{ApiError, ApiResult};
use haven_core::{Money, Order, OrderLine, OrderStatus, Payment};

const RECEIPT_WIDTH: usize = 46;

/// Renders the plain-text receipt for a completed order.
pub fn render_receipt(
    order: &Order,
    lines: &[OrderLine],
    payment: Option<&Payment>,
) -> ApiResult<Vec<u8>> {
    if order.status != OrderStatus::Completed {
        return Err(ApiError::Conflict(
            "Receipt is only available for completed orders".to_string(),
        ));
    }

    // Push-flow orders must carry their confirmation record.
    if order.checkout_request_id.is_some() && payment.is_none() {
        return Err(ApiError::Internal(format!(
            "Completed order {} has no payment record",
            order.id
        )));
    }

    let mut out = String::new();
    let rule = "=".repeat(RECEIPT_WIDTH);
    let thin = "-".repeat(RECEIPT_WIDTH);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:^width$}", "SHOE HAVEN", width = RECEIPT_WIDTH);
    let _ = writeln!(out, "{:^width$}", "Official Receipt", width = RECEIPT_WIDTH);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Order:  {}", order.id);
    let _ = writeln!(out, "Date:   {}", order.created_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "{thin}");

    for line in lines {
        let total = line.line_total().ok_or_else(|| {
            ApiError::Internal(format!("Line total overflowed for {}", line.shoe_id))
        })?;

        let _ = writeln!(out, "{} (size {})", line.shoe_name, line.size);
        let _ = writeln!(
            out,
            "  {} x {} = {}",
            line.quantity,
            Money::from_cents(line.unit_price_cents),
            total,
        );
    }

    let _ = writeln!(out, "{thin}");
    let _ = writeln!(out, "TOTAL: {}", order.total());

    if let Some(payment) = payment {
        let _ = writeln!(out, "{thin}");
        let _ = writeln!(out, "Paid via M-Pesa");
        let _ = writeln!(out, "Reference: {}", payment.mpesa_code);
        let _ = writeln!(out, "Phone:     {}", payment.phone_number);
        let _ = writeln!(
            out,
            "Paid at:   {}",
            payment.transaction_date.format("%Y-%m-%d %H:%M UTC")
        );
    } else if order.paypal_order_id.is_some() {
        let _ = writeln!(out, "{thin}");
        let _ = writeln!(out, "Paid via PayPal");
        if let Some(remote) = &order.paypal_order_id {
            let _ = writeln!(out, "Reference: {}", remote);
        }
    }

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:^width$}", "Thank you for shopping with us!", width = RECEIPT_WIDTH);

    Ok(out.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn completed_order() -> Order {
        Order {
            id: "ord-1".to_string(),
            user_id: "user-1".to_string(),
            total_cents: 900_000,
            status: OrderStatus::Completed,
            checkout_request_id: Some("ws_CO_1".to_string()),
            paypal_order_id: None,
            created_at: Utc::now(),
        }
    }

    fn sample_payment() -> Payment {
        Payment {
            id: "pay-1".to_string(),
            order_id: "ord-1".to_string(),
            mpesa_code: "SHX1AB2CD3".to_string(),
            amount_cents: 900_000,
            phone_number: "254712345678".to_string(),
            transaction_date: Utc::now(),
        }
    }

    fn sample_lines() -> Vec<OrderLine> {
        vec![OrderLine {
            shoe_id: "shoe-1".to_string(),
            shoe_name: "Air Zoom".to_string(),
            size: "42".to_string(),
            quantity: 2,
            unit_price_cents: 450_000,
        }]
    }

    #[test]
    fn test_receipt_contains_lines_and_reference() {
        let payment = sample_payment();
        let bytes = render_receipt(&completed_order(), &sample_lines(), Some(&payment)).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("Air Zoom (size 42)"));
        assert!(text.contains("SHX1AB2CD3"));
        assert!(text.contains("TOTAL: KES 9000.00"));
    }

    #[test]
    fn test_pending_order_has_no_receipt() {
        let mut order = completed_order();
        order.status = OrderStatus::Pending;

        let payment = sample_payment();
        assert!(render_receipt(&order, &sample_lines(), Some(&payment)).is_err());
    }

    #[test]
    fn test_push_order_without_payment_row_is_an_error() {
        assert!(render_receipt(&completed_order(), &sample_lines(), None).is_err());
    }
}
