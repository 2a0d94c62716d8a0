//! Status-keyed message templates.
//!
//! Only statuses listed in [`TEMPLATES`] notify the customer. `PENDING` is
//! deliberately absent: a freshly placed order needs no message.

use orderdesk_common::types::{OrderNotice, OrderStatus};

/// Renders the message body for one order status.
#[derive(Debug, Clone, Copy)]
pub struct MessageTemplate {
    pub status: OrderStatus,
    pub render: fn(&OrderNotice) -> String,
}

/// Built-in templates, matched in declaration order.
pub static TEMPLATES: &[MessageTemplate] = &[
    MessageTemplate {
        status: OrderStatus::Processing,
        render: render_processing,
    },
    MessageTemplate {
        status: OrderStatus::Confirmed,
        render: render_confirmed,
    },
    MessageTemplate {
        status: OrderStatus::Shipped,
        render: render_shipped,
    },
    MessageTemplate {
        status: OrderStatus::Delivered,
        render: render_delivered,
    },
    MessageTemplate {
        status: OrderStatus::Cancelled,
        render: render_cancelled,
    },
];

/// First template whose status matches `status`, if any.
///
/// An unrecognized status string never matches.
pub fn select_template<'a>(
    templates: &'a [MessageTemplate],
    status: &str,
) -> Option<&'a MessageTemplate> {
    let status: OrderStatus = status.parse().ok()?;
    templates.iter().find(|t| t.status == status)
}

fn greeting(order: &OrderNotice) -> String {
    match order.recipient_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => format!("Hi {},", name),
        _ => "Hi,".to_string(),
    }
}

/// Two decimals, or `-` when the price has not been set yet.
fn money(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".to_string())
}

fn render_processing(order: &OrderNotice) -> String {
    format!(
        "{} your order #{} \"{}\" (x{}) has been quoted.\n\
         Product: {}\n\
         Shipping: {}\n\
         Service fee: {}\n\
         Total: {}\n\
         Please review the quote and confirm to proceed with the purchase.",
        greeting(order),
        order.order_id,
        order.title,
        order.quantity,
        money(order.product_price),
        money(order.shipping_fee),
        money(order.service_fee),
        money(order.total_price),
    )
}

fn render_confirmed(order: &OrderNotice) -> String {
    format!(
        "{} your order #{} \"{}\" is confirmed. Total paid: {}. \
         We are purchasing it now and will let you know when it ships.",
        greeting(order),
        order.order_id,
        order.title,
        money(order.total_price),
    )
}

fn render_shipped(order: &OrderNotice) -> String {
    let tracking = match order.tracking_number.as_deref() {
        Some(number) if !number.trim().is_empty() => {
            format!(" Tracking number: {}.", number.trim())
        }
        _ => String::new(),
    };

    format!(
        "{} your order #{} \"{}\" has shipped.{}",
        greeting(order),
        order.order_id,
        order.title,
        tracking,
    )
}

fn render_delivered(order: &OrderNotice) -> String {
    format!(
        "{} your order #{} \"{}\" has been delivered. Thank you for shopping with us!",
        greeting(order),
        order.order_id,
        order.title,
    )
}

fn render_cancelled(order: &OrderNotice) -> String {
    format!(
        "{} your order #{} \"{}\" has been cancelled. \
         Reply to this message if you have any questions.",
        greeting(order),
        order.order_id,
        order.title,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_order(status: &str) -> OrderNotice {
        OrderNotice {
            order_id: 101,
            title: "Mechanical keyboard".to_string(),
            status: status.to_string(),
            quantity: 2,
            product_price: Some(120.0),
            shipping_fee: Some(15.5),
            service_fee: Some(9.99),
            total_price: Some(145.49),
            tracking_number: None,
            recipient_name: Some("Dana".to_string()),
            recipient_phone: Some("+1 (555) 010-2000".to_string()),
            updated_at: Utc::now(),
        }
    }

    fn render(order: &OrderNotice) -> Option<String> {
        select_template(TEMPLATES, &order.status).map(|t| (t.render)(order))
    }

    #[test]
    fn test_processing_includes_prices() {
        let body = render(&make_order("PROCESSING")).unwrap();
        assert!(body.starts_with("Hi Dana,"));
        assert!(body.contains("#101"));
        assert!(body.contains("Mechanical keyboard"));
        assert!(body.contains("(x2)"));
        assert!(body.contains("Product: 120.00"));
        assert!(body.contains("Shipping: 15.50"));
        assert!(body.contains("Service fee: 9.99"));
        assert!(body.contains("Total: 145.49"));
    }

    #[test]
    fn test_missing_prices_render_as_dash() {
        let mut order = make_order("PROCESSING");
        order.shipping_fee = None;
        order.total_price = None;
        let body = render(&order).unwrap();
        assert!(body.contains("Shipping: -"));
        assert!(body.contains("Total: -"));
    }

    #[test]
    fn test_shipped_with_and_without_tracking() {
        let mut order = make_order("SHIPPED");
        assert!(!render(&order).unwrap().contains("Tracking"));

        order.tracking_number = Some(" LX123456789CN ".to_string());
        assert!(render(&order).unwrap().contains("Tracking number: LX123456789CN."));
    }

    #[test]
    fn test_pending_has_no_template() {
        assert!(select_template(TEMPLATES, "PENDING").is_none());
    }

    #[test]
    fn test_unknown_status_has_no_template() {
        assert!(select_template(TEMPLATES, "ON_HOLD").is_none());
        assert!(select_template(TEMPLATES, "").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        fn first(_: &OrderNotice) -> String {
            "first".to_string()
        }
        fn second(_: &OrderNotice) -> String {
            "second".to_string()
        }
        let templates = [
            MessageTemplate {
                status: OrderStatus::Confirmed,
                render: first,
            },
            MessageTemplate {
                status: OrderStatus::Confirmed,
                render: second,
            },
        ];
        let order = make_order("CONFIRMED");
        let template = select_template(&templates, &order.status).unwrap();
        assert_eq!((template.render)(&order), "first");
    }

    #[test]
    fn test_greeting_without_name() {
        let mut order = make_order("DELIVERED");
        order.recipient_name = Some("   ".to_string());
        assert!(render(&order).unwrap().starts_with("Hi, your order #101"));
    }

    #[test]
    fn test_every_notifying_status_has_a_template() {
        for status in ["PROCESSING", "CONFIRMED", "SHIPPED", "DELIVERED", "CANCELLED"] {
            assert!(select_template(TEMPLATES, status).is_some(), "{}", status);
        }
    }
}
