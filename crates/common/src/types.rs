use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Lifecycle status of a purchase-proxy order, stored as upper-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored status string names no known [`OrderStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Order snapshot read at send time to render a customer notification.
///
/// Fetched fresh for every delivery attempt and never cached between attempts.
/// `status` stays raw text so a status this build does not know about simply
/// matches no template instead of failing to decode.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderNotice {
    pub order_id: i64,
    pub title: String,
    pub status: String,
    pub quantity: i32,
    pub product_price: Option<f64>,
    pub shipping_fee: Option<f64>,
    pub service_fee: Option<f64>,
    pub total_price: Option<f64>,
    pub tracking_number: Option<String>,
    /// Customer display name (`None` when the order has no linked customer)
    pub recipient_name: Option<String>,
    /// Customer phone number as entered, not normalized
    pub recipient_phone: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<OrderStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "ON_HOLD".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("ON_HOLD".to_string()));
    }

    #[test]
    fn test_status_parsing_is_case_sensitive() {
        assert!("processing".parse::<OrderStatus>().is_err());
    }
}
