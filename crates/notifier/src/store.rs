//! Order lookup used by the delivery loop.
//!
//! The queue only ever holds order ids; the order itself is read here on every
//! attempt so a status change between retries is picked up.

use async_trait::async_trait;
use sqlx::PgPool;

use orderdesk_common::error::AppError;
use orderdesk_common::types::OrderNotice;

/// Read access to the order store, keyed by order id.
#[async_trait]
pub trait OrderLookup: Send + Sync {
    /// Fetch the current notification snapshot for an order.
    ///
    /// `Ok(None)` means the order no longer exists, which is a valid outcome.
    async fn find_order(&self, order_id: i64) -> Result<Option<OrderNotice>, AppError>;
}

/// PostgreSQL-backed [`OrderLookup`].
#[derive(Clone)]
pub struct PgOrderLookup {
    pool: PgPool,
}

impl PgOrderLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderLookup for PgOrderLookup {
    async fn find_order(&self, order_id: i64) -> Result<Option<OrderNotice>, AppError> {
        let notice = sqlx::query_as::<_, OrderNotice>(
            r#"
            SELECT
                o.id AS order_id,
                o.title,
                o.status,
                o.quantity,
                o.product_price,
                o.shipping_fee,
                o.service_fee,
                o.total_price,
                o.tracking_number,
                u.name AS recipient_name,
                u.phone AS recipient_phone,
                o.updated_at
            FROM orders o
            LEFT JOIN users u ON u.id = o.user_id
            WHERE o.id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(notice)
    }
}
