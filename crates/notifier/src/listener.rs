//! Bridges Postgres `NOTIFY` events into the delivery queue.
//!
//! A trigger on `orders` publishes the order id on [`STATUS_CHANNEL`] every time
//! the status column changes. Whoever performs the status update needs no
//! knowledge of this process.

use sqlx::PgPool;
use sqlx::postgres::PgListener;

use crate::queue::NotificationQueue;

/// Channel the `notify_order_status_changed` trigger publishes on. Must match the
/// literal in `migrations/20260101000000_orders.sql`.
pub const STATUS_CHANNEL: &str = "order_status_changed";

/// Listens for status-change events and enqueues the affected orders.
pub struct StatusChangeListener {
    listener: PgListener,
    queue: NotificationQueue,
}

impl StatusChangeListener {
    /// Connect a dedicated listener connection and subscribe to [`STATUS_CHANNEL`].
    pub async fn connect(pool: &PgPool, queue: NotificationQueue) -> anyhow::Result<Self> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(STATUS_CHANNEL).await?;

        tracing::info!(channel = STATUS_CHANNEL, "Listening for order status changes");
        Ok(Self { listener, queue })
    }

    /// Receive notifications forever. Returns only on a non-recoverable error.
    ///
    /// `PgListener` reconnects by itself after a dropped connection; events
    /// published while disconnected are lost.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let notification = self.listener.recv().await?;
            forward(&self.queue, notification.payload());
        }
    }
}

/// Enqueue the order named by `payload`. Returns the order id, or `None` when
/// the payload was ignored.
pub fn forward(queue: &NotificationQueue, payload: &str) -> Option<i64> {
    let Some(order_id) = parse_payload(payload) else {
        tracing::warn!(
            channel = STATUS_CHANNEL,
            payload,
            "Ignoring status change with unparsable order id"
        );
        return None;
    };

    queue.enqueue(order_id);
    Some(order_id)
}

/// Parse a notification payload as an order id.
pub fn parse_payload(payload: &str) -> Option<i64> {
    payload.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use orderdesk_common::error::AppError;
    use orderdesk_common::types::OrderNotice;

    use crate::error::DeliveryError;
    use crate::queue::QueuePolicy;
    use crate::store::OrderLookup;
    use crate::whatsapp::MessageSender;

    use super::*;

    struct NoOrders;

    #[async_trait]
    impl OrderLookup for NoOrders {
        async fn find_order(&self, _order_id: i64) -> Result<Option<OrderNotice>, AppError> {
            Ok(None)
        }
    }

    struct NoSend;

    #[async_trait]
    impl MessageSender for NoSend {
        async fn send_text(&self, _to: &str, _body: &str) -> Result<(), DeliveryError> {
            Ok(())
        }
    }

    fn idle_queue() -> NotificationQueue {
        NotificationQueue::new(Arc::new(NoOrders), Arc::new(NoSend), QueuePolicy::default())
    }

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload("101"), Some(101));
        assert_eq!(parse_payload(" 42\n"), Some(42));
    }

    #[test]
    fn test_parse_payload_rejects_garbage() {
        assert_eq!(parse_payload(""), None);
        assert_eq!(parse_payload("order-7"), None);
        assert_eq!(parse_payload("1.5"), None);
    }

    // No runtime here, so enqueued items stay pending and can be counted.
    #[test]
    fn test_forward_enqueues_valid_payloads_only() {
        let queue = idle_queue();

        assert_eq!(forward(&queue, "17"), Some(17));
        assert_eq!(forward(&queue, "not-an-id"), None);
        assert_eq!(forward(&queue, " 18 "), Some(18));

        assert_eq!(queue.stats().pending, 2);
    }

    #[test]
    fn test_channel_matches_migration_trigger() {
        let migration = include_str!("../../../migrations/20260101000000_orders.sql");
        assert!(migration.contains(&format!("pg_notify('{}'", STATUS_CHANNEL)));
    }
}
