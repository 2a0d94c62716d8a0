//! Sequential notification delivery queue.
//!
//! One delivery loop per process works through queued order ids strictly one at a
//! time, pausing a fixed delay after every attempt so the messaging endpoint's rate
//! limit is respected. A failed item goes to the back of the queue with its retry
//! count bumped, so one unreachable customer cannot hold up everybody else.
//!
//! Item lifecycle:
//!
//! ```text
//! Queued -> Attempting -> Delivered                    (removed)
//!                      -> Skipped                      (removed, nothing to send)
//!                      -> Requeued(retry + 1) -> ...   (back of the queue)
//!                      -> Dropped                      (removed, retries exhausted)
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use orderdesk_common::config::AppConfig;

use crate::error::DeliveryError;
use crate::store::OrderLookup;
use crate::templates::{MessageTemplate, TEMPLATES, select_template};
use crate::whatsapp::{MessageSender, normalize_phone};

/// Retries allowed after the first failed attempt.
pub const MAX_RETRIES: u32 = 3;

/// Pause after every delivery cycle, successful or not.
pub const DELIVERY_DELAY: Duration = Duration::from_millis(5000);

/// Upper bound for one attempt (lookup + send).
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(15);

/// An order id waiting for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueItem {
    pub order_id: i64,
    pub retry_count: u32,
}

impl QueueItem {
    fn new(order_id: i64) -> Self {
        Self {
            order_id,
            retry_count: 0,
        }
    }

    fn retried(self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self
        }
    }
}

/// Timing and retry bounds for the delivery loop.
#[derive(Debug, Clone)]
pub struct QueuePolicy {
    pub max_retries: u32,
    pub delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            delay: DELIVERY_DELAY,
            attempt_timeout: ATTEMPT_TIMEOUT,
        }
    }
}

impl QueuePolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.notify_max_retries,
            delay: Duration::from_millis(config.notify_delay_ms),
            attempt_timeout: Duration::from_secs(config.notify_attempt_timeout_secs),
        }
    }
}

/// Why an item was removed without sending anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The order no longer exists.
    NotFound,
    /// The order has no customer, or the customer has no usable phone number.
    NoRecipient,
    /// The order's current status does not notify.
    NoTemplate,
}

/// Result of an attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Skipped(SkipReason),
}

/// Point-in-time view of the queue, for logs and health reporting.
#[derive(Debug, Clone, Default)]
pub struct QueueStats {
    pub pending: usize,
    pub running: bool,
    pub delivered: u64,
    pub skipped: u64,
    pub retried: u64,
    pub dropped: u64,
    pub last_delivered_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct QueueState {
    items: VecDeque<QueueItem>,
    /// Set while a delivery loop task exists. Guarded together with `items` so
    /// `enqueue` and the loop agree on who starts the next loop.
    running: bool,
    delivered: u64,
    skipped: u64,
    retried: u64,
    dropped: u64,
    last_delivered_at: Option<DateTime<Utc>>,
}

struct Shared {
    state: Mutex<QueueState>,
    idle: Notify,
    lookup: Arc<dyn OrderLookup>,
    sender: Arc<dyn MessageSender>,
    templates: &'static [MessageTemplate],
    policy: QueuePolicy,
}

/// Handle to the process-wide delivery queue.
///
/// Clones share the same queue; build one at startup and hand clones to whoever
/// needs to enqueue.
#[derive(Clone)]
pub struct NotificationQueue {
    shared: Arc<Shared>,
}

impl NotificationQueue {
    /// Queue using the built-in [`TEMPLATES`].
    pub fn new(
        lookup: Arc<dyn OrderLookup>,
        sender: Arc<dyn MessageSender>,
        policy: QueuePolicy,
    ) -> Self {
        Self::with_templates(lookup, sender, policy, TEMPLATES)
    }

    pub fn with_templates(
        lookup: Arc<dyn OrderLookup>,
        sender: Arc<dyn MessageSender>,
        policy: QueuePolicy,
        templates: &'static [MessageTemplate],
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                idle: Notify::new(),
                lookup,
                sender,
                templates,
                policy,
            }),
        }
    }

    /// Append an order to the back of the queue and make sure a loop is running.
    ///
    /// Returns immediately. The eventual outcome is only visible in logs and
    /// [`stats`](Self::stats). Must be called from within a tokio runtime for
    /// delivery to start; otherwise the item waits for the next call that is.
    pub fn enqueue(&self, order_id: i64) {
        let mut state = self.shared.state.lock();
        state.items.push_back(QueueItem::new(order_id));
        tracing::debug!(order_id, pending = state.items.len(), "Notification queued");

        if state.running {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                state.running = true;
                handle.spawn(Arc::clone(&self.shared).run());
            }
            Err(_) => {
                tracing::error!(
                    order_id,
                    "No tokio runtime available, delivery loop not started"
                );
            }
        }
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.shared.state.lock();
        QueueStats {
            pending: state.items.len(),
            running: state.running,
            delivered: state.delivered,
            skipped: state.skipped,
            retried: state.retried,
            dropped: state.dropped,
            last_delivered_at: state.last_delivered_at,
        }
    }

    /// Whether no delivery loop is currently running.
    pub fn is_idle(&self) -> bool {
        !self.shared.state.lock().running
    }

    /// Wait until the delivery loop has drained the queue and stopped.
    ///
    /// Items enqueued while waiting extend the wait.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl Shared {
    /// The delivery loop. At most one instance runs at a time, guarded by
    /// `QueueState::running`.
    async fn run(self: Arc<Self>) {
        tracing::debug!("Delivery loop started");

        loop {
            // The head stays in place while it is attempted; only this loop pops.
            let head = {
                let mut state = self.state.lock();
                let head = state.items.front().copied();
                if head.is_none() {
                    state.running = false;
                }
                head
            };

            let Some(head) = head else {
                self.idle.notify_waiters();
                tracing::debug!("Delivery queue drained, loop stopped");
                return;
            };

            let result = self.attempt(head).await;
            self.settle(head, result);

            tokio::time::sleep(self.policy.delay).await;
        }
    }

    /// One delivery cycle for `item`, bounded by the attempt timeout.
    async fn attempt(&self, item: QueueItem) -> Result<DeliveryOutcome, DeliveryError> {
        let timeout = self.policy.attempt_timeout;
        match tokio::time::timeout(timeout, self.deliver(item.order_id)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(timeout)),
        }
    }

    async fn deliver(&self, order_id: i64) -> Result<DeliveryOutcome, DeliveryError> {
        // Always re-read: the status may have moved on since the item was queued.
        let Some(order) = self.lookup.find_order(order_id).await? else {
            return Ok(DeliveryOutcome::Skipped(SkipReason::NotFound));
        };

        let phone = order
            .recipient_phone
            .as_deref()
            .map(normalize_phone)
            .unwrap_or_default();
        if phone.is_empty() {
            return Ok(DeliveryOutcome::Skipped(SkipReason::NoRecipient));
        }

        let Some(template) = select_template(self.templates, &order.status) else {
            return Ok(DeliveryOutcome::Skipped(SkipReason::NoTemplate));
        };

        let body = (template.render)(&order);
        self.sender.send_text(&phone, &body).await?;

        tracing::info!(
            order_id,
            status = %order.status,
            "Order notification delivered"
        );
        Ok(DeliveryOutcome::Delivered)
    }

    /// Remove the attempted head and requeue it at the back if it may retry.
    fn settle(&self, item: QueueItem, result: Result<DeliveryOutcome, DeliveryError>) {
        let mut state = self.state.lock();
        let head = state.items.pop_front();
        debug_assert_eq!(head, Some(item));

        match result {
            Ok(DeliveryOutcome::Delivered) => {
                state.delivered += 1;
                state.last_delivered_at = Some(Utc::now());
            }
            Ok(DeliveryOutcome::Skipped(reason)) => {
                state.skipped += 1;
                tracing::debug!(
                    order_id = item.order_id,
                    reason = ?reason,
                    "Notification skipped"
                );
            }
            Err(error) if item.retry_count < self.policy.max_retries => {
                state.retried += 1;
                state.items.push_back(item.retried());
                tracing::warn!(
                    order_id = item.order_id,
                    retry_count = item.retry_count + 1,
                    max_retries = self.policy.max_retries,
                    error = %error,
                    "Notification failed, requeued"
                );
            }
            Err(error) => {
                state.dropped += 1;
                tracing::error!(
                    order_id = item.order_id,
                    attempts = item.retry_count + 1,
                    error = %error,
                    "Notification dropped after exhausting retries"
                );
            }
        }
    }
}
