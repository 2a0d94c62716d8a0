//! Customer notifications for order status changes.
//!
//! Order ids arrive through [`listener::StatusChangeListener`] (or any caller of
//! [`queue::NotificationQueue::enqueue`]) and are delivered one at a time over the
//! WhatsApp Cloud API, with a fixed pause between attempts and a bounded number of
//! retries per order.

pub mod error;
pub mod listener;
pub mod queue;
pub mod store;
pub mod templates;
pub mod whatsapp;
