use std::time::Duration;

use thiserror::Error;

use orderdesk_common::error::AppError;

/// Why a single delivery attempt failed. Every variant is retryable.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Order lookup failed: {0}")]
    Lookup(#[from] AppError),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Messaging endpoint rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Delivery attempt timed out after {0:?}")]
    Timeout(Duration),
}
