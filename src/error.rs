// Error taxonomy for the ingestion core.
//
// Each error kind maps to the granularity at which it is contained:
// MalformedItemError and DeliveryError stop at a single item,
// CollectorError and StorageError stop at a single platform. Nothing
// here is allowed to take down a cycle or the process.

use thiserror::Error;

/// A single raw item could not be turned into a lead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedItemError {
    #[error("{platform} item is missing required field `{field}`")]
    MissingField {
        platform: String,
        field: &'static str,
    },

    #[error("{platform} item has an invalid link: {link}")]
    InvalidLink { platform: String, link: String },
}

/// A platform's retrieval mechanism is unusable for this cycle.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("{platform} is unreachable: {reason}")]
    Unreachable { platform: String, reason: String },

    #[error("HTTP error (status {status}) fetching {url}")]
    Http { status: u16, url: String },

    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },
}

/// The lead store is unavailable or its contents could not be read.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt lead row: {0}")]
    Corrupt(String),
}

/// A notification could not be delivered to its channel.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Notification channel {0} not found")]
    ChannelNotFound(String),

    #[error("Notification channel rejected the message (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error delivering notification: {0}")]
    Network(String),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Network(err.to_string())
    }
}

/// Failures that abandon one platform's contribution to the current cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
