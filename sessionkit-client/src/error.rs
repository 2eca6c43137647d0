//! Client error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The durable store rejected a read or write (quota, disabled
    /// storage). Always swallowed into a warning by the adapter.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A sync delivery channel failed. Isolated per channel by the
    /// bridge; other channels still fire.
    #[error("Notifier failed: {0}")]
    Notify(String),
}

/// Typed failure surfaced to login/refresh callers
///
/// Auth operations never panic and never propagate raw transport errors;
/// a failed exchange comes back as this value so UI code can render the
/// message inline. Clone-able because overlapping refresh callers all
/// receive the same outcome.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub message: String,
}

impl AuthFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
