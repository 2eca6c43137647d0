//! Error types for sessionkit-core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The token is not a decodable three-segment claims bundle.
    /// Decode failures are deliberately collapsed into this one variant:
    /// callers treat every malformed token the same way (as no session).
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The credential's expiry has passed
    #[error("Credential expired")]
    Expired,
}
