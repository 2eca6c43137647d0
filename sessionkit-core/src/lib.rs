//! Sessionkit Core Library
//!
//! Pure, stateless building blocks for the client session manager:
//! - Credentials are compact three-part signed-claim tokens; the codec
//!   decodes and (for locally synthesized credentials) encodes them
//! - The expiry policy decides validity and refresh timing from claims
//! - A principal is the local projection of the signed-in user

pub mod credential;
pub mod expiry;
pub mod principal;
pub mod error;

pub use credential::{Claims, Credential};
pub use principal::{Principal, PrincipalUpdate};
pub use error::Error;

/// Result type for sessionkit-core operations
pub type Result<T> = std::result::Result<T, Error>;
