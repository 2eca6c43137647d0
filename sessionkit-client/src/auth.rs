//! Remote auth service interface
//!
//! The remote service owns signature verification and authorization; this
//! client only exchanges credentials with it. Failures are uniform — a
//! rejected call, a network error, and a provider timeout all surface as
//! `ExchangeError` and are handled by the generic failure path of each
//! session operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sessionkit_core::{Principal, PrincipalUpdate};

/// Uniform remote-exchange failure
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ExchangeError(pub String);

/// Direct (email/password) login request
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response to a direct login exchange
///
/// `credential` is optional: the service has been observed to omit it,
/// and the session manager synthesizes a fallback in that case.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeResponse {
    pub credential: Option<String>,
    pub principal: Principal,
}

/// Response to a federated (identity-provider assertion) exchange
#[derive(Debug, Clone, Deserialize)]
pub struct FederatedResponse {
    pub credential: Option<String>,
    pub principal: Principal,
    #[serde(default)]
    pub needs_profile_completion: bool,
}

/// Response to a credential refresh exchange
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub credential: String,
}

/// The remote auth service collaborator
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange direct credentials for a session
    async fn login(&self, request: &LoginRequest) -> Result<ExchangeResponse, ExchangeError>;

    /// Exchange an identity-provider assertion for a session
    async fn federated_login(&self, assertion: &str) -> Result<FederatedResponse, ExchangeError>;

    /// Exchange the current credential for a fresh one
    async fn refresh(&self, credential: &str) -> Result<RefreshResponse, ExchangeError>;

    /// Revoke a credential (best-effort; callers ignore failures)
    async fn revoke(&self, credential: &str) -> Result<(), ExchangeError>;

    /// Apply a partial profile update, returning the updated principal
    async fn update_profile(
        &self,
        credential: &str,
        update: &PrincipalUpdate,
    ) -> Result<Principal, ExchangeError>;
}
