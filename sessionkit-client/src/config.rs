//! Session manager configuration

use serde::Deserialize;

use sessionkit_core::credential::SYNTHESIZED_ISSUER;
use sessionkit_core::expiry::DEFAULT_REFRESH_BUFFER_SECS;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// How close to expiry a credential may get before background refresh
    pub refresh_buffer_secs: i64,

    /// How often the refresh scheduler checks the credential, in seconds
    pub refresh_interval_secs: u64,

    /// Lifetime of a synthesized fallback credential, in seconds
    pub fallback_ttl_secs: i64,

    /// Issuer marker written into synthesized credentials
    pub fallback_issuer: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_buffer_secs: DEFAULT_REFRESH_BUFFER_SECS,
            refresh_interval_secs: 60,
            fallback_ttl_secs: 7 * 24 * 3600,
            fallback_issuer: SYNTHESIZED_ISSUER.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn fallback_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.fallback_ttl_secs)
    }
}
