//! Expiry policy for credentials
//!
//! Pure time arithmetic over decoded claims. A credential that fails to
//! decode never reaches this module; the session manager treats it as
//! expired (fail closed for session validity only).

use crate::credential::Claims;

/// How close to expiry a credential may get before it should be refreshed
pub const DEFAULT_REFRESH_BUFFER_SECS: i64 = 600;

/// Whether the credential has expired as of `now` (Unix seconds)
pub fn is_expired(claims: &Claims, now: i64) -> bool {
    claims.expires_at <= now
}

/// Seconds until expiry as of `now`; negative once expired
pub fn remaining_seconds(claims: &Claims, now: i64) -> i64 {
    claims.expires_at - now
}

/// Whether the credential is still valid but inside the refresh window
pub fn needs_refresh(claims: &Claims, now: i64, buffer_secs: i64) -> bool {
    let remaining = remaining_seconds(claims, now);
    remaining > 0 && remaining <= buffer_secs
}

/// Validity check for session restore
pub fn ensure_valid(claims: &Claims, now: i64) -> crate::Result<()> {
    if is_expired(claims, now) {
        Err(crate::Error::Expired)
    } else {
        Ok(())
    }
}
