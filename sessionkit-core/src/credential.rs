//! Credential codec for sessionkit
//!
//! A credential is a compact three-part token (`header.payload.signature`,
//! each segment base64url) carrying signed claims about a session. The
//! client never verifies the signature; that is the remote service's job.
//! When the identity exchange omits a credential, the client synthesizes
//! one locally so downstream code always has a non-null value to reason
//! about. Real and synthesized credentials are distinct variants so
//! diagnostics can tell them apart without string comparisons.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Issuer marker written into locally synthesized credentials
pub const SYNTHESIZED_ISSUER: &str = "local-fallback";

/// Placeholder third segment for synthesized credentials (no trusted signer)
const SYNTHESIZED_SIGNATURE: &str = "unsigned";

/// Claims carried in a credential payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Stable identifier of the subject (the user)
    #[serde(rename = "subjectId")]
    pub subject_id: String,

    /// Email address, if the issuer included one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Issue time (Unix timestamp, seconds)
    #[serde(rename = "issuedAt", default)]
    pub issued_at: i64,

    /// Expiration time (Unix timestamp, seconds)
    #[serde(rename = "expiresAt")]
    pub expires_at: i64,

    /// Issuing authority; `local-fallback` marks a synthesized credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

/// A session credential: the encoded token plus its decoded claims
///
/// `Real` credentials were issued by the remote service. `Synthesized`
/// credentials carry locally fabricated claims, either because no
/// credential was issued at all (federated-login gap) or because an
/// issued token did not decode and claims had to be derived from the
/// principal. The distinction matters only for diagnostics, never for
/// trust decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Real { raw: String, claims: Claims },
    Synthesized { raw: String, claims: Claims },
}

impl Credential {
    /// Decode a credential from its encoded form (does not verify signature)
    ///
    /// Requires exactly 3 dot-separated segments and a payload that parses
    /// as a claims mapping with at least `subjectId` and a numeric
    /// `expiresAt`. Any failure yields `Error::MalformedToken`.
    pub fn decode(raw: &str) -> Result<Self> {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() != 3 {
            return Err(Error::MalformedToken("expected 3 token segments".into()));
        }

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|e| Error::MalformedToken(format!("payload is not base64url: {}", e)))?;

        let claims: Claims = serde_json::from_slice(&payload_bytes)
            .map_err(|e| Error::MalformedToken(format!("payload is not a claims mapping: {}", e)))?;

        // A persisted fallback credential decodes back into its own variant
        if claims.issuer.as_deref() == Some(SYNTHESIZED_ISSUER) {
            Ok(Self::Synthesized {
                raw: raw.to_string(),
                claims,
            })
        } else {
            Ok(Self::Real {
                raw: raw.to_string(),
                claims,
            })
        }
    }

    /// Synthesize a fallback credential when the identity exchange omits one
    ///
    /// The claims are locally chosen (`issued_at = now`, `expires_at = now +
    /// ttl`) and the signature segment is a placeholder, since no trusted
    /// signer is available on the client.
    pub fn synthesize(
        subject_id: &str,
        email: Option<&str>,
        ttl: Duration,
        issuer: &str,
    ) -> Self {
        let now = Utc::now();
        let claims = Claims {
            subject_id: subject_id.to_string(),
            email: email.map(str::to_string),
            issued_at: now.timestamp(),
            expires_at: (now + ttl).timestamp(),
            issuer: Some(issuer.to_string()),
        };

        let raw = Self::encode(&claims);
        Self::Synthesized { raw, claims }
    }

    /// Wrap a service-issued token that did not decode
    ///
    /// The raw token is kept verbatim (it is what the remote service
    /// expects back), but the claims are derived locally from the
    /// principal, so the credential is classified as synthesized.
    pub fn from_opaque(
        raw: &str,
        subject_id: &str,
        email: Option<&str>,
        ttl: Duration,
        issuer: &str,
    ) -> Self {
        let now = Utc::now();
        let claims = Claims {
            subject_id: subject_id.to_string(),
            email: email.map(str::to_string),
            issued_at: now.timestamp(),
            expires_at: (now + ttl).timestamp(),
            issuer: Some(issuer.to_string()),
        };
        Self::Synthesized {
            raw: raw.to_string(),
            claims,
        }
    }

    /// Get the encoded token
    pub fn raw(&self) -> &str {
        match self {
            Self::Real { raw, .. } | Self::Synthesized { raw, .. } => raw,
        }
    }

    /// Get the decoded claims
    pub fn claims(&self) -> &Claims {
        match self {
            Self::Real { claims, .. } | Self::Synthesized { claims, .. } => claims,
        }
    }

    /// Whether this credential was fabricated locally
    pub fn is_synthesized(&self) -> bool {
        matches!(self, Self::Synthesized { .. })
    }

    // Internal: encode claims into a syntactically valid 3-segment token
    fn encode(claims: &Claims) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let header = r#"{"alg":"none","typ":"JWT"}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header);

        // Claims serialization cannot fail: all fields are plain scalars
        let payload_json = serde_json::to_string(claims).unwrap_or_default();
        let payload_b64 = URL_SAFE_NO_PAD.encode(&payload_json);

        format!("{}.{}.{}", header_b64, payload_b64, SYNTHESIZED_SIGNATURE)
    }
}
