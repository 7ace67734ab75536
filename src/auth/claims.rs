/// JWT Claims structure
///
/// Payload of every token the service signs: registered claims (RFC 7519)
/// plus the token type, freshness flag and any additional claims derived
/// for the subject.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Additional claims embedded in an access token, e.g. `{"employee": true}`
pub type AdditionalClaims = Map<String, Value>;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT Claims for access and refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,
    /// Unique token id, the revocation key
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued directly from a login rather than from a refresh
    #[serde(default)]
    pub fresh: bool,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    #[serde(flatten)]
    pub extra: AdditionalClaims,
}

impl TokenClaims {
    /// Create new claims with a fresh jti
    ///
    /// # Arguments
    /// * `subject` - Username the token is issued to
    /// * `token_type` - Access or refresh
    /// * `expiry_seconds` - Token lifetime in seconds from now
    /// * `issuer` - Issuer identifier
    pub fn new(
        subject: impl Into<String>,
        token_type: TokenType,
        expiry_seconds: i64,
        issuer: impl Into<String>,
    ) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: subject.into(),
            jti: Uuid::new_v4().to_string(),
            token_type,
            fresh: false,
            iat: now,
            exp: now.saturating_add(expiry_seconds),
            iss: issuer.into(),
            extra: AdditionalClaims::new(),
        }
    }

    pub fn with_fresh(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    pub fn with_claims(mut self, claims: AdditionalClaims) -> Self {
        self.extra = claims;
        self
    }

    /// Whether the `employee` claim is present and true
    pub fn is_employee(&self) -> bool {
        self.extra.get("employee").and_then(Value::as_bool) == Some(true)
    }

    /// Expiry as a timestamp, for storing alongside a revoked jti
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
