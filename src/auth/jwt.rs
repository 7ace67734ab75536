/// Token Service
///
/// Issues, verifies and revokes signed access/refresh tokens. Claim
/// derivation and the revocation blocklist are injected so the service
/// carries no global state.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use crate::auth::claims::{AdditionalClaims, TokenClaims, TokenType};
use crate::auth::policy::ClaimsPolicy;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::store::RevocationStore;

/// Registered claim names that additional claims may not shadow
const RESERVED_CLAIMS: [&str; 7] = ["sub", "jti", "type", "fresh", "iat", "exp", "iss"];

/// Access and refresh token issued together at login
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    issuer: String,
    revocations: Arc<dyn RevocationStore>,
    policy: Arc<dyn ClaimsPolicy>,
}

impl TokenService {
    pub fn new(
        config: &JwtSettings,
        revocations: Arc<dyn RevocationStore>,
        policy: Arc<dyn ClaimsPolicy>,
    ) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss"]);
        validation.leeway = config.leeway;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            access_token_expiry: config.access_token_expiry,
            refresh_token_expiry: config.refresh_token_expiry,
            issuer: config.issuer.clone(),
            revocations,
            policy,
        }
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    /// Issue a signed access token carrying `claims`
    ///
    /// Keys in `claims` that collide with registered claims are dropped.
    pub fn issue_access_token(
        &self,
        subject: &str,
        mut claims: AdditionalClaims,
        fresh: bool,
    ) -> Result<String, AppError> {
        for key in RESERVED_CLAIMS {
            if claims.remove(key).is_some() {
                tracing::warn!(claim = key, "Dropping additional claim that shadows a registered claim");
            }
        }

        let claims = TokenClaims::new(subject, TokenType::Access, self.access_token_expiry, &self.issuer)
            .with_fresh(fresh)
            .with_claims(claims);
        self.sign(&claims)
    }

    /// Issue a signed refresh token; refresh tokens carry no additional claims
    pub fn issue_refresh_token(&self, subject: &str) -> Result<String, AppError> {
        let claims = TokenClaims::new(
            subject,
            TokenType::Refresh,
            self.refresh_token_expiry,
            &self.issuer,
        );
        self.sign(&claims)
    }

    /// Derive claims for `subject` through the policy and issue an access token
    pub fn access_token_for(&self, subject: &str, fresh: bool) -> Result<String, AppError> {
        let claims = self.policy.claims_for(subject);
        self.issue_access_token(subject, claims, fresh)
    }

    /// Fresh access token plus refresh token, as handed out at login
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.access_token_for(subject, true)?,
            refresh_token: self.issue_refresh_token(subject)?,
        })
    }

    /// Validate a token and return its claims
    ///
    /// Checks, in order: signature, structure, issuer and expiry; the token
    /// type when `require_type` is set; the revocation blocklist; freshness
    /// when `require_fresh` is set.
    ///
    /// # Errors
    /// `TokenExpired`, `TokenInvalid`, `TokenRevoked`, `TokenNotFresh`, or a
    /// store error if the blocklist cannot be queried
    pub async fn verify(
        &self,
        token: &str,
        require_type: Option<TokenType>,
        require_fresh: bool,
    ) -> Result<TokenClaims, AppError> {
        let claims = self.decode(token)?;

        if let Some(expected) = require_type {
            if claims.token_type != expected {
                tracing::warn!(
                    jti = %claims.jti,
                    expected = %expected,
                    actual = %claims.token_type,
                    "Token type mismatch"
                );
                return Err(AuthError::TokenInvalid.into());
            }
        }

        if self.revocations.exists(&claims.jti).await? {
            tracing::warn!(jti = %claims.jti, sub = %claims.sub, "Attempt to use revoked token");
            return Err(AuthError::TokenRevoked.into());
        }

        if require_fresh && !claims.fresh {
            return Err(AuthError::TokenNotFresh.into());
        }

        Ok(claims)
    }

    /// Put the token's jti on the blocklist. Revoking twice is a no-op.
    pub async fn revoke(&self, claims: &TokenClaims) -> Result<(), AppError> {
        self.revocations.add(&claims.jti, claims.expires_at()).await?;
        tracing::info!(
            jti = %claims.jti,
            sub = %claims.sub,
            token_type = %claims.token_type,
            "Token revoked"
        );
        Ok(())
    }

    /// Drop blocklist entries for tokens that `verify` now rejects as expired
    ///
    /// The cutoff trails the clock by the configured leeway, so an entry is
    /// only removed once its token is past `exp + leeway`.
    pub async fn purge_revocations(&self) -> Result<u64, AppError> {
        let leeway = i64::try_from(self.validation.leeway)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        let cutoff = Utc::now()
            .checked_sub_signed(leeway)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let purged = self.revocations.purge_expired(cutoff).await?;
        tracing::info!(purged = purged, cutoff = %cutoff, "Purged expired blocklist entries");
        Ok(purged)
    }

    fn sign(&self, claims: &TokenClaims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    fn decode(&self, token: &str) -> Result<TokenClaims, AppError> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::from(AuthError::TokenExpired),
                _ => {
                    tracing::warn!("JWT validation error: {}", e);
                    AppError::from(AuthError::TokenInvalid)
                }
            })
    }
}
