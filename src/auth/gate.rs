/// Authorization Gate
///
/// The single place where a caller-supplied credential is turned into
/// verified claims. The actix-web middleware in `crate::middleware` is a thin
/// adapter over [`authorize`].

use crate::auth::claims::{TokenClaims, TokenType};
use crate::auth::jwt::TokenService;
use crate::error::{AppError, AuthError};

/// Per-operation token requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirements {
    /// Let requests without a token through unauthenticated
    pub optional: bool,
    /// Require a refresh token instead of an access token
    pub refresh: bool,
    /// When false, accept either token type
    pub verify_type: bool,
    /// Require a token minted directly at login
    pub fresh: bool,
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            optional: false,
            refresh: false,
            verify_type: true,
            fresh: false,
        }
    }
}

impl Requirements {
    /// A valid access token
    pub fn access() -> Self {
        Self::default()
    }

    /// A valid refresh token
    pub fn refresh() -> Self {
        Self {
            refresh: true,
            ..Self::default()
        }
    }

    /// Any valid token, access or refresh
    pub fn any_type() -> Self {
        Self {
            verify_type: false,
            ..Self::default()
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn fresh(mut self) -> Self {
        self.fresh = true;
        self
    }

    fn required_type(&self) -> Option<TokenType> {
        match (self.verify_type, self.refresh) {
            (false, _) => None,
            (true, true) => Some(TokenType::Refresh),
            (true, false) => Some(TokenType::Access),
        }
    }
}

/// Pull the token out of an `Authorization` header value
///
/// # Errors
/// `TokenInvalid` if the header is not of the form `Bearer <token>`
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.trim().splitn(2, ' ');
    match (parts.next(), parts.next().map(str::trim)) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(token)
        }
        _ => Err(AuthError::TokenInvalid),
    }
}

/// Run the gate for one request
///
/// Returns `Ok(None)` only when no header was supplied and the requirements
/// allow anonymous access.
pub async fn authorize(
    tokens: &TokenService,
    header: Option<&str>,
    requirements: &Requirements,
) -> Result<Option<TokenClaims>, AppError> {
    let header = match header {
        Some(header) => header,
        None if requirements.optional => return Ok(None),
        None => return Err(AuthError::TokenMissing.into()),
    };

    let token = bearer_token(header)?;
    let claims = tokens
        .verify(token, requirements.required_type(), requirements.fresh)
        .await?;

    Ok(Some(claims))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use actix_web::{http::StatusCode, ResponseError};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::auth::policy::EmployeeAllowlist;
    use crate::configuration::JwtSettings;
    use crate::error::StoreError;
    use crate::store::{InMemoryRevocationStore, RevocationStore};

    struct OfflineBlocklist;

    #[async_trait]
    impl RevocationStore for OfflineBlocklist {
        async fn add(&self, _jti: &str, _expires_at: DateTime<Utc>) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("pool timed out".to_string()))
        }

        async fn exists(&self, _jti: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("pool timed out".to_string()))
        }

        async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("pool timed out".to_string()))
        }
    }

    fn service() -> TokenService {
        service_backed_by(Arc::new(InMemoryRevocationStore::new()))
    }

    fn service_backed_by(revocations: Arc<dyn RevocationStore>) -> TokenService {
        let config = JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
            leeway: 0,
            employees: vec![],
        };
        TokenService::new(&config, revocations, Arc::new(EmployeeAllowlist::default()))
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Ok("abc"));
        assert_eq!(bearer_token("bearer abc"), Ok("abc"));
        assert_eq!(bearer_token("Basic abc"), Err(AuthError::TokenInvalid));
        assert_eq!(bearer_token("Bearer"), Err(AuthError::TokenInvalid));
        assert_eq!(bearer_token("Bearer   "), Err(AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_missing_token() {
        let err = authorize(&service(), None, &Requirements::access()).await.unwrap_err();
        assert_eq!(err.auth_kind(), Some(&AuthError::TokenMissing));
    }

    #[tokio::test]
    async fn test_optional_allows_anonymous() {
        let result = authorize(&service(), None, &Requirements::access().optional()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_optional_still_rejects_bad_tokens() {
        let header = bearer("garbage");
        let err = authorize(&service(), Some(&header), &Requirements::access().optional())
            .await
            .unwrap_err();
        assert_eq!(err.auth_kind(), Some(&AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_access_requirement_rejects_refresh_token() {
        let tokens = service();
        let header = bearer(&tokens.issue_refresh_token("alice").unwrap());

        let err = authorize(&tokens, Some(&header), &Requirements::access()).await.unwrap_err();
        assert_eq!(err.auth_kind(), Some(&AuthError::TokenInvalid));

        let claims = authorize(&tokens, Some(&header), &Requirements::refresh())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[tokio::test]
    async fn test_any_type_accepts_both() {
        let tokens = service();
        let pair = tokens.issue_pair("alice").unwrap();

        for token in [pair.access_token, pair.refresh_token] {
            let header = bearer(&token);
            let claims = authorize(&tokens, Some(&header), &Requirements::any_type()).await.unwrap();
            assert_eq!(claims.unwrap().sub, "alice");
        }
    }

    #[tokio::test]
    async fn test_fresh_requirement() {
        let tokens = service();
        let stale = bearer(&tokens.access_token_for("alice", false).unwrap());

        let err = authorize(&tokens, Some(&stale), &Requirements::access().fresh())
            .await
            .unwrap_err();
        assert_eq!(err.auth_kind(), Some(&AuthError::TokenNotFresh));
    }

    #[tokio::test]
    async fn test_revoked_token_is_rejected() {
        let tokens = service();
        let token = tokens.access_token_for("alice", true).unwrap();
        let header = bearer(&token);

        let claims = authorize(&tokens, Some(&header), &Requirements::any_type())
            .await
            .unwrap()
            .unwrap();
        tokens.revoke(&claims).await.unwrap();

        let err = authorize(&tokens, Some(&header), &Requirements::any_type())
            .await
            .unwrap_err();
        assert_eq!(err.auth_kind(), Some(&AuthError::TokenRevoked));
    }

    #[tokio::test]
    async fn test_blocklist_outage_is_a_server_error() {
        let tokens = service_backed_by(Arc::new(OfflineBlocklist));
        let header = bearer(&tokens.access_token_for("alice", true).unwrap());

        let err = authorize(&tokens, Some(&header), &Requirements::access())
            .await
            .unwrap_err();
        assert!(err.auth_kind().is_none());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
