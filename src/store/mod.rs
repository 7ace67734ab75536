/// Persistence layer
///
/// Repository traits for user credentials and revoked tokens, with a
/// Postgres implementation and an in-memory one. Entities are plain data;
/// persistence lives in the stores.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;

pub use memory::{InMemoryCredentialStore, InMemoryRevocationStore};
pub use postgres::{PgCredentialStore, PgRevocationStore};

/// A registered user as stored
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a new user with a freshly generated id
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Public view of a user; never carries the password hash
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// A revoked token identifier
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RevokedToken {
    pub jti: String,
    pub revoked_at: DateTime<Utc>,
    /// Expiry of the revoked token itself; the entry is useless afterwards
    pub expires_at: DateTime<Utc>,
}

/// One-based page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_PER_PAGE: u32 = 3;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Clamp caller-supplied values into a usable page
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE, Self::DEFAULT_PER_PAGE)
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new user. Fails with `StoreError::Duplicate` when the
    /// username is already taken.
    async fn create(&self, user: &User) -> Result<(), StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Overwrite username, email and password hash of an existing user
    async fn update(&self, user: &User) -> Result<(), StoreError>;

    /// Returns whether a user was removed
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Users ordered by creation time, then id
    async fn list(&self, page: PageRequest) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record a revoked jti. Adding an existing jti is a no-op.
    async fn add(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn exists(&self, jti: &str) -> Result<bool, StoreError>;

    /// Drop entries whose token expired before `now`. Returns how many.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps() {
        assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, per_page: 1 });
        assert_eq!(PageRequest::new(2, 1000).per_page, PageRequest::MAX_PER_PAGE);
        assert_eq!(PageRequest::default(), PageRequest { page: 1, per_page: 3 });
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(PageRequest::new(1, 3).offset(), 0);
        assert_eq!(PageRequest::new(3, 3).offset(), 6);
    }

    #[test]
    fn test_new_users_get_distinct_ids() {
        let a = User::new("a".into(), "a@x.com".into(), "h".into());
        let b = User::new("b".into(), "b@x.com".into(), "h".into());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_summary_drops_hash() {
        let user = User::new("alice".into(), "alice@x.com".into(), "secret-hash".into());
        let json = serde_json::to_value(UserSummary::from(user)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["username"], "alice");
    }
}
