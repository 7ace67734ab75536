use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CredentialStore, PageRequest, RevocationStore, RevokedToken, User};
use crate::error::StoreError;

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

/// Process-local credential store. Users are kept in insertion order.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(poisoned)?;
        // Checked under the write lock so concurrent registrations cannot both win
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users
            .iter()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }
        let existing = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))?;
        existing.username = user.username.clone();
        existing.email = user.email.clone();
        existing.password_hash = user.password_hash.clone();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut users = self.users.write().map_err(poisoned)?;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<User>, StoreError> {
        let users = self.users.read().map_err(poisoned)?;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        Ok(users
            .iter()
            .skip(offset)
            .take(page.per_page as usize)
            .cloned()
            .collect())
    }
}

/// Process-local blocklist keyed by jti
#[derive(Default)]
pub struct InMemoryRevocationStore {
    revoked: RwLock<HashMap<String, RevokedToken>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.revoked.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn add(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut revoked = self.revoked.write().map_err(poisoned)?;
        revoked
            .entry(jti.to_string())
            .or_insert_with(|| RevokedToken {
                jti: jti.to_string(),
                revoked_at: Utc::now(),
                expires_at,
            });
        Ok(())
    }

    async fn exists(&self, jti: &str) -> Result<bool, StoreError> {
        let revoked = self.revoked.read().map_err(poisoned)?;
        Ok(revoked.contains_key(jti))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut revoked = self.revoked.write().map_err(poisoned)?;
        let before = revoked.len();
        revoked.retain(|_, entry| entry.expires_at >= now);
        Ok((before - revoked.len()) as u64)
    }
}
