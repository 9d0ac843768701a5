/// In-memory stores.
///
/// Backs the test suite so the full flow runs without a database. Each map
/// sits behind one mutex, which makes the compare-and-delete on refresh
/// records atomic with respect to concurrent refresh attempts.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, DatabaseError};
use crate::storage::{RefreshTokenRecord, RefreshTokenStore, User, UserStore};

#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    refresh_tokens: Mutex<HashMap<Uuid, RefreshTokenRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned() -> AppError {
    AppError::Internal("store lock poisoned".to_string())
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let mut users = self.users.lock().map_err(|_| lock_poisoned())?;

        if users.values().any(|u| u.email == email) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            )
            .into());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().map_err(|_| lock_poisoned())?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.lock().map_err(|_| lock_poisoned())?;
        Ok(users.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut users = self.users.lock().map_err(|_| lock_poisoned())?;

        if users.remove(&id).is_none() {
            return Err(DatabaseError::NotFound("user not found".to_string()).into());
        }

        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn upsert(&self, user_id: Uuid, token_hash: &str) -> Result<(), AppError> {
        let mut records = self.refresh_tokens.lock().map_err(|_| lock_poisoned())?;

        records.insert(
            user_id,
            RefreshTokenRecord {
                user_id,
                token_hash: token_hash.to_string(),
                created_at: Utc::now(),
            },
        );

        Ok(())
    }

    async fn delete_matching(&self, user_id: Uuid, token_hash: &str) -> Result<bool, AppError> {
        // Check and remove under one lock so racing callers see at most one
        // success.
        let mut records = self.refresh_tokens.lock().map_err(|_| lock_poisoned())?;

        match records.get(&user_id) {
            Some(record) if record.token_hash == token_hash => {
                records.remove(&user_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut records = self.refresh_tokens.lock().map_err(|_| lock_poisoned())?;
        records.remove(&user_id);
        Ok(())
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<RefreshTokenRecord>, AppError> {
        let records = self.refresh_tokens.lock().map_err(|_| lock_poisoned())?;
        Ok(records.get(&user_id).cloned())
    }
}
