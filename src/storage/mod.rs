/// Persistence boundary.
///
/// The token lifecycle core only ever talks to these traits. The Postgres
/// implementation backs the running service; the in-memory implementation
/// backs the test suite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Identity record. `password_hash` is a bcrypt hash, never plaintext.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The one live refresh association a user may have, keyed by user id and
/// holding a digest of the refresh token rather than the token itself.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user. Fails with a duplicate-entry error if the email is
    /// already registered.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Delete a user. Fails with a not-found error if no such user exists.
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Create-or-replace the single record for `user_id`.
    async fn upsert(&self, user_id: Uuid, token_hash: &str) -> Result<(), AppError>;

    /// Delete the record for `user_id` only if its stored digest equals
    /// `token_hash`, returning whether a record was deleted.
    ///
    /// The compare-and-delete must be atomic: of two concurrent callers
    /// presenting the same digest, at most one may observe `true`.
    async fn delete_matching(&self, user_id: Uuid, token_hash: &str) -> Result<bool, AppError>;

    /// Delete the record for `user_id` unconditionally, if present.
    async fn delete(&self, user_id: Uuid) -> Result<(), AppError>;

    async fn find(&self, user_id: Uuid) -> Result<Option<RefreshTokenRecord>, AppError>;
}
