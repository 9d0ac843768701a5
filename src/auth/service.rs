/// Token lifecycle orchestration
///
/// Credential checks, token issuance, refresh rotation, and the
/// authorization check for protected requests. Each operation performs at
/// most one store read plus one store write; the refresh race is decided by
/// the store's atomic compare-and-delete.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::claims::TokenType;
use crate::auth::clock::Clock;
use crate::auth::jwt::{decode_token, encode_token};
use crate::auth::password::{hash_password, verify_password};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::storage::{RefreshTokenStore, User, UserStore};
use crate::validators::is_valid_email;

/// Freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    jwt_config: JwtSettings,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        jwt_config: JwtSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            jwt_config,
            clock,
        }
    }

    pub fn config(&self) -> &JwtSettings {
        &self.jwt_config
    }

    /// Register a new account. The hash is computed before anything is
    /// persisted.
    pub async fn register(&self, email: &str, password: &str) -> Result<Uuid, AppError> {
        let email = is_valid_email(email)?;
        let password_hash = hash_password(password)?;

        let user = self.users.create(&email, &password_hash).await?;
        tracing::info!(user_id = %user.id, "user registered");

        Ok(user.id)
    }

    /// Check a submitted email/password pair.
    ///
    /// Unknown email and wrong password produce the same failure; callers
    /// cannot enumerate registered accounts through this path.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Uuid, AppError> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => return Err(AuthError::InvalidCredentials.into()),
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(user.id)
    }

    /// Mint an access/refresh pair for an authenticated user and persist the
    /// refresh association, replacing any prior record for that user.
    pub async fn issue_tokens(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        let access_token =
            encode_token(&user_id, TokenType::Access, &self.jwt_config, self.clock.as_ref())?;
        let refresh_token =
            encode_token(&user_id, TokenType::Refresh, &self.jwt_config, self.clock.as_ref())?;

        self.refresh_tokens
            .upsert(user_id, &hash_token(&refresh_token))
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Rotate a refresh token.
    ///
    /// The presented token must verify as a refresh token AND still match
    /// the stored association; it is consumed in the process, so presenting
    /// the same token twice succeeds at most once.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = decode_token(
            refresh_token,
            TokenType::Refresh,
            &self.jwt_config,
            self.clock.as_ref(),
        )?;
        let user_id = claims.user_id()?;

        let consumed = self
            .refresh_tokens
            .delete_matching(user_id, &hash_token(refresh_token))
            .await?;
        if !consumed {
            // Already rotated out or revoked; a replayed token lands here.
            tracing::warn!(user_id = %user_id, "refresh token no longer matches the stored record");
            return Err(AuthError::Unauthorized.into());
        }

        self.issue_tokens(user_id).await
    }

    /// Resolve the caller's identity from an access token.
    ///
    /// Stateless: no store access. The precise decode failure stays in the
    /// error for logging; clients only ever see a generic rejection.
    pub fn authorize(&self, access_token: &str) -> Result<Uuid, AppError> {
        let claims = decode_token(
            access_token,
            TokenType::Access,
            &self.jwt_config,
            self.clock.as_ref(),
        )?;
        claims.user_id()
    }

    /// Drop the caller's refresh association. An outstanding access token
    /// stays valid until its natural expiry.
    pub async fn logout(&self, user_id: Uuid) -> Result<(), AppError> {
        self.refresh_tokens.delete(user_id).await?;
        tracing::info!(user_id = %user_id, "user logged out");
        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound("user not found".to_string()).into())
    }

    /// Delete an account, refresh association first so a half-completed
    /// deletion can never leave a renewable session behind.
    pub async fn delete_account(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(DatabaseError::NotFound("user not found".to_string()).into());
        }

        self.refresh_tokens.delete(user_id).await?;
        self.users.delete(user_id).await?;
        tracing::info!(user_id = %user_id, "account deleted");

        Ok(())
    }
}

/// Stored refresh associations hold a digest of the token, never the token.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::FixedClock;
    use crate::error::TokenError;
    use crate::storage::InMemoryStore;
    use chrono::{Duration, Utc};

    fn test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    fn test_service() -> (AuthService, Arc<InMemoryStore>, Arc<FixedClock>) {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let service = AuthService::new(
            store.clone(),
            store.clone(),
            test_config(),
            clock.clone(),
        );
        (service, store, clock)
    }

    async fn register(service: &AuthService) -> Uuid {
        service
            .register("a@x.com", "password1")
            .await
            .expect("registration failed")
    }

    #[tokio::test]
    async fn authenticate_accepts_valid_credentials() {
        let (service, _, _) = test_service();
        let user_id = register(&service).await;

        let resolved = service.authenticate("a@x.com", "password1").await.unwrap();
        assert_eq!(resolved, user_id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_fail_identically() {
        let (service, _, _) = test_service();
        register(&service).await;

        let wrong_password = service
            .authenticate("a@x.com", "password2")
            .await
            .unwrap_err();
        let unknown_email = service
            .authenticate("b@x.com", "password1")
            .await
            .unwrap_err();

        assert!(matches!(
            wrong_password,
            AppError::Auth(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            unknown_email,
            AppError::Auth(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn issued_access_token_authorizes_as_the_issuing_user() {
        let (service, _, _) = test_service();
        let user_id = register(&service).await;

        let pair = service.issue_tokens(user_id).await.unwrap();
        assert_eq!(service.authorize(&pair.access_token).unwrap(), user_id);
    }

    #[tokio::test]
    async fn issue_persists_a_digest_of_the_refresh_token() {
        let (service, store, _) = test_service();
        let user_id = register(&service).await;

        let pair = service.issue_tokens(user_id).await.unwrap();

        let record = store.find(user_id).await.unwrap().expect("record missing");
        assert_eq!(record.token_hash, hash_token(&pair.refresh_token));
        assert_ne!(record.token_hash, pair.refresh_token);
    }

    #[tokio::test]
    async fn refresh_rotation_is_single_use() {
        let (service, _, _) = test_service();
        let user_id = register(&service).await;
        let original = service.issue_tokens(user_id).await.unwrap();

        let rotated = service.refresh_tokens(&original.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, original.refresh_token);

        // Replaying the consumed token must fail.
        let replay = service
            .refresh_tokens(&original.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(replay, AppError::Auth(AuthError::Unauthorized)));

        // The replacement still works.
        assert!(service.refresh_tokens(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn repeated_refreshes_keep_exactly_one_record() {
        let (service, store, _) = test_service();
        let user_id = register(&service).await;

        let mut pair = service.issue_tokens(user_id).await.unwrap();
        for _ in 0..2 {
            pair = service.refresh_tokens(&pair.refresh_token).await.unwrap();
        }

        let record = store.find(user_id).await.unwrap().expect("record missing");
        assert_eq!(record.token_hash, hash_token(&pair.refresh_token));
    }

    #[tokio::test]
    async fn an_access_token_cannot_be_used_to_refresh() {
        let (service, _, _) = test_service();
        let user_id = register(&service).await;
        let pair = service.issue_tokens(user_id).await.unwrap();

        let err = service.refresh_tokens(&pair.access_token).await.unwrap_err();
        assert!(matches!(err, AppError::Token(TokenError::TypeMismatch)));
    }

    #[tokio::test]
    async fn a_refresh_token_cannot_be_used_to_authorize() {
        let (service, _, _) = test_service();
        let user_id = register(&service).await;
        let pair = service.issue_tokens(user_id).await.unwrap();

        let err = service.authorize(&pair.refresh_token).unwrap_err();
        assert!(matches!(err, AppError::Token(TokenError::TypeMismatch)));
    }

    #[tokio::test]
    async fn expired_access_token_is_rejected() {
        let (service, _, clock) = test_service();
        let user_id = register(&service).await;
        let pair = service.issue_tokens(user_id).await.unwrap();

        clock.advance(Duration::seconds(901));

        let err = service.authorize(&pair.access_token).unwrap_err();
        assert!(matches!(err, AppError::Token(TokenError::Expired)));
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected() {
        let (service, _, clock) = test_service();
        let user_id = register(&service).await;
        let pair = service.issue_tokens(user_id).await.unwrap();

        clock.advance(Duration::seconds(604801));

        let err = service.refresh_tokens(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Token(TokenError::Expired)));
    }

    #[tokio::test]
    async fn logout_revokes_refresh_but_not_the_live_access_token() {
        let (service, _, _) = test_service();
        let user_id = register(&service).await;
        let pair = service.issue_tokens(user_id).await.unwrap();

        service.logout(user_id).await.unwrap();

        let err = service.refresh_tokens(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::Unauthorized)));

        // Stateless access tokens remain valid until natural expiry.
        assert_eq!(service.authorize(&pair.access_token).unwrap(), user_id);
    }

    #[tokio::test]
    async fn token_signed_under_another_secret_does_not_authorize() {
        let (service, _, _) = test_service();
        register(&service).await;

        let mut other_config = test_config();
        other_config.secret = "another-secret-also-32-characters-long!!".to_string();
        let other_store = Arc::new(InMemoryStore::new());
        let other = AuthService::new(
            other_store.clone(),
            other_store,
            other_config,
            Arc::new(FixedClock::new(Utc::now())),
        );
        let foreign_user = other.register("a@x.com", "password1").await.unwrap();
        let foreign_pair = other.issue_tokens(foreign_user).await.unwrap();

        let err = service.authorize(&foreign_pair.access_token).unwrap_err();
        assert!(matches!(
            err,
            AppError::Token(TokenError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn delete_account_cascades_to_the_refresh_record() {
        let (service, store, _) = test_service();
        let user_id = register(&service).await;
        service.issue_tokens(user_id).await.unwrap();

        service.delete_account(user_id).await.unwrap();

        assert!(store.find(user_id).await.unwrap().is_none());
        assert!(store.find_by_id(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_an_unknown_account_reports_not_found() {
        let (service, _, _) = test_service();

        let err = service.delete_account(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Database(DatabaseError::NotFound(_))
        ));
    }
}
