/// Token payload
///
/// Both token kinds carry the same claims and differ only in their `type`
/// and validity window. A refresh token additionally carries a random `jti`
/// so two refresh tokens minted at the same instant are distinct strings;
/// rotation relies on the replacement being distinguishable from the token
/// it replaces.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::configuration::JwtSettings;
use crate::error::AppError;

const JTI_LENGTH: usize = 16;

/// The two token kinds. A token presented as the wrong kind is rejected even
/// when its signature is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    /// Configured validity window in seconds for this kind.
    pub fn expiry_seconds(&self, config: &JwtSettings) -> i64 {
        match self {
            TokenType::Access => config.access_token_expiry,
            TokenType::Refresh => config.refresh_token_expiry,
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
    /// Random nonce, refresh tokens only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl Claims {
    /// Build claims for `user_id` valid from `now` for the configured window
    /// of `token_type`.
    pub fn new(
        user_id: Uuid,
        token_type: TokenType,
        now: DateTime<Utc>,
        config: &JwtSettings,
    ) -> Self {
        let iat = now.timestamp();
        let jti = match token_type {
            TokenType::Access => None,
            TokenType::Refresh => Some(random_jti()),
        };

        Self {
            sub: user_id.to_string(),
            token_type,
            iat,
            exp: iat + token_type.expiry_seconds(config),
            iss: config.issuer.clone(),
            jti,
        }
    }

    /// Extract the subject as a UUID.
    ///
    /// # Errors
    /// Returns an error if the subject is not a valid UUID.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Internal("Invalid user ID in token".to_string()))
    }
}

fn random_jti() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JTI_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "test".to_string(),
        }
    }

    #[test]
    fn validity_window_matches_the_configured_duration_per_kind() {
        let config = test_config();
        let now = Utc::now();

        let access = Claims::new(Uuid::new_v4(), TokenType::Access, now, &config);
        assert_eq!(access.exp - access.iat, 900);

        let refresh = Claims::new(Uuid::new_v4(), TokenType::Refresh, now, &config);
        assert_eq!(refresh.exp - refresh.iat, 604800);
    }

    #[test]
    fn only_refresh_claims_carry_a_jti() {
        let config = test_config();
        let now = Utc::now();

        let access = Claims::new(Uuid::new_v4(), TokenType::Access, now, &config);
        assert!(access.jti.is_none());

        let refresh = Claims::new(Uuid::new_v4(), TokenType::Refresh, now, &config);
        let jti = refresh.jti.expect("refresh claims missing jti");
        assert_eq!(jti.len(), JTI_LENGTH);
    }

    #[test]
    fn user_id_round_trips_through_sub() {
        let config = test_config();
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, TokenType::Access, Utc::now(), &config);

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn garbage_sub_is_rejected() {
        let config = test_config();
        let mut claims = Claims::new(Uuid::new_v4(), TokenType::Access, Utc::now(), &config);
        claims.sub = "not-a-uuid".to_string();

        assert!(claims.user_id().is_err());
    }

    #[test]
    fn token_type_serializes_lowercase_under_type_key() {
        let config = test_config();
        let claims = Claims::new(Uuid::new_v4(), TokenType::Access, Utc::now(), &config);
        let json = serde_json::to_value(&claims).unwrap();

        assert_eq!(json["type"], "access");
    }
}
