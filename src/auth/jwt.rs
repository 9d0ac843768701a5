/// Token encoding and verification
///
/// HS256-signed tokens; forging one requires the process-wide signing
/// secret. Encoding and decoding are pure functions of their inputs plus the
/// injected clock.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenType};
use crate::auth::clock::Clock;
use crate::configuration::JwtSettings;
use crate::error::{AppError, TokenError};

/// Sign a token of the given kind for `user_id`, expiring after the kind's
/// configured window counted from the clock's current time.
///
/// # Errors
/// Returns an error if signing fails.
pub fn encode_token(
    user_id: &Uuid,
    token_type: TokenType,
    config: &JwtSettings,
    clock: &dyn Clock,
) -> Result<String, AppError> {
    let claims = Claims::new(*user_id, token_type, clock.now(), config);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Verify a token string and return its claims.
///
/// Checks run in a fixed order: signature, structure, expiry, kind. A token
/// that fails the signature check is rejected before its contents are
/// inspected, so nothing downstream of the signature leaks through the
/// error.
pub fn decode_token(
    token: &str,
    expected: TokenType,
    config: &JwtSettings,
    clock: &dyn Clock,
) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    // Expiry is checked below against the injected clock, not the library's
    // view of the current time.
    validation.validate_exp = false;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        _ => TokenError::Malformed,
    })?;

    if claims.exp < clock.now().timestamp() {
        return Err(TokenError::Expired);
    }

    if claims.token_type != expected {
        return Err(TokenError::TypeMismatch);
    }

    Ok(claims)
}
