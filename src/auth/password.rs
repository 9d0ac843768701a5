/// Password hashing and verification
///
/// bcrypt on both sides of the credential check, plus the strength rules
/// applied at registration time. The hash is computed before the user record
/// is persisted; plaintext never reaches a store.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
// bcrypt ignores input past 72 bytes; reject instead of silently truncating.
const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password for storage.
///
/// # Errors
/// Returns an error if the password fails the strength rules or hashing
/// itself fails.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a submitted password against a stored hash.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    verify(password, password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        ));
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_numeric());

    if !has_letter || !has_digit {
        return Err(ValidationError::InvalidFormat(
            "password must contain at least one letter and one digit".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_never_the_plaintext() {
        let password = "correct horse 1";
        let password_hash = hash_password(password).expect("failed to hash password");

        assert_ne!(password, password_hash);
        assert!(password_hash.starts_with("$2"));
    }

    #[test]
    fn matching_password_verifies() {
        let password = "correct horse 1";
        let password_hash = hash_password(password).expect("failed to hash password");

        assert!(verify_password(password, &password_hash).unwrap());
    }

    #[test]
    fn wrong_password_does_not_verify() {
        let password_hash = hash_password("correct horse 1").expect("failed to hash password");

        assert!(!verify_password("wrong horse 1", &password_hash).unwrap());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(hash_password("abc1").is_err());
    }

    #[test]
    fn overlong_password_is_rejected() {
        let long = format!("a1{}", "x".repeat(MAX_PASSWORD_LENGTH));
        assert!(hash_password(&long).is_err());
    }

    #[test]
    fn password_without_a_digit_is_rejected() {
        assert!(hash_password("lettersonly").is_err());
    }

    #[test]
    fn password_without_a_letter_is_rejected() {
        assert!(hash_password("1234567890").is_err());
    }
}
