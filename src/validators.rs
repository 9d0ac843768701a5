/// Input validation for registration.
///
/// Length limits first (bounds the work the regex does on hostile input),
/// then format.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MIN_EMAIL_LENGTH: usize = 5;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MAX_LOCAL_PART_LENGTH: usize = 64;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();
}

/// Validate an email address, returning the trimmed form used for storage
/// and lookups.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort(
            "email".to_string(),
            MIN_EMAIL_LENGTH,
        ));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong(
            "email".to_string(),
            MAX_EMAIL_LENGTH,
        ));
    }

    if trimmed.matches('@').count() != 1 {
        return Err(ValidationError::InvalidFormat(
            "email has invalid format".to_string(),
        ));
    }

    // Overlong local parts pass the regex but no mail system accepts them.
    if let Some(at_pos) = trimmed.find('@') {
        if trimmed[..at_pos].len() > MAX_LOCAL_PART_LENGTH {
            return Err(ValidationError::InvalidFormat(
                "email has invalid format".to_string(),
            ));
        }
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat(
            "email has invalid format".to_string(),
        ));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        for email in ["a@x.com", "user.name+tag@example.co.uk", "x_1@host.io"] {
            assert!(is_valid_email(email).is_ok(), "rejected: {email}");
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(is_valid_email("  a@x.com  ").unwrap(), "a@x.com");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in [
            "",
            "notanemail",
            "user@",
            "@example.com",
            "user@@example.com",
            "user@ex ample.com",
        ] {
            assert!(is_valid_email(email).is_err(), "accepted: {email:?}");
        }
    }

    #[test]
    fn rejects_overlong_addresses() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&email).is_err());
    }

    #[test]
    fn rejects_overlong_local_part() {
        let email = format!("{}@example.com", "a".repeat(65));
        assert!(is_valid_email(&email).is_err());
    }
}
