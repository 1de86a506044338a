//! Input validation for registration and profile updates.
//!
//! Validation runs before any store access so malformed input never reaches
//! the credential store or the rate-limit bookkeeping for real attempts.

use std::sync::LazyLock;

use regex::Regex;

use crate::AuthError;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Maximum password length accepted at registration.
pub const MAX_PASSWORD_LENGTH: usize = 128;
/// Maximum length for first/last names.
pub const MAX_NAME_LENGTH: usize = 100;

/// Validates email syntax and length.
pub fn validate_email(email: &str) -> Result<(), AuthError> {
    if email.is_empty() {
        return Err(AuthError::ValidationError("email cannot be empty".into()));
    }
    if email.len() > 254 {
        return Err(AuthError::ValidationError(
            "email is too long (max 254 characters)".into(),
        ));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err(AuthError::ValidationError("invalid email format".into()));
    }
    Ok(())
}

/// Validates password length bounds.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::ValidationError(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::ValidationError(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validates a first or last name: non-empty after trimming, bounded length.
pub fn validate_name(name: &str) -> Result<(), AuthError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AuthError::ValidationError("name cannot be empty".into()));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(AuthError::ValidationError(format!(
            "name is too long (max {MAX_NAME_LENGTH} characters)"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user.name+tag@sub.example.com").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        assert!(validate_email("").is_err());
        assert!(validate_email("notanemail").is_err());
        assert!(validate_email("missing@domain").is_err());
        assert!(validate_email("spaces in@email.com").is_err());
        let long_email = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long_email).is_err());
    }

    #[test]
    fn test_password_bounds() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
        assert!(validate_password(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_name_bounds() {
        assert!(validate_name("Ada").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }
}
