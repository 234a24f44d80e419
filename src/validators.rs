/// Input validators for the HTTP boundary
///
/// Requests are checked here before they reach `AuthService`:
/// 1. Emails are trimmed, lower-cased and format-checked
/// 2. New passwords must fit bcrypt's input limit
/// 3. Required fields must be non-empty

use lazy_static::lazy_static;
use regex::Regex;

use crate::auth::MAX_SECRET_BYTES;
use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;
const MIN_PASSWORD_LENGTH: usize = 6;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$"
    ).unwrap();
}

/// Lookup key for an email: trimmed and lower-cased.
///
/// Emails are compared case-insensitively, so this is the form every store
/// sees.
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate an email address and return it in normalized form.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let normalized = email_key(email);

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if normalized.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }

    if normalized.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(normalized)
}

/// Validate a password chosen at registration
pub fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    // bcrypt silently ignores everything past this
    if password.len() > MAX_SECRET_BYTES {
        return Err(ValidationError::TooLong("password".to_string(), MAX_SECRET_BYTES));
    }

    Ok(())
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    Ok(())
}
