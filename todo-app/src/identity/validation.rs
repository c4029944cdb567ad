//! Client-side checks run before any auth call is made.

use crate::identity::{LoginForm, RegistrationForm};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub const MIN_DISPLAY_NAME_LEN: usize = 5;
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Rejections of malformed or missing form input.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Display name must be at least 5 characters long")]
    DisplayNameTooShort,
    #[error("Password must be at least 8 characters long")]
    PasswordTooShort,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Please enter a valid email address")]
    InvalidEmail,
}

/// Checks a registration form. The first failing rule wins, in the order the form shows them.
pub fn validate_registration(form: &RegistrationForm) -> Result<(), ValidationError> {
    if [
        &form.display_name,
        &form.email,
        &form.password,
        &form.confirm_password,
    ]
    .iter()
    .any(|field| field.is_empty())
    {
        return Err(ValidationError::MissingFields);
    }
    if form.display_name.chars().count() < MIN_DISPLAY_NAME_LEN {
        return Err(ValidationError::DisplayNameTooShort);
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    if form.password != form.confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if !is_valid_email(&form.email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_login(form: &LoginForm) -> Result<(), ValidationError> {
    if form.email.is_empty() || form.password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    Ok(())
}

/// A loose `local@domain.tld` shape check. Deliverability is the provider's business.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}
