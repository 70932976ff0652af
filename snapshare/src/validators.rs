use std::sync::LazyLock;

use email_address::EmailAddress;
use regex::Regex;
use url::Url;

use crate::errors::{ValidationError, ValidationResult};

/// Longest username accepted by profile writes.
pub const MAX_USERNAME_LENGTH: usize = 30;

static USERNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\S+$").expect("valid username regex"));

/// Returns `true` if the provided string is a syntactically valid email address.
pub fn is_valid_email(value: &str) -> bool {
    EmailAddress::is_valid(value)
}

/// Returns `true` if the provided string parses as a URL with a scheme.
pub fn is_valid_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Returns `true` for a non-empty username without whitespace that fits the length limit.
pub fn is_valid_username(value: &str) -> bool {
    value.chars().count() <= MAX_USERNAME_LENGTH && USERNAME_PATTERN.is_match(value)
}

/// Format check shared by sign-up, profile edits and profile writes.
pub fn validate_username(value: &str) -> ValidationResult<()> {
    if is_valid_username(value) {
        Ok(())
    } else {
        Err(ValidationError::single(
            "username",
            "validation.username",
            "username must be 1-30 characters without whitespace",
        ))
    }
}

/// Derives a username from a single-sign-on display name: whitespace removed, lowercased.
pub fn username_from_display_name(display_name: &str) -> String {
    display_name
        .split_whitespace()
        .collect::<String>()
        .to_lowercase()
}
