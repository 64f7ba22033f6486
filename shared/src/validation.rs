use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PHONE_NUMBER_DIGITS, VERIFICATION_CODE_LENGTH};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

// `\d` is Unicode-aware in the regex crate; phone numbers are ASCII only.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^[0-9]{{{PHONE_NUMBER_DIGITS}}}$")).expect("phone pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("verification code incomplete ({filled} of {} cells)", VERIFICATION_CODE_LENGTH)]
    IncompleteCode { filled: usize },
    #[error("profile form has {0} invalid field(s)")]
    InvalidForm(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    FirstName,
    LastName,
    Email,
    PhoneNumber,
}

impl ProfileField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "first name",
            Self::LastName => "last name",
            Self::Email => "email",
            Self::PhoneNumber => "phone number",
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone)
}

#[must_use]
pub fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Cuts `text` to at most `max` bytes without splitting a character.
#[must_use]
pub fn truncate_on_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// --- Bounded text ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct BoundedText<const MAX: usize>(String);

impl<const MAX: usize> BoundedText<MAX> {
    /// Accepts any input, keeping the longest prefix that fits.
    #[must_use]
    pub fn truncated(s: &str) -> Self {
        Self(truncate_on_char_boundary(s, MAX).to_owned())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub type Description = BoundedText<{ crate::MAX_DESCRIPTION_BYTES }>;
