//! Input validation for user and account fields
//!
//! Each validator checks length first, then format, and returns the first
//! rule that fails.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidateEmail;

// ============================================================================
// Validation Errors
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Unsupported currency: '{0}'")]
    UnsupportedCurrency(String),
}

impl ValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidLength { field, .. } | Self::InvalidFormat { field, .. } => field,
            Self::UnsupportedCurrency(_) => "currency",
        }
    }
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    let actual = value.len();
    if actual < min || actual > max {
        return Err(ValidationError::InvalidLength {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}

/// Username: 3-100 characters of `a-z`, `0-9`, `_`
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    check_length("username", username, 3, 100)?;

    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "username",
            value: username.to_string(),
            expected: "lowercase letters, digits, underscore only",
        });
    }
    Ok(())
}

/// Full name: 3-100 characters of ASCII letters, whitespace, `-`
pub fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    check_length("full_name", full_name, 3, 100)?;

    if !full_name
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_ascii_whitespace() || c == '-')
    {
        return Err(ValidationError::InvalidFormat {
            field: "full_name",
            value: full_name.to_string(),
            expected: "letters, spaces, hyphens only",
        });
    }
    Ok(())
}

/// Password: 6-100 characters, any content
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    check_length("password", password, 6, 100)
}

/// Email: 3-200 characters and a syntactically valid address
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    check_length("email", email, 3, 200)?;

    if !email.validate_email() {
        return Err(ValidationError::InvalidFormat {
            field: "email",
            value: email.to_string(),
            expected: "a valid email address",
        });
    }
    Ok(())
}

// ============================================================================
// Currency
// ============================================================================

/// Supported account currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Currency {
    USD,
    EUR,
    CAD,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::USD, Currency::EUR, Currency::CAD];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::CAD => "CAD",
        }
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::UnsupportedCurrency(s.to_string()))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
