//! Display Name Value Object
//!
//! The name a person types at signup ("Ваше имя"). Free-form Unicode,
//! shown back on the page; not an identifier and not unique.
//!
//! ## Normalization
//! - NFC normalization, then trim
//! - Inner whitespace runs collapse to a single space
//!
//! ## Invariants
//! - 1..=64 characters after normalization
//! - No control characters

use serde::{Deserialize, Serialize};
use std::fmt;
use unicode_normalization::UnicodeNormalization;

/// Maximum display name length (in characters)
pub const DISPLAY_NAME_MAX_LENGTH: usize = 64;

/// Error returned when display name validation fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayNameError {
    /// Nothing left after trimming
    Empty,

    /// Longer than DISPLAY_NAME_MAX_LENGTH
    TooLong { length: usize, max: usize },

    /// Contains a control character
    ControlCharacter { position: usize },
}

impl fmt::Display for DisplayNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Пожалуйста, введите ваше имя."),
            Self::TooLong { length, max } => {
                write!(f, "Name is too long ({length} chars, maximum {max})")
            }
            Self::ControlCharacter { position } => {
                write!(f, "Name contains an invalid character at position {position}")
            }
        }
    }
}

impl std::error::Error for DisplayNameError {}

/// Validated, normalized display name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(input: impl AsRef<str>) -> Result<Self, DisplayNameError> {
        let normalized: String = input.as_ref().nfc().collect();

        let mut collapsed = String::with_capacity(normalized.len());
        for word in normalized.split_whitespace() {
            if !collapsed.is_empty() {
                collapsed.push(' ');
            }
            collapsed.push_str(word);
        }

        if collapsed.is_empty() {
            return Err(DisplayNameError::Empty);
        }

        if let Some(position) = collapsed.chars().position(char::is_control) {
            return Err(DisplayNameError::ControlCharacter { position });
        }

        let length = collapsed.chars().count();
        if length > DISPLAY_NAME_MAX_LENGTH {
            return Err(DisplayNameError::TooLong {
                length,
                max: DISPLAY_NAME_MAX_LENGTH,
            });
        }

        Ok(Self(collapsed))
    }

    /// Names coming from a federated provider may exceed local limits;
    /// they are truncated rather than rejected.
    pub fn from_provider(input: &str) -> Option<Self> {
        let cleaned: String = input.nfc().filter(|c| !c.is_control()).collect();
        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        let head: String = collapsed.chars().take(DISPLAY_NAME_MAX_LENGTH).collect();
        Self::new(head).ok()
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = DisplayNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DisplayName> for String {
    fn from(name: DisplayName) -> Self {
        name.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
