//! Password Value Object
//!
//! Clear-text password on its way to the identity gateway. Strength policy
//! belongs to the gateway; only emptiness is checked here.

use kernel::error::app_error::{AppError, AppResult};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Upper bound to keep request bodies sane
const PASSWORD_MAX_LENGTH: usize = 4096;

/// Memory is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Password(String);

impl Password {
    pub fn new(raw: String) -> AppResult<Self> {
        if raw.is_empty() {
            return Err(AppError::bad_request("Password cannot be empty")
                .with_action("Please enter a password"));
        }
        if raw.len() > PASSWORD_MAX_LENGTH {
            return Err(AppError::bad_request("Password is too long"));
        }
        Ok(Self(raw))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}
