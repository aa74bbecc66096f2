//! PrincipalId Value Object
//!
//! Opaque identifier issued by the identity gateway. Never generated here.

use derive_more::Display;
use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Upper bound on accepted identifier length (gateway ids are 28 chars)
const PRINCIPAL_ID_MAX_LENGTH: usize = 128;

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> AppResult<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > PRINCIPAL_ID_MAX_LENGTH {
            return Err(AppError::bad_request("Invalid principal id"));
        }
        if id.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(AppError::bad_request("Invalid principal id"));
        }
        Ok(Self(id))
    }

    /// Create from database value (assumed already validated)
    pub fn from_db(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PrincipalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
