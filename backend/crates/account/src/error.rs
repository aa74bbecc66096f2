//! Account Error Types
//!
//! This module provides account-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::domain::gateway::GatewayError;

/// Account-specific result type alias
pub type AccountResult<T> = Result<T, AccountError>;

/// Account-specific error variants
#[derive(Debug, Error)]
pub enum AccountError {
    /// Rejected by the identity gateway (bad password, account exists, ...).
    /// The gateway's message is shown to the user as-is.
    #[error("{0}")]
    Credential(String),

    /// Identity gateway or profile store unreachable
    #[error("{0}")]
    Unavailable(String),

    /// Local input validation failed before any remote call
    #[error("{0}")]
    InvalidInput(String),

    /// Page session missing, expired or badly signed
    #[error("Session not found or expired")]
    SessionInvalid,

    /// Operation needs a signed-in principal
    #[error("Not signed in")]
    NotSignedIn,

    /// Signed in, but the profile (and its code) does not exist yet
    #[error("Referral code is not ready yet")]
    ReferralCodePending,

    /// No referral code could be written without colliding
    #[error("Could not allocate a unique referral code")]
    ReferralCodeExhausted,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccountError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AccountError::Credential(_) | AccountError::InvalidInput(_) => ErrorKind::BadRequest,
            AccountError::SessionInvalid | AccountError::NotSignedIn => ErrorKind::Unauthorized,
            AccountError::Unavailable(_) => ErrorKind::ServiceUnavailable,
            AccountError::ReferralCodePending => ErrorKind::NotFound,
            AccountError::ReferralCodeExhausted
            | AccountError::Database(_)
            | AccountError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError
    ///
    /// Server-side details (SQL errors, internal messages) are not sent to
    /// the page.
    pub fn to_app_error(&self) -> AppError {
        match self {
            AccountError::Database(_) | AccountError::Internal(_) => {
                AppError::internal("Something went wrong, please try again")
            }
            AccountError::SessionInvalid => AppError::new(self.kind(), self.to_string())
                .with_action("Reload the page"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AccountError::Database(e) => {
                tracing::error!(error = %e, "Account database error");
            }
            AccountError::Internal(msg) => {
                tracing::error!(message = %msg, "Account internal error");
            }
            AccountError::ReferralCodeExhausted => {
                tracing::error!("Referral code space exhausted for this attempt");
            }
            AccountError::Unavailable(msg) => {
                tracing::error!(message = %msg, "Upstream unavailable");
            }
            AccountError::Credential(msg) => {
                tracing::warn!(message = %msg, "Credential rejected by identity gateway");
            }
            _ => {
                tracing::debug!(error = %self, "Account error");
            }
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for AccountError {
    fn from(err: AppError) -> Self {
        if err.kind().is_client_error() {
            AccountError::InvalidInput(err.message().to_string())
        } else {
            AccountError::Internal(err.to_string())
        }
    }
}

impl From<GatewayError> for AccountError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Credential(msg) => AccountError::Credential(msg),
            GatewayError::Unavailable(msg) => AccountError::Unavailable(msg),
            GatewayError::NotSignedIn => AccountError::NotSignedIn,
        }
    }
}
