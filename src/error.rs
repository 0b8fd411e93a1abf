//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across the HTTP surface and
//! the identity/object-store cores, along with the HTTP status mapper.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Client input failed shape validation (fullname/email/password rules).
    #[error("{message}")]
    Validation { message: String },
    /// Uniqueness violation on email or handle at the identity store.
    #[error("{message}")]
    Duplicate { message: String },
    /// Lookup miss: unknown email on signin, or unknown object name on read.
    #[error("{message}")]
    NotFound { message: String },
    /// Auth-mode mismatch: password signin against a federated account or the
    /// reverse. Deliberately vague about the account's internal state.
    #[error("{message}")]
    WrongMode { message: String },
    /// Password did not match the stored hash.
    #[error("{message}")]
    InvalidCredential { message: String },
    /// Federated token rejected. Sub-reasons are intentionally not exposed.
    #[error("{message}")]
    Verification { message: String },
    /// Backend unavailable or a stream failed mid-flight.
    #[error("{message}")]
    Io { message: String },
    #[error("{message}")]
    Internal { message: String },
}

impl AppError {
    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message }
            | AppError::Duplicate { message }
            | AppError::NotFound { message }
            | AppError::WrongMode { message }
            | AppError::InvalidCredential { message }
            | AppError::Verification { message }
            | AppError::Io { message }
            | AppError::Internal { message } => message.as_str(),
        }
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self { AppError::Validation { message: msg.into() } }
    pub fn duplicate<S: Into<String>>(msg: S) -> Self { AppError::Duplicate { message: msg.into() } }
    pub fn not_found<S: Into<String>>(msg: S) -> Self { AppError::NotFound { message: msg.into() } }
    pub fn wrong_mode<S: Into<String>>(msg: S) -> Self { AppError::WrongMode { message: msg.into() } }
    pub fn invalid_credential<S: Into<String>>(msg: S) -> Self { AppError::InvalidCredential { message: msg.into() } }
    pub fn verification<S: Into<String>>(msg: S) -> Self { AppError::Verification { message: msg.into() } }
    pub fn io<S: Into<String>>(msg: S) -> Self { AppError::Io { message: msg.into() } }
    pub fn internal<S: Into<String>>(msg: S) -> Self { AppError::Internal { message: msg.into() } }

    /// Map to HTTP status code. The auth surface reports every recoverable
    /// failure as 403 (matching the product's API contract); object lookup
    /// misses are 404; backend failures are 500.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Validation { .. } => 403,
            AppError::Duplicate { .. } => 403,
            AppError::WrongMode { .. } => 403,
            AppError::InvalidCredential { .. } => 403,
            AppError::Verification { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Io { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }

    /// True for failures a caller can correct and resubmit; Io/Internal are
    /// request-level failures with no client-side remedy.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AppError::Io { .. } | AppError::Internal { .. })
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { message: err.to_string() }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io { message: err.to_string() }
    }
}
