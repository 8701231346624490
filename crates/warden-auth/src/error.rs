//! Authentication and session error types.
//!
//! This module defines all error types that can occur while authenticating
//! identities, verifying tokens, and driving the refresh protocol.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a refresh attempt was refused.
///
/// Carried by [`AuthError::CannotRefresh`] and surfaced to clients so they can
/// tell "log in again" apart from transient failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CannotRefreshReason {
    /// The refresh token signature did not verify, or the token is malformed.
    InvalidToken,
    /// The session referenced by the token does not exist.
    SessionNotFound,
    /// The session has been revoked.
    Revoked,
    /// The session has outlived `session_max_age`.
    SessionExpired,
    /// The refresh token outlived its own lifetime before the session did.
    TokenExpired,
    /// The refresh token was already consumed (single-use rotation policy).
    TokenReused,
}

impl CannotRefreshReason {
    /// Returns the stable wire code for this reason.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidToken => "invalid_token",
            Self::SessionNotFound => "session_not_found",
            Self::Revoked => "revoked",
            Self::SessionExpired => "session_expired",
            Self::TokenExpired => "token_expired",
            Self::TokenReused => "token_reused",
        }
    }
}

impl fmt::Display for CannotRefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CannotRefreshReason {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invalid_token" => Ok(Self::InvalidToken),
            "session_not_found" => Ok(Self::SessionNotFound),
            "revoked" => Ok(Self::Revoked),
            "session_expired" => Ok(Self::SessionExpired),
            "token_expired" => Ok(Self::TokenExpired),
            "token_reused" => Ok(Self::TokenReused),
            other => Err(AuthError::internal(format!(
                "Unknown refresh failure reason: {other}"
            ))),
        }
    }
}

/// Errors that can occur during authentication and session operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The authentication request is malformed (e.g. an empty password).
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what is malformed.
        message: String,
    },

    /// The credentials are well-formed but were rejected by the identity backend.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of why authentication failed.
        message: String,
    },

    /// The token signature does not verify against any configured secret,
    /// or the token is malformed or of the wrong kind.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The access token has expired and must be refreshed.
    #[error("Token expired")]
    TokenExpired,

    /// A refresh was attempted but the session cannot back a new token.
    #[error("Cannot refresh authentication: {reason}")]
    CannotRefresh {
        /// The specific reason the refresh was refused.
        reason: CannotRefreshReason,
    },

    /// The caller is not allowed to perform the operation.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The session does not exist.
    #[error("Session not found: {session_id}")]
    SessionNotFound {
        /// The session id that was looked up.
        session_id: Uuid,
    },

    /// An error occurred while storing or retrieving sessions.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid (e.g. an empty key ring).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `AuthenticationFailed` error.
    #[must_use]
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `CannotRefresh` error.
    #[must_use]
    pub fn cannot_refresh(reason: CannotRefreshReason) -> Self {
        Self::CannotRefresh { reason }
    }

    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new `SessionNotFound` error.
    #[must_use]
    pub fn session_not_found(session_id: Uuid) -> Self {
        Self::SessionNotFound { session_id }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the refresh failure reason, if this is a `CannotRefresh` error.
    #[must_use]
    pub fn cannot_refresh_reason(&self) -> Option<CannotRefreshReason> {
        match self {
            Self::CannotRefresh { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::AuthenticationFailed { .. }
                | Self::InvalidToken { .. }
                | Self::TokenExpired
                | Self::CannotRefresh { .. }
                | Self::Forbidden { .. }
                | Self::SessionNotFound { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns `true` if this is a token-related error.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken { .. } | Self::TokenExpired | Self::CannotRefresh { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::AuthenticationFailed { .. } => ErrorCategory::Authentication,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::TokenExpired => ErrorCategory::Token,
            Self::CannotRefresh { .. } => ErrorCategory::Token,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::SessionNotFound { .. } => ErrorCategory::Validation,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the wire error code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::AuthenticationFailed { .. } => "authentication_failed",
            Self::InvalidToken { .. } => "invalid_token",
            Self::TokenExpired => "invalid_token",
            Self::CannotRefresh { .. } => "cannot_refresh",
            Self::Forbidden { .. } => "forbidden",
            Self::SessionNotFound { .. } => "session_not_found",
            Self::Storage { .. } => "server_error",
            Self::Configuration { .. } => "server_error",
            Self::Internal { .. } => "server_error",
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity verification errors.
    Authentication,
    /// Permission checks (revocation hook).
    Authorization,
    /// Token validation, expiry and refresh errors.
    Token,
    /// Malformed requests.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
