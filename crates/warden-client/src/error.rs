//! Client error types.

use std::time::Duration;

use warden_auth::error::{AuthError, CannotRefreshReason};
use warden_auth::types::ErrorBody;

/// Errors surfaced by the client authentication context and transports.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request was malformed (e.g. an empty password).
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what is malformed.
        message: String,
    },

    /// The server rejected the credentials.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of why authentication failed.
        message: String,
    },

    /// The server rejected the access token (invalid or expired).
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token was rejected.
        message: String,
    },

    /// The session can no longer be refreshed; the user has to log in again.
    #[error("Cannot refresh authentication: {reason}")]
    CannotRefreshAuthentication {
        /// Why the server refused the refresh.
        reason: CannotRefreshReason,
    },

    /// The server refused the operation.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// The referenced resource (usually a session) does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Description of what was not found.
        message: String,
    },

    /// The context has no tokens to work with and no way to obtain them.
    #[error("Not authenticated: {message}")]
    NotAuthenticated {
        /// Description of what is missing.
        message: String,
    },

    /// The server failed to handle the request.
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code (500 for in-process transports).
        status: u16,
        /// Description of the failure.
        message: String,
    },

    /// The server could not be reached or the response could not be read.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("Request timed out after {after:?}")]
    Timeout {
        /// The timeout that elapsed.
        after: Duration,
    },

    /// Reading or writing the token cache failed.
    #[error("Token cache error: {message}")]
    Cache {
        /// Description of the cache failure.
        message: String,
    },
}

impl ClientError {
    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new `Cache` error.
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Creates a new `NotAuthenticated` error.
    #[must_use]
    pub fn not_authenticated(message: impl Into<String>) -> Self {
        Self::NotAuthenticated {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the same call later may succeed.
    ///
    /// Recoverable errors never modify cached tokens.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if the server rejected the access token, so that a
    /// refresh may help.
    #[must_use]
    pub fn is_token_rejection(&self) -> bool {
        matches!(self, Self::InvalidToken { .. })
    }

    /// Returns the refresh failure reason, if this is a
    /// `CannotRefreshAuthentication` error.
    #[must_use]
    pub fn cannot_refresh_reason(&self) -> Option<CannotRefreshReason> {
        match self {
            Self::CannotRefreshAuthentication { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Builds the error matching an HTTP error response.
    #[must_use]
    pub fn from_response(status: u16, body: Option<ErrorBody>) -> Self {
        let Some(body) = body else {
            return Self::Server {
                status,
                message: format!("unexpected response status {status}"),
            };
        };
        let message = body.error_description;
        match (body.error.as_str(), body.reason) {
            ("cannot_refresh", Some(reason)) => Self::CannotRefreshAuthentication { reason },
            ("cannot_refresh", None) => Self::CannotRefreshAuthentication {
                reason: CannotRefreshReason::InvalidToken,
            },
            ("validation_error", _) => Self::Validation { message },
            ("authentication_failed", _) => Self::AuthenticationFailed { message },
            ("invalid_token", _) => Self::InvalidToken { message },
            ("forbidden", _) => Self::Forbidden { message },
            ("session_not_found", _) => Self::NotFound { message },
            _ => Self::Server { status, message },
        }
    }
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation { message } => Self::Validation { message },
            AuthError::AuthenticationFailed { message } => Self::AuthenticationFailed { message },
            AuthError::InvalidToken { message } => Self::InvalidToken { message },
            AuthError::TokenExpired => Self::InvalidToken {
                message: "Token expired".to_string(),
            },
            AuthError::CannotRefresh { reason } => Self::CannotRefreshAuthentication { reason },
            AuthError::Forbidden { message } => Self::Forbidden { message },
            AuthError::SessionNotFound { session_id } => Self::NotFound {
                message: format!("session {session_id}"),
            },
            other @ (AuthError::Storage { .. }
            | AuthError::Configuration { .. }
            | AuthError::Internal { .. }) => Self::Server {
                status: 500,
                message: other.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}
