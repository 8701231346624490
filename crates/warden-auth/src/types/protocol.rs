//! Request and response bodies of the authentication protocol.
//!
//! These are shared by the server-side [`AuthService`](crate::service::AuthService),
//! the HTTP handlers, and the client transports.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, CannotRefreshReason};
use crate::types::session::{Identity, SessionInfo};

/// Username/password credentials presented at login.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password. Never logged.
    pub password: String,
}

impl Credentials {
    /// Creates a new credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Checks that the credentials are well-formed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if the username or password is empty.
    /// Malformed credentials are never passed to an identity backend.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() {
            return Err(AuthError::validation("username must not be empty"));
        }
        if self.password.is_empty() {
            return Err(AuthError::validation("password must not be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed access token.
    pub access_token: String,

    /// Signed refresh token. Under the multi-use policy this is the token the
    /// client presented.
    pub refresh_token: String,

    /// Always `"bearer"`.
    pub token_type: String,

    /// Seconds until the access token expires.
    pub expires_in: u64,

    /// Access token expiry (unix seconds).
    pub access_token_expires_at: i64,

    /// Refresh token expiry (unix seconds).
    pub refresh_token_expires_at: i64,

    /// Session the tokens belong to.
    pub session_id: Uuid,

    /// Identity the session belongs to.
    pub identity: Identity,
}

/// Body of a refresh request.
#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// The refresh token to exchange.
    pub refresh_token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Response of the introspection ("who am I") operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhoAmI {
    /// The calling identity.
    pub identity: Identity,
    /// Session the presented access token belongs to.
    pub current_session: Uuid,
    /// All of the identity's sessions, most recent first.
    pub sessions: Vec<SessionInfo>,
}

/// Error body returned by the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error code (`authentication_failed`, `cannot_refresh`, ...).
    pub error: String,

    /// Human-readable description.
    pub error_description: String,

    /// Refresh failure reason, present only for `cannot_refresh`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<CannotRefreshReason>,
}

impl ErrorBody {
    /// Builds the body describing `error`.
    #[must_use]
    pub fn from_error(error: &AuthError) -> Self {
        let error_description = if error.is_server_error() {
            "internal server error".to_string()
        } else {
            error.to_string()
        };
        Self {
            error: error.error_code().to_string(),
            error_description,
            reason: error.cannot_refresh_reason(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_validation() {
        assert!(Credentials::new("alice", "secret1").validate().is_ok());

        let err = Credentials::new("alice", "").validate().unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
        assert!(err.to_string().contains("password"));

        let err = Credentials::new("  ", "secret1").validate().unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("alice", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));

        let request = RefreshRequest {
            refresh_token: "eyJ.secret.value".to_string(),
        };
        assert!(!format!("{request:?}").contains("secret"));
    }

    #[test]
    fn test_error_body() {
        let body = ErrorBody::from_error(&AuthError::cannot_refresh(CannotRefreshReason::Revoked));
        assert_eq!(body.error, "cannot_refresh");
        assert_eq!(body.reason, Some(CannotRefreshReason::Revoked));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["reason"], "revoked");

        let body = ErrorBody::from_error(&AuthError::storage("connection refused to db:5432"));
        assert_eq!(body.error, "server_error");
        assert!(!body.error_description.contains("db:5432"));
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("reason").is_none());
    }
}
