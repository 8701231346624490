//! Error responses.
//!
//! | Error | Status |
//! |-------|--------|
//! | `Validation` | 422 |
//! | `AuthenticationFailed`, `InvalidToken`, `TokenExpired`, `CannotRefresh` | 401 |
//! | `Forbidden` | 403 |
//! | `SessionNotFound` | 404 |
//! | `Storage`, `Configuration`, `Internal` | 500 |
//!
//! 401 responses carry a `WWW-Authenticate: Bearer` challenge.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::error::AuthError;
use crate::types::protocol::ErrorBody;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!(category = %self.category(), error = %self, "Auth request failed");
        } else {
            debug!(category = %self.category(), error = %self, "Auth request rejected");
        }

        let body = ErrorBody::from_error(&self);
        let mut response = (status, Json(&body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            let challenge = build_www_authenticate_header(&body.error, &body.error_description);
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}

/// Returns the HTTP status for an error.
#[must_use]
pub fn status_for(error: &AuthError) -> StatusCode {
    match error {
        AuthError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::AuthenticationFailed { .. }
        | AuthError::InvalidToken { .. }
        | AuthError::TokenExpired
        | AuthError::CannotRefresh { .. } => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
        AuthError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
        AuthError::Storage { .. } | AuthError::Configuration { .. } | AuthError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Format: `Bearer realm="warden", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped = description.replace('"', "\\\"");
    format!("Bearer realm=\"warden\", error=\"{error}\", error_description=\"{escaped}\"")
}
