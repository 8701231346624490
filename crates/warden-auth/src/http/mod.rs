//! Axum HTTP surface of the authentication protocol.
//!
//! # Routes
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | `POST` | `/auth/token` | form `username`, `password` | `TokenResponse` |
//! | `POST` | `/auth/token/refresh` | json `{"refresh_token": ...}` | `TokenResponse` |
//! | `GET` | `/auth/whoami` | Bearer access token | `WhoAmI` |
//! | `DELETE` | `/auth/session/{id}` | Bearer access token | `204 No Content` |
//!
//! Errors are JSON [`ErrorBody`](crate::types::ErrorBody) values; see
//! [`error`] for the status mapping.
//!
//! # Usage
//!
//! ```ignore
//! let service = Arc::new(AuthService::from_config(&config)?);
//! let app = Router::new().merge(warden_auth::http::auth_router(service));
//! ```

pub mod error;
pub mod extract;
pub mod session;
pub mod token;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};

use crate::service::AuthService;

pub use error::status_for;
pub use extract::BearerToken;
pub use session::{revoke_session_handler, whoami_handler};
pub use token::{LoginForm, login_handler, refresh_handler};

/// State shared by the auth handlers.
#[derive(Clone)]
pub struct AuthState {
    /// The protocol implementation.
    pub service: Arc<AuthService>,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }
}

/// Builds the router serving every auth route.
pub fn auth_router(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/auth/token", post(login_handler))
        .route("/auth/token/refresh", post(refresh_handler))
        .route("/auth/whoami", get(whoami_handler))
        .route("/auth/session/{id}", delete(revoke_session_handler))
        .with_state(AuthState::new(service))
}
