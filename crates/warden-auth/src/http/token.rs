//! Login and refresh endpoints.
//!
//! ```text
//! POST /auth/token
//! Content-Type: application/x-www-form-urlencoded
//!
//! username=alice&password=secret1
//! ```
//!
//! ```text
//! POST /auth/token/refresh
//! Content-Type: application/json
//!
//! {"refresh_token": "..."}
//! ```

use axum::{Form, Json, extract::State};
use serde::Deserialize;

use crate::error::AuthError;
use crate::http::AuthState;
use crate::types::protocol::{Credentials, RefreshRequest, TokenResponse};

/// Form parameters of the login endpoint.
///
/// Missing fields default to empty strings so that they are reported as
/// validation errors (422) rather than as extractor rejections.
#[derive(Deserialize)]
pub struct LoginForm {
    /// Username.
    #[serde(default)]
    pub username: String,
    /// Password.
    #[serde(default)]
    pub password: String,
}

/// `POST /auth/token`
pub async fn login_handler(
    State(state): State<AuthState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AuthError> {
    let credentials = Credentials::new(form.username, form.password);
    let response = state.service.login(&credentials).await?;
    Ok(Json(response))
}

/// `POST /auth/token/refresh`
pub async fn refresh_handler(
    State(state): State<AuthState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let response = state.service.refresh(&request.refresh_token).await?;
    Ok(Json(response))
}
