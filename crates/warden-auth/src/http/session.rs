//! Session introspection and revocation endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::error::AuthError;
use crate::http::AuthState;
use crate::http::extract::BearerToken;
use crate::types::protocol::WhoAmI;

/// `GET /auth/whoami`
pub async fn whoami_handler(
    State(state): State<AuthState>,
    BearerToken(token): BearerToken,
) -> Result<Json<WhoAmI>, AuthError> {
    let whoami = state.service.whoami(&token).await?;
    Ok(Json(whoami))
}

/// `DELETE /auth/session/{id}`
pub async fn revoke_session_handler(
    State(state): State<AuthState>,
    BearerToken(token): BearerToken,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AuthError> {
    state.service.revoke_session(&token, session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
