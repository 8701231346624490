//! Ways for a client to reach an authentication service.
//!
//! - [`LocalTransport`] calls an in-process [`AuthService`](warden_auth::AuthService)
//! - [`HttpTransport`] talks to the HTTP surface with `reqwest`

pub mod http;
pub mod local;

use async_trait::async_trait;
use uuid::Uuid;
use warden_auth::types::{Credentials, TokenResponse, WhoAmI};

use crate::ClientResult;

pub use http::HttpTransport;
pub use local::LocalTransport;

/// The four protocol operations, as seen from a client.
///
/// Implementations map server rejections onto [`ClientError`](crate::ClientError)
/// and must not retry on their own.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// Exchanges credentials for a new session and token pair.
    async fn login(&self, credentials: &Credentials) -> ClientResult<TokenResponse>;

    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> ClientResult<TokenResponse>;

    /// Returns the caller's identity and sessions.
    async fn whoami(&self, access_token: &str) -> ClientResult<WhoAmI>;

    /// Revokes a session.
    async fn revoke_session(&self, access_token: &str, session_id: Uuid) -> ClientResult<()>;

    /// Stable key identifying the server, used to pick a token cache location.
    fn server_key(&self) -> String;
}
