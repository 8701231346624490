//! In-process transport.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use warden_auth::AuthService;
use warden_auth::types::{Credentials, TokenResponse, WhoAmI};

use crate::ClientResult;
use crate::transport::AuthTransport;

/// Calls an [`AuthService`] living in the same process.
#[derive(Clone)]
pub struct LocalTransport {
    service: Arc<AuthService>,
}

impl LocalTransport {
    /// Wraps `service`.
    #[must_use]
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }

    /// Returns the wrapped service.
    #[must_use]
    pub fn service(&self) -> &Arc<AuthService> {
        &self.service
    }
}

#[async_trait]
impl AuthTransport for LocalTransport {
    async fn login(&self, credentials: &Credentials) -> ClientResult<TokenResponse> {
        Ok(self.service.login(credentials).await?)
    }

    async fn refresh(&self, refresh_token: &str) -> ClientResult<TokenResponse> {
        Ok(self.service.refresh(refresh_token).await?)
    }

    async fn whoami(&self, access_token: &str) -> ClientResult<WhoAmI> {
        Ok(self.service.whoami(access_token).await?)
    }

    async fn revoke_session(&self, access_token: &str, session_id: Uuid) -> ClientResult<()> {
        Ok(self.service.revoke_session(access_token, session_id).await?)
    }

    fn server_key(&self) -> String {
        format!("local_{}", self.service.token_config().issuer)
    }
}
