//! Credential providers.

use async_trait::async_trait;
use warden_auth::types::Credentials;

use crate::ClientResult;

/// Supplies credentials when the context has to log in.
///
/// Interactive implementations prompt the user. The context only calls a
/// provider on first login and, if prompting is enabled, after the server
/// refused a refresh.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns the credentials to log in with.
    ///
    /// # Errors
    ///
    /// Returns an error if no credentials can be obtained (e.g. the prompt
    /// was aborted).
    async fn credentials(&self) -> ClientResult<Credentials>;
}

/// Always returns the same credentials.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credentials: Credentials,
}

impl StaticCredentials {
    /// Creates a provider for a fixed username and password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(username, password),
        }
    }
}

impl From<Credentials> for StaticCredentials {
    fn from(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self) -> ClientResult<Credentials> {
        Ok(self.credentials.clone())
    }
}
