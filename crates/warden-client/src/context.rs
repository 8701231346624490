//! Client-side authentication context.
//!
//! [`ClientAuthContext`] owns the current token pair of one session. Before
//! every outbound request [`ClientAuthContext::ensure_fresh`] checks whether
//! the access token is stale and, if so, exchanges the refresh token for a new
//! one. Refreshes are single-flighted: the pair lives behind one async mutex,
//! and a caller that finds a stale token re-checks after acquiring the lock, so
//! concurrent callers trigger exactly one refresh and all observe its result.
//!
//! # Example
//!
//! ```ignore
//! let transport = Arc::new(HttpTransport::new("http://localhost:8000")?);
//! let context = ClientAuthContext::builder(transport)
//!     .with_credentials(Arc::new(StaticCredentials::new("alice", "secret1")))
//!     .authenticate()
//!     .await?;
//!
//! let me = context.whoami().await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use warden_auth::types::{Identity, TokenResponse, WhoAmI};

use crate::ClientResult;
use crate::cache::TokenCache;
use crate::credentials::CredentialProvider;
use crate::error::ClientError;
use crate::transport::AuthTransport;

/// Default timeout applied to every transport call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns `true` once the access token of `tokens` has expired.
fn is_stale(tokens: &TokenResponse) -> bool {
    OffsetDateTime::now_utc().unix_timestamp() >= tokens.access_token_expires_at
}

/// Builder for [`ClientAuthContext`].
pub struct ClientAuthContextBuilder {
    transport: Arc<dyn AuthTransport>,
    cache: Option<Arc<dyn TokenCache>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    prompt: bool,
    request_timeout: Duration,
}

impl ClientAuthContextBuilder {
    /// Persists token pairs in `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn TokenCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Uses `provider` for the initial login and, with prompting enabled,
    /// for logging in again after a refused refresh.
    #[must_use]
    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Enables or disables re-authentication through the credential provider
    /// when the server refuses a refresh. Disabled by default.
    #[must_use]
    pub fn with_prompt(mut self, prompt: bool) -> Self {
        self.prompt = prompt;
        self
    }

    /// Sets the timeout applied to every transport call.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Logs in with the configured credential provider.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotAuthenticated` if no credential provider is configured
    /// - `ClientError::Validation` if the credentials are malformed
    /// - `ClientError::AuthenticationFailed` if the server rejects them
    /// - `ClientError::Transport` / `ClientError::Timeout` if the server is unreachable
    pub async fn authenticate(self) -> ClientResult<ClientAuthContext> {
        let provider = self
            .credentials
            .clone()
            .ok_or_else(|| ClientError::not_authenticated("no credential provider configured"))?;
        let tokens = login(&*self.transport, &*provider, self.request_timeout).await?;
        let context = self.build(tokens.clone());
        context.persist(&tokens).await;
        Ok(context)
    }

    /// Resumes the session stored in the configured cache, without credentials.
    ///
    /// The cached pair is used as is; a stale access token is refreshed on the
    /// first request.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotAuthenticated` if no cache is configured or it is empty
    /// - `ClientError::Cache` if the cache cannot be read
    pub async fn resume(self) -> ClientResult<ClientAuthContext> {
        let cache = self
            .cache
            .clone()
            .ok_or_else(|| ClientError::not_authenticated("no token cache configured"))?;
        let tokens = cache
            .load()
            .await?
            .ok_or_else(|| ClientError::not_authenticated("no cached session"))?;
        debug!(session_id = %tokens.session_id, "Resumed cached session");
        Ok(self.build(tokens))
    }

    /// Logs in if the cache holds no session, otherwise resumes it.
    ///
    /// # Errors
    ///
    /// Same as [`authenticate`](Self::authenticate).
    pub async fn resume_or_authenticate(self) -> ClientResult<ClientAuthContext> {
        let cached = match &self.cache {
            Some(cache) => cache.load().await.unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring unreadable token cache");
                None
            }),
            None => None,
        };
        match cached {
            Some(tokens) => Ok(self.build(tokens)),
            None => self.authenticate().await,
        }
    }

    fn build(self, tokens: TokenResponse) -> ClientAuthContext {
        ClientAuthContext {
            transport: self.transport,
            cache: self.cache,
            credentials: self.credentials,
            prompt: self.prompt,
            request_timeout: self.request_timeout,
            tokens: Mutex::new(tokens),
        }
    }
}

/// Holds one session's token pair and keeps it fresh.
pub struct ClientAuthContext {
    transport: Arc<dyn AuthTransport>,
    cache: Option<Arc<dyn TokenCache>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    prompt: bool,
    request_timeout: Duration,
    tokens: Mutex<TokenResponse>,
}

impl std::fmt::Debug for ClientAuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientAuthContext")
            .field("server", &self.transport.server_key())
            .field("prompt", &self.prompt)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl ClientAuthContext {
    /// Starts building a context on top of `transport`.
    #[must_use]
    pub fn builder(transport: Arc<dyn AuthTransport>) -> ClientAuthContextBuilder {
        ClientAuthContextBuilder {
            transport,
            cache: None,
            credentials: None,
            prompt: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Logs in with `provider`.
    ///
    /// # Errors
    ///
    /// See [`ClientAuthContextBuilder::authenticate`].
    pub async fn authenticate(
        transport: Arc<dyn AuthTransport>,
        provider: Arc<dyn CredentialProvider>,
    ) -> ClientResult<Self> {
        Self::builder(transport)
            .with_credentials(provider)
            .authenticate()
            .await
    }

    /// Resumes the session stored in `cache`.
    ///
    /// # Errors
    ///
    /// See [`ClientAuthContextBuilder::resume`].
    pub async fn resume(
        transport: Arc<dyn AuthTransport>,
        cache: Arc<dyn TokenCache>,
    ) -> ClientResult<Self> {
        Self::builder(transport).with_cache(cache).resume().await
    }

    /// Returns the current token pair.
    pub async fn tokens(&self) -> TokenResponse {
        self.tokens.lock().await.clone()
    }

    /// Returns the id of the current session.
    pub async fn session_id(&self) -> Uuid {
        self.tokens.lock().await.session_id
    }

    /// Returns the identity of the current session.
    pub async fn identity(&self) -> Identity {
        self.tokens.lock().await.identity.clone()
    }

    /// Returns a non-stale access token, refreshing first if necessary.
    ///
    /// Concurrent callers that all see a stale token trigger one refresh.
    ///
    /// # Errors
    ///
    /// - `ClientError::CannotRefreshAuthentication` if the server refused the
    ///   refresh and re-authentication is disabled
    /// - `ClientError::Transport` / `ClientError::Timeout` if the server is
    ///   unreachable; the cached pair is left untouched
    pub async fn ensure_fresh(&self) -> ClientResult<String> {
        let mut tokens = self.tokens.lock().await;
        if is_stale(&tokens) {
            self.refresh_locked(&mut tokens, self.prompt).await?;
        }
        Ok(tokens.access_token.clone())
    }

    /// Refreshes regardless of staleness.
    ///
    /// With `prompt` set, a refused refresh falls back to logging in through
    /// the credential provider.
    ///
    /// # Errors
    ///
    /// Same as [`ensure_fresh`](Self::ensure_fresh).
    pub async fn reauthenticate(&self, prompt: bool) -> ClientResult<()> {
        let mut tokens = self.tokens.lock().await;
        self.refresh_locked(&mut tokens, prompt).await
    }

    /// Runs `request` with a fresh access token.
    ///
    /// If the server rejects the token, the pair is refreshed and `request`
    /// runs exactly once more.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt, or of the refresh in between.
    pub async fn authorized<T, F, Fut>(&self, request: F) -> ClientResult<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let token = self.ensure_fresh().await?;
        match request(token.clone()).await {
            Err(err) if err.is_token_rejection() => {
                debug!(error = %err, "Access token rejected, refreshing once");
                let token = self.refresh_if_current(&token).await?;
                request(token).await
            }
            other => other,
        }
    }

    /// Returns the calling identity and its sessions.
    ///
    /// # Errors
    ///
    /// Same as [`authorized`](Self::authorized).
    pub async fn whoami(&self) -> ClientResult<WhoAmI> {
        self.authorized(move |token| async move {
            self.call(self.transport.whoami(&token)).await
        })
        .await
    }

    /// Revokes `session_id`.
    ///
    /// Revoking the context's own session also clears the token cache.
    ///
    /// # Errors
    ///
    /// - `ClientError::Forbidden` if the caller may not revoke the session
    /// - `ClientError::NotFound` if the session does not exist
    pub async fn revoke_session(&self, session_id: Uuid) -> ClientResult<()> {
        self.authorized(move |token| async move {
            self.call(self.transport.revoke_session(&token, session_id))
                .await
        })
        .await?;

        if session_id == self.session_id().await {
            info!(%session_id, "Revoked own session");
            self.clear_cache().await;
        }
        Ok(())
    }

    /// Revokes the context's own session and clears the token cache.
    ///
    /// A session the server already refuses to refresh counts as logged out.
    ///
    /// # Errors
    ///
    /// Returns transport errors; the cache is cleared regardless.
    pub async fn logout(self) -> ClientResult<()> {
        let session_id = self.session_id().await;
        let result = self.revoke_session(session_id).await;
        self.clear_cache().await;
        match result {
            Ok(()) | Err(ClientError::CannotRefreshAuthentication { .. }) => {
                info!(%session_id, "Logged out");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Refreshes unless another caller already replaced `used_token`.
    async fn refresh_if_current(&self, used_token: &str) -> ClientResult<String> {
        let mut tokens = self.tokens.lock().await;
        if tokens.access_token == used_token {
            self.refresh_locked(&mut tokens, self.prompt).await?;
        }
        Ok(tokens.access_token.clone())
    }

    /// Exchanges the refresh token. Must be called with the token lock held.
    ///
    /// A refused refresh first looks at the cache: a newer pair for the same
    /// session, stored by another context sharing it, is adopted instead.
    async fn refresh_locked(&self, tokens: &mut TokenResponse, prompt: bool) -> ClientResult<()> {
        let mut adopted = false;
        loop {
            let result = self.call(self.transport.refresh(&tokens.refresh_token)).await;
            let reason = match result {
                Ok(fresh) => {
                    debug!(session_id = %fresh.session_id, "Refreshed access token");
                    self.install(tokens, fresh).await;
                    return Ok(());
                }
                Err(ClientError::CannotRefreshAuthentication { reason }) => reason,
                Err(err) => return Err(err),
            };
            warn!(session_id = %tokens.session_id, %reason, "Server refused refresh");

            if !adopted && let Some(newer) = self.newer_cached_pair(tokens).await {
                debug!(session_id = %newer.session_id, "Adopting token pair from shared cache");
                *tokens = newer;
                adopted = true;
                if is_stale(tokens) {
                    continue;
                }
                return Ok(());
            }
            self.clear_cache_holding(&tokens.refresh_token).await;

            return match (&self.credentials, prompt) {
                (Some(provider), true) => {
                    let fresh = login(&*self.transport, &**provider, self.request_timeout).await?;
                    self.install(tokens, fresh).await;
                    Ok(())
                }
                _ => Err(ClientError::CannotRefreshAuthentication { reason }),
            };
        }
    }

    /// Returns the cached pair if it is a different pair for the same session.
    async fn newer_cached_pair(&self, tokens: &TokenResponse) -> Option<TokenResponse> {
        let cache = self.cache.as_ref()?;
        match cache.load().await {
            Ok(Some(cached))
                if cached.session_id == tokens.session_id
                    && cached.refresh_token != tokens.refresh_token =>
            {
                Some(cached)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to load token cache");
                None
            }
        }
    }

    /// Clears the cache only while it still holds `refresh_token`.
    async fn clear_cache_holding(&self, refresh_token: &str) {
        let Some(cache) = &self.cache else {
            return;
        };
        match cache.load().await {
            Ok(Some(cached)) if cached.refresh_token != refresh_token => {
                debug!("Token cache holds another pair, keeping it");
            }
            Ok(None) => {}
            Ok(Some(_)) | Err(_) => self.clear_cache().await,
        }
    }

    async fn install(&self, tokens: &mut TokenResponse, fresh: TokenResponse) {
        *tokens = fresh;
        self.persist(tokens).await;
    }

    async fn persist(&self, tokens: &TokenResponse) {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.store(tokens).await
        {
            warn!(error = %e, "Failed to store token pair");
        }
    }

    async fn clear_cache(&self) {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.clear().await
        {
            warn!(error = %e, "Failed to clear token cache");
        }
    }

    async fn call<T>(&self, request: impl Future<Output = ClientResult<T>>) -> ClientResult<T> {
        with_timeout(self.request_timeout, request).await
    }
}

async fn with_timeout<T>(
    after: Duration,
    request: impl Future<Output = ClientResult<T>>,
) -> ClientResult<T> {
    tokio::time::timeout(after, request)
        .await
        .map_err(|_| ClientError::Timeout { after })?
}

async fn login(
    transport: &dyn AuthTransport,
    provider: &dyn CredentialProvider,
    timeout: Duration,
) -> ClientResult<TokenResponse> {
    let credentials = provider.credentials().await?;
    let tokens = with_timeout(timeout, transport.login(&credentials)).await?;
    info!(
        identity = %tokens.identity,
        session_id = %tokens.session_id,
        "Logged in"
    );
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use warden_auth::types::Identity;

    use super::*;

    fn tokens_expiring_at(access_token_expires_at: i64) -> TokenResponse {
        TokenResponse {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 0,
            access_token_expires_at,
            refresh_token_expires_at: access_token_expires_at,
            session_id: Uuid::new_v4(),
            identity: Identity::new("alice"),
        }
    }

    #[test]
    fn test_staleness_boundary() {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        assert!(is_stale(&tokens_expiring_at(now - 1)));
        assert!(is_stale(&tokens_expiring_at(now)));
        assert!(!is_stale(&tokens_expiring_at(now + 60)));
    }

    #[tokio::test]
    async fn test_timeout_maps_to_error() {
        let result: ClientResult<()> = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ClientError::Timeout { .. })));
    }
}
