//! Authentication service.
//!
//! [`AuthService`] composes the key ring, session store, issuer, verifier,
//! identity backend, and revocation policy into the four protocol operations
//! a transport exposes:
//!
//! - [`login`](AuthService::login): credentials → session + token pair
//! - [`refresh`](AuthService::refresh): refresh token → new access token
//! - [`whoami`](AuthService::whoami): access token → identity + sessions
//! - [`revoke_session`](AuthService::revoke_session): access token + session id → ()
//!
//! # Usage
//!
//! ```ignore
//! use warden_auth::{AuthConfig, AuthService};
//!
//! let service = AuthService::from_config(&config)?;
//! let tokens = service.login(&Credentials::new("alice", "secret1")).await?;
//! let refreshed = service.refresh(&tokens.refresh_token).await?;
//! ```

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::AuthResult;
use crate::authenticator::{self, IdentityAuthenticator, Verification};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::policy::{OwnerOrAdmin, RevocationPolicy};
use crate::storage::{InMemorySessionStore, SessionStore};
use crate::token::{AccessState, SecretKeyRing, TokenClaims, TokenConfig, TokenIssuer, TokenVerifier};
use crate::types::protocol::{Credentials, TokenResponse, WhoAmI};

/// Server side of the authentication protocol.
pub struct AuthService {
    /// Signing secrets shared by issuer and verifier.
    keys: Arc<SecretKeyRing>,

    /// Session records.
    sessions: Arc<dyn SessionStore>,

    /// Token minting.
    issuer: Arc<TokenIssuer>,

    /// Token verification and refresh.
    verifier: TokenVerifier,

    /// Identity backend.
    authenticator: Arc<dyn IdentityAuthenticator>,

    /// Revocation authorization hook.
    revocation_policy: Arc<dyn RevocationPolicy>,
}

impl AuthService {
    /// Creates a new service.
    ///
    /// Revocation defaults to [`OwnerOrAdmin`] with no admins.
    #[must_use]
    pub fn new(
        keys: Arc<SecretKeyRing>,
        sessions: Arc<dyn SessionStore>,
        authenticator: Arc<dyn IdentityAuthenticator>,
        config: TokenConfig,
    ) -> Self {
        let issuer = Arc::new(TokenIssuer::new(keys.clone(), config));
        let verifier = TokenVerifier::new(issuer.clone(), sessions.clone());
        Self {
            keys,
            sessions,
            issuer,
            verifier,
            authenticator,
            revocation_policy: Arc::new(OwnerOrAdmin::default()),
        }
    }

    /// Builds a service with an in-memory session store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid.
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        Self::from_config_with_store(config, Arc::new(InMemorySessionStore::new()))
    }

    /// Builds a service on top of an existing session store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid.
    pub fn from_config_with_store(
        config: &AuthConfig,
        sessions: Arc<dyn SessionStore>,
    ) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let keys = Arc::new(SecretKeyRing::new(config.secret_keys.iter().cloned())?);
        let authenticator = authenticator::from_config(&config.authenticator)?;
        let token_config = TokenConfig::try_from(config)?;

        info!(
            issuer = %token_config.issuer,
            authenticator = authenticator.name(),
            secrets = keys.len(),
            rotate_refresh_tokens = token_config.rotate_refresh_tokens,
            "Auth service configured"
        );

        Ok(Self::new(keys, sessions, authenticator, token_config)
            .with_revocation_policy(Arc::new(OwnerOrAdmin::new(config.admins.iter().cloned()))))
    }

    /// Replaces the revocation policy.
    #[must_use]
    pub fn with_revocation_policy(mut self, policy: Arc<dyn RevocationPolicy>) -> Self {
        self.revocation_policy = policy;
        self
    }

    /// Returns the signing-key ring, for rotation.
    #[must_use]
    pub fn keys(&self) -> &Arc<SecretKeyRing> {
        &self.keys
    }

    /// Returns the session store.
    #[must_use]
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Returns the token configuration.
    #[must_use]
    pub fn token_config(&self) -> &TokenConfig {
        self.issuer.config()
    }

    /// Exchanges credentials for a new session and token pair.
    ///
    /// # Errors
    ///
    /// - `AuthError::Validation` if the credentials are malformed; the
    ///   identity backend is not consulted in that case
    /// - `AuthError::AuthenticationFailed` if the backend rejects them
    pub async fn login(&self, credentials: &Credentials) -> AuthResult<TokenResponse> {
        credentials.validate()?;

        let identity = match self.authenticator.verify(credentials).await? {
            Verification::Identity(identity) => identity,
            Verification::AuthFailure => {
                warn!(
                    username = %credentials.username,
                    backend = self.authenticator.name(),
                    "Login rejected"
                );
                return Err(AuthError::authentication_failed(
                    "Invalid username or password",
                ));
            }
        };

        let session = self
            .sessions
            .create(&identity, self.issuer.config().session_lifetime)
            .await?;
        let pair = self.issuer.issue(&session)?;

        info!(session_id = %session.id, identity = %identity, "Session created");
        Ok(pair.into_response(&session))
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CannotRefresh` with the specific reason.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        let (session, pair) = self.verifier.refresh(refresh_token).await?;
        Ok(pair.into_response(&session))
    }

    /// Classifies an access token without touching the session store.
    #[must_use]
    pub fn check_access(&self, access_token: &str) -> AccessState {
        self.verifier.check_access(access_token)
    }

    /// Authenticates a request bearing `access_token`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` or `AuthError::TokenExpired`.
    pub fn authenticate(&self, access_token: &str) -> AuthResult<TokenClaims> {
        self.verifier.authenticate(access_token)
    }

    /// Returns the caller's identity and all of its sessions.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` or `AuthError::TokenExpired` if the
    /// access token does not authenticate.
    pub async fn whoami(&self, access_token: &str) -> AuthResult<WhoAmI> {
        let claims = self.authenticate(access_token)?;
        let identity = claims.identity();
        let sessions = self.sessions.list_by_identity(&identity).await?;

        Ok(WhoAmI {
            identity,
            current_session: claims.sid,
            sessions: sessions.iter().map(|s| s.info()).collect(),
        })
    }

    /// Revokes `session_id` on behalf of the caller.
    ///
    /// Idempotent. Refreshes against the session fail from now on; access
    /// tokens already issued stay usable until they expire.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidToken` / `AuthError::TokenExpired` for a bad access token
    /// - `AuthError::SessionNotFound` if the session does not exist and the
    ///   caller may revoke any session
    /// - `AuthError::Forbidden` if the revocation policy refuses, or if the
    ///   session does not exist and the caller may only revoke their own
    pub async fn revoke_session(&self, access_token: &str, session_id: Uuid) -> AuthResult<()> {
        let claims = self.authenticate(access_token)?;
        let caller = claims.identity();

        let target = match self.sessions.get(session_id).await {
            Ok(target) => target,
            Err(AuthError::SessionNotFound { .. })
                if !self.revocation_policy.may_revoke_any(&caller) =>
            {
                return Err(AuthError::forbidden(format!(
                    "{caller} may not revoke session {session_id}"
                )));
            }
            Err(err) => return Err(err),
        };
        self.revocation_policy.authorize(&caller, &target)?;
        self.sessions.revoke(session_id).await?;

        info!(session_id = %session_id, caller = %caller, "Session revoked");
        Ok(())
    }
}
