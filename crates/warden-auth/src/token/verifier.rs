//! Token verification and the refresh protocol.
//!
//! An access token is in one of three states:
//!
//! ```text
//! VALID   (signature ok, unexpired)
//! STALE   (signature ok, expired)     -> refresh
//! INVALID (signature or format fails) -> reject
//! ```
//!
//! Refresh consults the session store before minting anything, so revocation
//! and session expiry take effect on the very next refresh. Outstanding access
//! tokens are not tracked and stay usable until their own (bounded) expiry.

use std::sync::Arc;

use jsonwebtoken::Validation;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::AuthResult;
use crate::error::{AuthError, CannotRefreshReason};
use crate::storage::session::SessionStore;
use crate::token::claims::{TokenClaims, TokenKind};
use crate::token::issuer::{IssuedToken, TokenIssuer, TokenPair};
use crate::token::keyring::SIGNING_ALGORITHM;
use crate::types::session::{Session, SessionValidity};

/// Result of checking an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessState {
    /// Signature ok and unexpired.
    Valid(TokenClaims),
    /// Signature ok but expired; the holder should refresh.
    Stale(TokenClaims),
    /// Signature failed, the token is malformed, or it is not an access token.
    Invalid,
}

impl AccessState {
    /// Returns `true` for [`AccessState::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// Returns `true` for [`AccessState::Stale`].
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

/// Verifies tokens and drives the refresh protocol.
pub struct TokenVerifier {
    issuer: Arc<TokenIssuer>,
    sessions: Arc<dyn SessionStore>,
    validation: Validation,
}

impl TokenVerifier {
    /// Creates a verifier accepting tokens minted by `issuer`.
    #[must_use]
    pub fn new(issuer: Arc<TokenIssuer>, sessions: Arc<dyn SessionStore>) -> Self {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.set_issuer(&[&issuer.config().issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // Expiry is classified here (VALID vs STALE), not rejected by the decoder.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            issuer,
            sessions,
            validation,
        }
    }

    /// Classifies an access token.
    #[must_use]
    pub fn check_access(&self, token: &str) -> AccessState {
        match self.decode(token, TokenKind::Access) {
            Ok(claims) if claims.is_expired() => AccessState::Stale(claims),
            Ok(claims) => AccessState::Valid(claims),
            Err(err) => {
                debug!(error = %err, "Access token rejected");
                AccessState::Invalid
            }
        }
    }

    /// Authenticates a request bearing `token`.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidToken` if the token is INVALID
    /// - `AuthError::TokenExpired` if the token is STALE
    pub fn authenticate(&self, token: &str) -> AuthResult<TokenClaims> {
        let claims = self.decode(token, TokenKind::Access)?;
        if claims.is_expired() {
            return Err(AuthError::TokenExpired);
        }
        Ok(claims)
    }

    /// Exchanges a refresh token for a new token pair.
    ///
    /// Checks run in this order, the first failing one deciding the reason:
    ///
    /// 1. signature, format, and token kind (`invalid_token`)
    /// 2. session existence (`session_not_found`)
    /// 3. revocation (`revoked`), then session expiry (`session_expired`)
    /// 4. the refresh token's own expiry (`token_expired`)
    /// 5. single-use policy only: refresh generation (`token_reused`)
    ///
    /// Under the multi-use policy the returned pair carries the presented
    /// refresh token unchanged, unless it was signed with a secret other than
    /// the current signing secret. It is then re-signed with the same claims,
    /// so a live session survives the retirement of the secret it started on.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CannotRefresh` with the reason above, or a storage
    /// error propagated unchanged.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<(Session, TokenPair)> {
        let claims = self
            .decode(refresh_token, TokenKind::Refresh)
            .map_err(|err| {
                warn!(error = %err, "Refresh rejected: invalid refresh token");
                AuthError::cannot_refresh(CannotRefreshReason::InvalidToken)
            })?;

        let session = self
            .sessions
            .get(claims.sid)
            .await
            .map_err(|err| match err {
                AuthError::SessionNotFound { session_id } => {
                    warn!(session_id = %session_id, "Refresh rejected: session not found");
                    AuthError::cannot_refresh(CannotRefreshReason::SessionNotFound)
                }
                other => other,
            })?;

        if session.identity.as_str() != claims.sub {
            warn!(session_id = %session.id, "Refresh rejected: subject does not own session");
            return Err(AuthError::cannot_refresh(CannotRefreshReason::InvalidToken));
        }

        let reason = match session.validity() {
            SessionValidity::Valid if claims.is_expired() => Some(CannotRefreshReason::TokenExpired),
            SessionValidity::Valid => None,
            SessionValidity::Revoked => Some(CannotRefreshReason::Revoked),
            SessionValidity::Expired => Some(CannotRefreshReason::SessionExpired),
        };
        if let Some(reason) = reason {
            warn!(session_id = %session.id, reason = %reason, "Refresh rejected");
            return Err(AuthError::cannot_refresh(reason));
        }

        let rotate = self.issuer.config().rotate_refresh_tokens;
        let (session, pair) = if rotate {
            let session = self
                .sessions
                .advance_refresh_generation(session.id, claims.rgen)
                .await
                .map_err(|err| match err {
                    AuthError::SessionNotFound { .. } => {
                        AuthError::cannot_refresh(CannotRefreshReason::SessionNotFound)
                    }
                    other => other,
                })
                .inspect_err(|err| {
                    if let Some(reason) = err.cannot_refresh_reason() {
                        warn!(session_id = %session.id, reason = %reason, "Refresh rejected");
                    }
                })?;
            let pair = self.issuer.issue(&session)?;
            (session, pair)
        } else {
            let refresh = if self.signed_with_current_key(refresh_token) {
                IssuedToken {
                    token: refresh_token.to_string(),
                    expires_at: OffsetDateTime::from_unix_timestamp(claims.exp).map_err(|e| {
                        AuthError::internal(format!("Token expiry out of range: {e}"))
                    })?,
                }
            } else {
                debug!(session_id = %session.id, "Re-signing refresh token under current key");
                self.issuer.resign(&claims)?
            };
            let pair = TokenPair {
                access: self.issuer.issue_access_only(&session)?,
                refresh,
            };
            (session, pair)
        };

        info!(
            session_id = %session.id,
            identity = %session.identity,
            rotated = rotate,
            "Access token refreshed"
        );
        Ok((session, pair))
    }

    /// Returns `true` if the (already verified) token names the current key.
    fn signed_with_current_key(&self, token: &str) -> bool {
        jsonwebtoken::decode_header(token)
            .ok()
            .and_then(|header| header.kid)
            .is_some_and(|kid| kid == self.issuer.keys().current_kid())
    }

    /// Verifies the signature and claims of `token` and checks its kind.
    fn decode(&self, token: &str, kind: TokenKind) -> AuthResult<TokenClaims> {
        let claims = self
            .issuer
            .keys()
            .verify::<TokenClaims>(token, &self.validation)?
            .claims;
        if claims.typ != kind {
            return Err(AuthError::invalid_token(format!(
                "expected {} token, got {}",
                kind.as_str(),
                claims.typ.as_str()
            )));
        }
        Ok(claims)
    }
}
