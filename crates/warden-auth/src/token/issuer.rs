//! Token issuance.
//!
//! The issuer mints signed access and refresh tokens bound to a session.
//!
//! # Expiry rules
//!
//! - access token: `min(session.expires_at, now + access_token_lifetime)`
//! - refresh token: `session.expires_at`, or
//!   `min(session.expires_at, now + refresh_token_lifetime)` when a refresh
//!   lifetime is configured
//!
//! A token therefore never outlives the session that backs it.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::token::claims::{TokenClaims, TokenKind};
use crate::token::keyring::SecretKeyRing;
use crate::types::protocol::TokenResponse;
use crate::types::session::Session;

/// Configuration for token issuance.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Issuer placed in the `iss` claim.
    pub issuer: String,

    /// Access token lifetime.
    pub access_token_lifetime: Duration,

    /// Session lifetime, used when creating sessions.
    pub session_lifetime: Duration,

    /// Optional refresh token lifetime, capped by the session expiry.
    pub refresh_token_lifetime: Option<Duration>,

    /// Whether refresh tokens are single-use.
    /// When true, each refresh consumes the presented token and returns a new one.
    /// When false, the same refresh token is valid until the session ends.
    pub rotate_refresh_tokens: bool,
}

impl TokenConfig {
    /// Creates a token configuration with the default lifetimes.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            access_token_lifetime: Duration::minutes(15),
            session_lifetime: Duration::days(7),
            refresh_token_lifetime: None,
            rotate_refresh_tokens: false,
        }
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Sets the session lifetime.
    #[must_use]
    pub fn with_session_lifetime(mut self, lifetime: Duration) -> Self {
        self.session_lifetime = lifetime;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = Some(lifetime);
        self
    }

    /// Sets whether to rotate refresh tokens on use.
    #[must_use]
    pub fn with_rotate_refresh_tokens(mut self, rotate: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self
    }
}

impl TryFrom<&AuthConfig> for TokenConfig {
    type Error = AuthError;

    fn try_from(config: &AuthConfig) -> Result<Self, Self::Error> {
        let mut token_config = Self::new(config.issuer.clone())
            .with_access_token_lifetime(to_time_duration(
                "access_token_max_age",
                config.access_token_max_age,
            )?)
            .with_session_lifetime(to_time_duration(
                "session_max_age",
                config.session_max_age,
            )?)
            .with_rotate_refresh_tokens(config.refresh_token_rotation);
        if let Some(max_age) = config.refresh_token_max_age {
            token_config = token_config
                .with_refresh_token_lifetime(to_time_duration("refresh_token_max_age", max_age)?);
        }
        Ok(token_config)
    }
}

fn to_time_duration(name: &str, value: std::time::Duration) -> AuthResult<Duration> {
    Duration::try_from(value)
        .map_err(|_| AuthError::configuration(format!("{name} is out of range")))
}

/// A signed token together with its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// The encoded token.
    pub token: String,
    /// When the token expires (whole seconds).
    pub expires_at: OffsetDateTime,
}

impl IssuedToken {
    /// Returns `true` if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }
}

/// An access/refresh token pair minted for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Access token.
    pub access: IssuedToken,
    /// Refresh token.
    pub refresh: IssuedToken,
}

impl TokenPair {
    /// Builds the wire response for this pair.
    #[must_use]
    pub fn into_response(self, session: &Session) -> TokenResponse {
        let now = OffsetDateTime::now_utc();
        let expires_in = (self.access.expires_at - now).whole_seconds().max(0);
        TokenResponse {
            access_token: self.access.token,
            refresh_token: self.refresh.token,
            token_type: "bearer".to_string(),
            expires_in: u64::try_from(expires_in).unwrap_or(0),
            access_token_expires_at: self.access.expires_at.unix_timestamp(),
            refresh_token_expires_at: self.refresh.expires_at.unix_timestamp(),
            session_id: session.id,
            identity: session.identity.clone(),
        }
    }
}

/// Mints tokens bound to sessions.
#[derive(Debug)]
pub struct TokenIssuer {
    keys: Arc<SecretKeyRing>,
    config: TokenConfig,
}

impl TokenIssuer {
    /// Creates a new issuer signing with `keys`.
    #[must_use]
    pub fn new(keys: Arc<SecretKeyRing>, config: TokenConfig) -> Self {
        Self { keys, config }
    }

    /// Returns the issuer configuration.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    /// Returns the key ring used for signing.
    #[must_use]
    pub fn keys(&self) -> &Arc<SecretKeyRing> {
        &self.keys
    }

    /// Mints an access token and a refresh token for `session`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the token cannot be encoded.
    pub fn issue(&self, session: &Session) -> AuthResult<TokenPair> {
        let now = OffsetDateTime::now_utc();
        let access = self.mint(
            session,
            TokenKind::Access,
            Some(self.config.access_token_lifetime),
            now,
        )?;
        let refresh = self.mint(
            session,
            TokenKind::Refresh,
            self.config.refresh_token_lifetime,
            now,
        )?;
        Ok(TokenPair { access, refresh })
    }

    /// Mints only an access token for `session`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the token cannot be encoded.
    pub fn issue_access_only(&self, session: &Session) -> AuthResult<IssuedToken> {
        self.mint(
            session,
            TokenKind::Access,
            Some(self.config.access_token_lifetime),
            OffsetDateTime::now_utc(),
        )
    }

    /// Signs `claims` again with the current signing secret.
    ///
    /// Session binding, expiry and refresh generation are carried over as is.
    ///
    /// # Errors
    ///
    /// Returns an error only if the token cannot be encoded.
    pub fn resign(&self, claims: &TokenClaims) -> AuthResult<IssuedToken> {
        let token = self.keys.sign(claims).map_err(|e| {
            AuthError::internal(format!("Failed to encode {} token: {e}", claims.typ.as_str()))
        })?;
        let expires_at = OffsetDateTime::from_unix_timestamp(claims.exp)
            .map_err(|e| AuthError::internal(format!("Token expiry out of range: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    fn mint(
        &self,
        session: &Session,
        kind: TokenKind,
        lifetime: Option<Duration>,
        now: OffsetDateTime,
    ) -> AuthResult<IssuedToken> {
        let session_exp = session.expires_at.unix_timestamp();
        let exp = match lifetime {
            Some(lifetime) => now
                .checked_add(lifetime)
                .map_or(session_exp, |exp| exp.unix_timestamp().min(session_exp)),
            None => session_exp,
        };

        let claims = TokenClaims {
            iss: self.config.issuer.clone(),
            sub: session.identity.as_str().to_string(),
            sid: session.id,
            typ: kind,
            iat: now.unix_timestamp(),
            exp,
            jti: Uuid::new_v4().to_string(),
            rgen: session.refresh_generation,
        };

        let token = self
            .keys
            .sign(&claims)
            .map_err(|e| AuthError::internal(format!("Failed to encode {} token: {e}", kind.as_str())))?;
        let expires_at = OffsetDateTime::from_unix_timestamp(exp)
            .map_err(|e| AuthError::internal(format!("Token expiry out of range: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::session::Identity;
    use jsonwebtoken::Validation;

    fn create_test_issuer(config: TokenConfig) -> TokenIssuer {
        let keys = Arc::new(SecretKeyRing::new(["SECRET"]).unwrap());
        TokenIssuer::new(keys, config)
    }

    fn decode(issuer: &TokenIssuer, token: &str) -> TokenClaims {
        let mut validation = Validation::new(crate::token::keyring::SIGNING_ALGORITHM);
        validation.validate_exp = false;
        issuer.keys().verify(token, &validation).unwrap().claims
    }

    #[test]
    fn test_issue_pair() {
        let issuer = create_test_issuer(TokenConfig::new("warden"));
        let session = Session::new(Identity::new("alice"), Duration::days(7));

        let pair = issuer.issue(&session).unwrap();
        let access = decode(&issuer, &pair.access.token);
        let refresh = decode(&issuer, &pair.refresh.token);

        assert_eq!(access.typ, TokenKind::Access);
        assert_eq!(refresh.typ, TokenKind::Refresh);
        assert_eq!(access.sid, session.id);
        assert_eq!(access.sub, "alice");
        assert_eq!(access.iss, "warden");
        assert_eq!(access.exp - access.iat, 15 * 60);

        // Refresh token lives as long as the session.
        assert_eq!(refresh.exp, session.expires_at.unix_timestamp());
        assert_eq!(pair.refresh.expires_at.unix_timestamp(), refresh.exp);
    }

    #[test]
    fn test_access_expiry_capped_by_session() {
        let issuer = create_test_issuer(TokenConfig::new("warden"));
        let session = Session::new(Identity::new("alice"), Duration::minutes(5));

        let token = issuer.issue_access_only(&session).unwrap();
        let claims = decode(&issuer, &token.token);
        assert_eq!(claims.exp, session.expires_at.unix_timestamp());
    }

    #[test]
    fn test_refresh_lifetime_applied_and_capped() {
        let issuer = create_test_issuer(
            TokenConfig::new("warden").with_refresh_token_lifetime(Duration::hours(1)),
        );

        let long_session = Session::new(Identity::new("alice"), Duration::days(1));
        let pair = issuer.issue(&long_session).unwrap();
        let claims = decode(&issuer, &pair.refresh.token);
        assert_eq!(claims.exp - claims.iat, 3600);

        let short_session = Session::new(Identity::new("alice"), Duration::minutes(10));
        let pair = issuer.issue(&short_session).unwrap();
        let claims = decode(&issuer, &pair.refresh.token);
        assert_eq!(claims.exp, short_session.expires_at.unix_timestamp());
    }

    #[test]
    fn test_tokens_are_distinct() {
        let issuer = create_test_issuer(TokenConfig::new("warden"));
        let session = Session::new(Identity::new("alice"), Duration::days(7));

        let first = issuer.issue_access_only(&session).unwrap();
        let second = issuer.issue_access_only(&session).unwrap();
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_zero_access_lifetime_is_immediately_stale() {
        let issuer =
            create_test_issuer(TokenConfig::new("warden").with_access_token_lifetime(Duration::ZERO));
        let session = Session::new(Identity::new("alice"), Duration::days(7));

        let token = issuer.issue_access_only(&session).unwrap();
        assert!(token.is_expired());
    }

    #[test]
    fn test_resign_keeps_claims() {
        let issuer = create_test_issuer(TokenConfig::new("warden"));
        let session = Session::new(Identity::new("alice"), Duration::days(7));
        let pair = issuer.issue(&session).unwrap();
        let original = decode(&issuer, &pair.refresh.token);

        issuer.keys().rotate_in("NEW_SECRET").unwrap();
        let resigned = issuer.resign(&original).unwrap();
        issuer.keys().retire("SECRET").unwrap();

        assert_eq!(decode(&issuer, &resigned.token), original);
        assert_eq!(resigned.expires_at, pair.refresh.expires_at);
    }

    #[test]
    fn test_huge_lifetime_capped_by_session() {
        let issuer = create_test_issuer(
            TokenConfig::new("warden").with_access_token_lifetime(Duration::MAX),
        );
        let session = Session::new(Identity::new("alice"), Duration::days(7));

        let token = issuer.issue_access_only(&session).unwrap();
        assert_eq!(token.expires_at, session.expires_at.replace_nanosecond(0).unwrap());
    }

    #[test]
    fn test_into_response() {
        let issuer = create_test_issuer(TokenConfig::new("warden"));
        let session = Session::new(Identity::new("alice"), Duration::days(7));
        let pair = issuer.issue(&session).unwrap();

        let response = pair.clone().into_response(&session);
        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.session_id, session.id);
        assert_eq!(response.identity, Identity::new("alice"));
        assert_eq!(response.access_token, pair.access.token);
        assert!(response.expires_in <= 15 * 60);
        assert!(response.expires_in >= 15 * 60 - 2);
    }

    #[test]
    fn test_config_from_auth_config() {
        let auth = AuthConfig {
            secret_keys: vec!["SECRET".to_string()],
            access_token_max_age: std::time::Duration::from_secs(60),
            refresh_token_max_age: Some(std::time::Duration::from_secs(600)),
            refresh_token_rotation: true,
            ..AuthConfig::default()
        };
        let config = TokenConfig::try_from(&auth).unwrap();
        assert_eq!(config.access_token_lifetime, Duration::minutes(1));
        assert_eq!(config.session_lifetime, Duration::days(7));
        assert_eq!(config.refresh_token_lifetime, Some(Duration::minutes(10)));
        assert!(config.rotate_refresh_tokens);
    }
}
