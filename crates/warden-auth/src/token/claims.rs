//! Claims carried by access and refresh tokens.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::session::Identity;

/// Which purpose a token was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived bearer credential.
    Access,
    /// Credential used only to mint new access tokens.
    Refresh,
}

impl TokenKind {
    /// Returns the `typ` claim value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Claims shared by both token kinds.
///
/// Timestamps are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject: the identity owning the session.
    pub sub: String,

    /// Session the token is bound to.
    pub sid: Uuid,

    /// Token kind.
    pub typ: TokenKind,

    /// Issued at.
    pub iat: i64,

    /// Expiration time.
    pub exp: i64,

    /// Unique token id, so that two tokens minted in the same second differ.
    pub jti: String,

    /// Refresh generation of the session when the token was minted.
    #[serde(default)]
    pub rgen: u64,
}

impl TokenClaims {
    /// Returns the identity the token was issued to.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(self.sub.clone())
    }

    /// Returns `true` if the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Returns `true` if the token is expired at `now` (unix seconds).
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_claims(exp: i64) -> TokenClaims {
        TokenClaims {
            iss: "warden".to_string(),
            sub: "alice".to_string(),
            sid: Uuid::new_v4(),
            typ: TokenKind::Access,
            iat: 1_000,
            exp,
            jti: Uuid::new_v4().to_string(),
            rgen: 0,
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let claims = create_test_claims(2_000);
        assert!(!claims.is_expired_at(1_999));
        assert!(claims.is_expired_at(2_000));
        assert!(claims.is_expired_at(2_001));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let claims = create_test_claims(2_000);
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["typ"], "access");
        assert_eq!(TokenKind::Refresh.as_str(), "refresh");
    }

    #[test]
    fn test_missing_generation_defaults_to_zero() {
        let json = serde_json::json!({
            "iss": "warden",
            "sub": "alice",
            "sid": Uuid::new_v4(),
            "typ": "refresh",
            "iat": 1,
            "exp": 2,
            "jti": "x",
        });
        let claims: TokenClaims = serde_json::from_value(json).unwrap();
        assert_eq!(claims.rgen, 0);
        assert_eq!(claims.identity(), Identity::new("alice"));
    }
}
