//! Session domain type.
//!
//! A session is one authenticated login and the root of revocation and expiry
//! authority: every access and refresh token references exactly one session
//! and is usable only while that session is valid.
//!
//! # Lifecycle
//!
//! - Created with the first successful credential check
//! - Expires at `created_at + session_max_age` (derived, never stored as a state change)
//! - Revoked explicitly; revocation is monotonic and never reverts
//! - Never deleted by this crate

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::error::AuthError;

/// A verified identity (typically a username).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Outcome of a session validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionValidity {
    /// Not revoked and not expired.
    Valid,
    /// Explicitly revoked. Takes precedence over expiry.
    Revoked,
    /// Past `expires_at`.
    Expired,
}

/// Server-recorded authenticated login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier for this session.
    pub id: Uuid,

    /// Identity that logged in.
    pub identity: Identity,

    /// When the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the session stops backing new tokens.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Monotonic revocation flag.
    pub revoked: bool,

    /// When the session was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,

    /// Generation of the refresh token currently allowed to refresh this
    /// session. Only advanced under the single-use refresh policy.
    #[serde(default)]
    pub refresh_generation: u64,
}

impl Session {
    /// Creates a new, unrevoked session starting now.
    ///
    /// An expiry past the largest representable date is clamped to it.
    #[must_use]
    pub fn new(identity: Identity, max_age: Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        let expires_at = now
            .checked_add(max_age)
            .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc());
        Self::starting_at(identity, now, expires_at)
    }

    /// Creates a new, unrevoked session starting now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if `now + max_age` is not a
    /// representable date.
    pub fn try_new(identity: Identity, max_age: Duration) -> AuthResult<Self> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now.checked_add(max_age).ok_or_else(|| {
            AuthError::configuration(format!("session lifetime {max_age} is out of range"))
        })?;
        Ok(Self::starting_at(identity, now, expires_at))
    }

    fn starting_at(identity: Identity, now: OffsetDateTime, expires_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            created_at: now,
            expires_at,
            revoked: false,
            revoked_at: None,
            refresh_generation: 0,
        }
    }

    /// Returns `true` if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at
    }

    /// Returns `true` if the session has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// Returns `true` if the session can back new tokens.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validity() == SessionValidity::Valid
    }

    /// Classifies the session. Revocation wins over expiry.
    #[must_use]
    pub fn validity(&self) -> SessionValidity {
        if self.is_revoked() {
            SessionValidity::Revoked
        } else if self.is_expired() {
            SessionValidity::Expired
        } else {
            SessionValidity::Valid
        }
    }

    /// Marks the session revoked.
    ///
    /// Returns `true` if this call changed the state. Calling it on an already
    /// revoked session is a no-op that keeps the original `revoked_at`.
    pub fn revoke(&mut self) -> bool {
        if self.revoked {
            return false;
        }
        self.revoked = true;
        self.revoked_at = Some(OffsetDateTime::now_utc());
        true
    }

    /// Returns the public introspection view of this session.
    #[must_use]
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            created_at: self.created_at,
            expires_at: self.expires_at,
            revoked: self.revoked,
        }
    }
}

/// Introspection view of a session, as returned by `whoami`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session identifier.
    pub id: Uuid,
    /// When the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the session expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Whether the session has been revoked.
    pub revoked: bool,
}
