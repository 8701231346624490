//! Session storage trait.
//!
//! This module defines the storage interface for authenticated sessions.
//!
//! # Implementation Notes
//!
//! Implementations should:
//!
//! - Make create/get/revoke linearizable per session
//! - Keep `revoke` idempotent (concurrent revokes commute)
//! - Make `advance_refresh_generation` an atomic check-and-increment that
//!   also rejects revoked or expired sessions
//! - Never physically delete sessions (retention is an external policy)

use async_trait::async_trait;
use time::Duration;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::session::{Identity, Session};

/// Storage trait for sessions.
///
/// # Implementations
///
/// - [`InMemorySessionStore`](crate::storage::InMemorySessionStore)
///
/// # Example Implementation
///
/// ```ignore
/// use warden_auth::storage::SessionStore;
///
/// struct SqlSessionStore { pool: PgPool }
///
/// #[async_trait::async_trait]
/// impl SessionStore for SqlSessionStore {
///     async fn revoke(&self, session_id: Uuid) -> AuthResult<()> {
///         // UPDATE sessions SET revoked = true, revoked_at = COALESCE(revoked_at, NOW())
///         // WHERE id = $1
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a new session for `identity`, valid for `max_age` from now.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored.
    async fn create(&self, identity: &Identity, max_age: Duration) -> AuthResult<Session>;

    /// Finds a session by its ID.
    ///
    /// Returns sessions regardless of their revoked/expired status.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionNotFound` if no such session exists.
    async fn get(&self, session_id: Uuid) -> AuthResult<Session>;

    /// Revokes a session.
    ///
    /// Idempotent: revoking an already revoked session succeeds and leaves it
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionNotFound` if no such session exists.
    async fn revoke(&self, session_id: Uuid) -> AuthResult<()>;

    /// Lists every session owned by `identity`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list_by_identity(&self, identity: &Identity) -> AuthResult<Vec<Session>>;

    /// Atomically consumes refresh generation `expected`.
    ///
    /// Succeeds only if the session is still valid and its current generation
    /// equals `expected`, in which case the generation is incremented and the
    /// updated session returned. The validity check and the increment are one
    /// atomic step, so neither two racing refreshes of the same token nor a
    /// refresh racing a revocation can mint tokens for a dead session.
    ///
    /// # Errors
    ///
    /// - `AuthError::SessionNotFound` if no such session exists
    /// - `AuthError::CannotRefresh { reason: Revoked | SessionExpired }` if the
    ///   session can no longer back tokens
    /// - `AuthError::CannotRefresh { reason: TokenReused }` on a generation mismatch
    async fn advance_refresh_generation(&self, session_id: Uuid, expected: u64)
    -> AuthResult<Session>;

    /// Returns `true` if the session is unrevoked and unexpired.
    fn is_valid(&self, session: &Session) -> bool {
        session.is_valid()
    }
}
