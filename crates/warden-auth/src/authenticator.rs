//! Pluggable identity verification.
//!
//! An [`IdentityAuthenticator`] turns well-formed credentials into a verified
//! identity or a failure. Backends are independent implementations selected
//! by [`AuthenticatorConfig`]:
//!
//! - `dictionary`: fixed username → password table
//! - `argon2`: username → Argon2 PHC hash table

use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::AuthResult;
use crate::config::AuthenticatorConfig;
use crate::error::AuthError;
use crate::types::protocol::Credentials;
use crate::types::session::Identity;

/// Outcome of verifying credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// The credentials belong to this identity.
    Identity(Identity),
    /// The credentials were rejected.
    AuthFailure,
}

/// Identity verification backend.
///
/// Implementations only ever see credentials that passed
/// [`Credentials::validate`].
///
/// # Example Implementation
///
/// ```ignore
/// struct LdapAuthenticator { client: LdapClient }
///
/// #[async_trait::async_trait]
/// impl IdentityAuthenticator for LdapAuthenticator {
///     async fn verify(&self, credentials: &Credentials) -> AuthResult<Verification> {
///         match self.client.bind(&credentials.username, &credentials.password).await {
///             Ok(()) => Ok(Verification::Identity(Identity::new(&credentials.username))),
///             Err(LdapError::InvalidCredentials) => Ok(Verification::AuthFailure),
///             Err(e) => Err(AuthError::storage(e.to_string())),
///         }
///     }
///
///     fn name(&self) -> &'static str { "ldap" }
/// }
/// ```
#[async_trait]
pub trait IdentityAuthenticator: Send + Sync {
    /// Verifies `credentials`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend itself fails. Rejected
    /// credentials are `Ok(Verification::AuthFailure)`.
    async fn verify(&self, credentials: &Credentials) -> AuthResult<Verification>;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;
}

/// Builds the authenticator selected by `config`.
///
/// # Errors
///
/// Returns `AuthError::Configuration` if an Argon2 entry is not a valid PHC hash.
pub fn from_config(config: &AuthenticatorConfig) -> AuthResult<Arc<dyn IdentityAuthenticator>> {
    match config {
        AuthenticatorConfig::Dictionary { users } => {
            Ok(Arc::new(DictionaryAuthenticator::new(users.clone())))
        }
        AuthenticatorConfig::Argon2 { users } => {
            Ok(Arc::new(Argon2Authenticator::new(users.clone())?))
        }
    }
}

// ============================================================================
// Dictionary
// ============================================================================

/// Verifies passwords against a fixed in-memory table.
///
/// Intended for development and tests.
pub struct DictionaryAuthenticator {
    digests: HashMap<String, [u8; 32]>,
}

impl DictionaryAuthenticator {
    /// Creates an authenticator from a username → password table.
    #[must_use]
    pub fn new(users: HashMap<String, String>) -> Self {
        let digests = users
            .into_iter()
            .map(|(username, password)| (username, digest(&password)))
            .collect();
        Self { digests }
    }

    /// Creates an authenticator from `(username, password)` pairs.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(u, p)| (u.to_string(), p.to_string()))
                .collect(),
        )
    }
}

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

#[async_trait]
impl IdentityAuthenticator for DictionaryAuthenticator {
    async fn verify(&self, credentials: &Credentials) -> AuthResult<Verification> {
        let presented = digest(&credentials.password);
        match self.digests.get(&credentials.username) {
            Some(expected) if *expected == presented => Ok(Verification::Identity(
                Identity::new(credentials.username.clone()),
            )),
            _ => Ok(Verification::AuthFailure),
        }
    }

    fn name(&self) -> &'static str {
        "dictionary"
    }
}

// ============================================================================
// Argon2
// ============================================================================

/// Verifies passwords against Argon2 PHC hashes.
///
/// Hash verification is CPU-bound and runs on the blocking thread pool.
pub struct Argon2Authenticator {
    hashes: Arc<HashMap<String, String>>,
}

impl Argon2Authenticator {
    /// Creates an authenticator from a username → PHC hash table.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if any hash does not parse.
    pub fn new(users: HashMap<String, String>) -> AuthResult<Self> {
        for (username, hash) in &users {
            PasswordHash::new(hash).map_err(|e| {
                AuthError::configuration(format!("invalid password hash for '{username}': {e}"))
            })?;
        }
        Ok(Self {
            hashes: Arc::new(users),
        })
    }
}

#[async_trait]
impl IdentityAuthenticator for Argon2Authenticator {
    async fn verify(&self, credentials: &Credentials) -> AuthResult<Verification> {
        let Some(hash) = self.hashes.get(&credentials.username).cloned() else {
            return Ok(Verification::AuthFailure);
        };
        let password = credentials.password.clone();

        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))??;

        if matches {
            Ok(Verification::Identity(Identity::new(
                credentials.username.clone(),
            )))
        } else {
            Ok(Verification::AuthFailure)
        }
    }

    fn name(&self) -> &'static str {
        "argon2"
    }
}

/// Hashes a password into an Argon2id PHC string.
///
/// # Errors
///
/// Returns `AuthError::Internal` if hashing fails (rare).
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verifies a password against a PHC hash.
///
/// # Errors
///
/// Returns `AuthError::Configuration` if the hash does not parse.
pub fn verify_password(password: &str, hash: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::configuration(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
