//! Signing-key ring with zero-downtime rotation.
//!
//! The ring holds an ordered list of HMAC secrets. Position 0 signs every new
//! token; every secret in the ring is accepted for verification. The list
//! lives behind an [`ArcSwap`], so each sign/verify works on a consistent
//! snapshot of the current list and a reload is visible to the very next call.
//!
//! ## Rotation
//!
//! ```ignore
//! let ring = SecretKeyRing::new(["OLD_SECRET"])?;
//! let token = ring.sign(&claims)?;
//!
//! // New tokens are signed with NEW_SECRET, old ones still verify.
//! ring.rotate_in("NEW_SECRET")?;
//!
//! // Tokens signed only with OLD_SECRET stop verifying.
//! ring.retire("OLD_SECRET")?;
//! ```

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::AuthResult;
use crate::error::AuthError;

/// The only algorithm the ring signs and accepts.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while signing or verifying tokens.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// The token is not a well-formed JWT.
    #[error("Failed to decode token: {message}")]
    DecodingError {
        /// Description of the decoding error.
        message: String,
    },

    /// No configured secret validates the signature.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The signature is valid but the claims are not acceptable.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `DecodingError`.
    #[must_use]
    pub fn decoding_error(message: impl Into<String>) -> Self {
        Self::DecodingError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::InvalidAudience
            | ErrorKind::ImmatureSignature
            | ErrorKind::ExpiredSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            _ => Self::decoding_error(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::EncodingError { message } => AuthError::internal(message),
            other => AuthError::invalid_token(other.to_string()),
        }
    }
}

// ============================================================================
// Signing Key
// ============================================================================

/// One secret of the ring together with its derived keys.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    secret: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Derives the signing and verification keys for `secret`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the secret is empty.
    pub fn new(secret: impl Into<String>) -> AuthResult<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::configuration("signing secret cannot be empty"));
        }
        Ok(Self {
            kid: key_id(&secret),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            secret,
        })
    }

    /// Returns the key id: the first 8 hex characters of the secret's SHA-256.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// Computes the public key id of a secret.
#[must_use]
pub fn key_id(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    hex::encode(&digest[..4])
}

// ============================================================================
// Key Ring
// ============================================================================

/// Ordered collection of signing secrets.
///
/// Never empty. Readers take a lock-free snapshot; writers replace the whole
/// list atomically.
pub struct SecretKeyRing {
    keys: ArcSwap<Vec<SigningKey>>,
}

impl SecretKeyRing {
    /// Builds a ring from secrets ordered newest first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the list is empty or contains an
    /// empty secret.
    pub fn new<I, S>(secrets: I) -> AuthResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = build_keys(secrets)?;
        Ok(Self {
            keys: ArcSwap::from_pointee(keys),
        })
    }

    /// Replaces the whole list of secrets.
    ///
    /// Tokens signed with a secret that is no longer listed fail verification
    /// from the next call on.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the list is empty or contains an
    /// empty secret. The current list is kept in that case.
    pub fn reload<I, S>(&self, secrets: I) -> AuthResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = build_keys(secrets)?;
        let kids: Vec<String> = keys.iter().map(|k| k.kid.clone()).collect();
        self.keys.store(Arc::new(keys));
        info!(kids = ?kids, "Signing key ring reloaded");
        Ok(())
    }

    /// Inserts `secret` at the front, making it the signing secret.
    ///
    /// If the secret is already in the ring it is moved to the front.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the secret is empty.
    pub fn rotate_in(&self, secret: impl Into<String>) -> AuthResult<()> {
        let key = SigningKey::new(secret)?;
        let kid = key.kid.clone();
        self.update(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(key.clone());
            next.extend(current.iter().filter(|k| k.secret != key.secret).cloned());
            Ok(next)
        })?;
        info!(kid = %kid, "Signing secret rotated in");
        Ok(())
    }

    /// Removes `secret` from the ring.
    ///
    /// Removing a secret that is not in the ring is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if `secret` is the last one left.
    pub fn retire(&self, secret: &str) -> AuthResult<()> {
        self.update(|current| {
            let next: Vec<SigningKey> = current
                .iter()
                .filter(|k| k.secret != secret)
                .cloned()
                .collect();
            if next.is_empty() {
                return Err(AuthError::configuration(
                    "cannot retire the last signing secret",
                ));
            }
            Ok(next)
        })?;
        info!(kid = %key_id(secret), "Signing secret retired");
        Ok(())
    }

    /// Signs `claims` with the current signing secret (position 0).
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if the claims cannot be serialized.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let keys = self.keys.load();
        let key = keys
            .first()
            .ok_or_else(|| JwtError::encoding_error("signing key ring is empty"))?;

        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(key.kid.clone());

        jsonwebtoken::encode(&header, claims, &key.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Verifies `token` against the configured secrets and decodes its claims.
    ///
    /// The secret whose key id matches the token header is tried first, then
    /// every other secret.
    ///
    /// # Errors
    ///
    /// - `JwtError::DecodingError` if the token is malformed
    /// - `JwtError::InvalidSignature` if no configured secret validates it
    /// - `JwtError::InvalidClaims` if `validation` rejects the claims
    pub fn verify<T: DeserializeOwned>(
        &self,
        token: &str,
        validation: &Validation,
    ) -> Result<TokenData<T>, JwtError> {
        let header = jsonwebtoken::decode_header(token)?;
        if header.alg != SIGNING_ALGORITHM {
            return Err(JwtError::decoding_error(format!(
                "unsupported algorithm {:?}",
                header.alg
            )));
        }

        let keys = self.keys.load();
        let preferred = header
            .kid
            .as_deref()
            .and_then(|kid| keys.iter().find(|k| k.kid == kid));
        let rest = keys
            .iter()
            .filter(|k| !preferred.is_some_and(|p| std::ptr::eq(*k, p)));

        for key in preferred.into_iter().chain(rest) {
            match jsonwebtoken::decode::<T>(token, &key.decoding_key, validation) {
                Ok(data) => return Ok(data),
                Err(err) if matches!(err.kind(), jsonwebtoken::errors::ErrorKind::InvalidSignature) => {
                    continue;
                }
                Err(err) => return Err(err.into()),
            }
        }

        debug!(kid = ?header.kid, "No configured secret validates token signature");
        Err(JwtError::InvalidSignature)
    }

    /// Returns the key id of the current signing secret.
    #[must_use]
    pub fn current_kid(&self) -> String {
        self.keys
            .load()
            .first()
            .map(|k| k.kid.clone())
            .unwrap_or_default()
    }

    /// Returns the key ids of every configured secret, signing secret first.
    #[must_use]
    pub fn kids(&self) -> Vec<String> {
        self.keys.load().iter().map(|k| k.kid.clone()).collect()
    }

    /// Returns the number of configured secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.load().len()
    }

    /// Always `false`: the ring is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.load().is_empty()
    }

    /// Atomically replaces the key list with `f(current)`, retrying if another
    /// writer got in between.
    fn update<F>(&self, f: F) -> AuthResult<()>
    where
        F: Fn(&[SigningKey]) -> AuthResult<Vec<SigningKey>>,
    {
        let mut current = self.keys.load_full();
        loop {
            let next = Arc::new(f(&current)?);
            let previous = self.keys.compare_and_swap(&current, next);
            if Arc::ptr_eq(&previous, &current) {
                return Ok(());
            }
            current = arc_swap::Guard::into_inner(previous);
        }
    }
}

impl fmt::Debug for SecretKeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKeyRing")
            .field("kids", &self.kids())
            .finish()
    }
}

fn build_keys<I, S>(secrets: I) -> AuthResult<Vec<SigningKey>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let keys = secrets
        .into_iter()
        .map(SigningKey::new)
        .collect::<AuthResult<Vec<_>>>()?;
    if keys.is_empty() {
        return Err(AuthError::configuration(
            "at least one signing secret is required",
        ));
    }
    Ok(keys)
}
