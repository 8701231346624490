//! Token issuance, verification, and the signing-key ring.
//!
//! This module provides:
//!
//! - The rotating [`SecretKeyRing`] that signs and verifies every token
//! - Access and refresh token minting ([`TokenIssuer`])
//! - Access token classification and the refresh protocol ([`TokenVerifier`])

pub mod claims;
pub mod issuer;
pub mod keyring;
pub mod verifier;

pub use claims::{TokenClaims, TokenKind};
pub use issuer::{IssuedToken, TokenConfig, TokenIssuer, TokenPair};
pub use keyring::{JwtError, SecretKeyRing, SigningKey, key_id};
pub use verifier::{AccessState, TokenVerifier};
