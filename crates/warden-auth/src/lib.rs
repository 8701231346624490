//! # warden-auth
//!
//! Authentication and session-lifecycle core.
//!
//! This crate provides:
//! - A signing-key ring supporting zero-downtime secret rotation
//! - Sessions with independently configurable session and access-token lifetimes
//! - The issue / refresh / revoke protocol and its error taxonomy
//! - Pluggable identity verification backends
//! - An Axum HTTP surface for the protocol
//!
//! ## Overview
//!
//! A login creates a [`Session`](types::Session), the root of revocation and
//! expiry authority, and returns a short-lived access token plus a refresh
//! token bound to it. Access tokens are verified by signature and expiry
//! alone. Refresh consults the session store, so a revoked or expired session
//! stops backing new tokens immediately.
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration
//! - [`token`] - Key ring, issuer, verifier and refresh protocol
//! - [`storage`] - Session storage trait and in-memory store
//! - [`authenticator`] - Identity verification backends
//! - [`policy`] - Revocation authorization hook
//! - [`service`] - Server-side protocol facade
//! - [`http`] - Axum handlers
//! - [`types`] - Domain and protocol types

pub mod authenticator;
pub mod config;
pub mod error;
pub mod http;
pub mod policy;
pub mod service;
pub mod storage;
pub mod token;
pub mod types;

pub use authenticator::{IdentityAuthenticator, Verification};
pub use config::{AuthConfig, AuthenticatorConfig, ConfigError};
pub use error::{AuthError, CannotRefreshReason, ErrorCategory};
pub use http::auth_router;
pub use policy::{OwnerOrAdmin, RevocationPolicy};
pub use service::AuthService;
pub use storage::{InMemorySessionStore, SessionStore};
pub use token::{
    AccessState, IssuedToken, SecretKeyRing, TokenClaims, TokenConfig, TokenIssuer, TokenKind,
    TokenPair, TokenVerifier,
};
pub use types::{
    Credentials, ErrorBody, Identity, RefreshRequest, Session, SessionInfo, SessionValidity,
    TokenResponse, WhoAmI,
};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use warden_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::authenticator::{IdentityAuthenticator, Verification};
    pub use crate::config::{AuthConfig, AuthenticatorConfig, ConfigError};
    pub use crate::error::{AuthError, CannotRefreshReason, ErrorCategory};
    pub use crate::service::AuthService;
    pub use crate::storage::{InMemorySessionStore, SessionStore};
    pub use crate::token::{AccessState, SecretKeyRing, TokenConfig};
    pub use crate::types::{
        Credentials, ErrorBody, Identity, RefreshRequest, Session, SessionInfo, TokenResponse,
        WhoAmI,
    };
}
