//! # warden-client
//!
//! Client-side authentication context for Warden.
//!
//! A [`ClientAuthContext`] holds one session's token pair, checks it for
//! staleness before every outbound request, and refreshes it transparently.
//! When the server refuses a refresh the context either re-authenticates
//! through an injected [`CredentialProvider`] or surfaces
//! [`ClientError::CannotRefreshAuthentication`].
//!
//! ## Modules
//!
//! - [`context`] - The authentication context
//! - [`cache`] - Token caches (in-memory, file)
//! - [`credentials`] - Credential providers for (re-)authentication
//! - [`transport`] - In-process and HTTP transports
//! - [`error`] - Client error type

pub mod cache;
pub mod context;
pub mod credentials;
pub mod error;
pub mod transport;

pub use cache::{FileTokenCache, MemoryTokenCache, TokenCache};
pub use context::{ClientAuthContext, ClientAuthContextBuilder};
pub use credentials::{CredentialProvider, StaticCredentials};
pub use error::ClientError;
pub use transport::{AuthTransport, HttpTransport, LocalTransport};

/// Type alias for client results.
pub type ClientResult<T> = Result<T, ClientError>;
