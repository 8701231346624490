//! Common types used across the auth modules and by clients.
//!
//! ## Domain Types
//!
//! - [`Session`] - Server-recorded authenticated login
//! - [`Identity`] - Verified identity owning sessions
//!
//! ## Protocol Types
//!
//! - [`Credentials`], [`TokenResponse`], [`RefreshRequest`], [`WhoAmI`], [`ErrorBody`]

pub mod protocol;
pub mod session;

pub use protocol::{Credentials, ErrorBody, RefreshRequest, TokenResponse, WhoAmI};
pub use session::{Identity, Session, SessionInfo, SessionValidity};
