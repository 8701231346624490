//! Storage traits for sessions.
//!
//! Persistence is external to the auth core; this module defines the
//! interface it needs and an in-memory implementation.

pub mod memory;
pub mod session;

pub use memory::InMemorySessionStore;
pub use session::SessionStore;
