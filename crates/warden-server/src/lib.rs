//! Warden HTTP server: configuration loading, tracing and the axum application.

pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;

pub use config::{AppConfig, ServerConfigError};
pub use server::{ServerBuilder, WardenServer, build_app, reload_config};
