use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden CLI: log in, inspect and revoke sessions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Server base URL (overrides config and WARDEN_URL env var)
    #[arg(short, long, global = true, env = "WARDEN_URL")]
    pub server: Option<String>,

    /// Config profile name
    #[arg(short, long, global = true, env = "WARDEN_PROFILE", default_value = "default")]
    pub profile: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    pub timeout: u64,

    /// Log verbosity (e.g. "debug"); RUST_LOG takes precedence
    #[arg(long, global = true, env = "WARDEN_LOG", default_value = "warn")]
    pub log_level: String,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and cache the session's tokens
    Login(LoginArgs),
    /// Revoke the cached session and forget its tokens
    Logout,
    /// Show the logged-in identity
    Whoami,
    /// List the identity's sessions
    Sessions,
    /// Revoke a session by id
    Revoke(RevokeArgs),
    /// Exchange the refresh token for a new access token
    Refresh(RefreshArgs),
    /// Manage CLI configuration
    Config(ConfigArgs),
}

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Username (prompted if omitted)
    #[arg(short, long)]
    pub username: Option<String>,
    /// Password (prompted if omitted)
    #[arg(long, env = "WARDEN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(clap::Args)]
pub struct RevokeArgs {
    /// Session id
    pub session_id: Uuid,
}

#[derive(clap::Args)]
pub struct RefreshArgs {
    /// Prompt for credentials if the session can no longer be refreshed
    #[arg(long)]
    pub prompt: bool,
}

#[derive(clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current config
    Show,
    /// Set config value
    Set(ConfigSetArgs),
}

#[derive(clap::Args)]
pub struct ConfigSetArgs {
    /// Key to set (server, username)
    pub key: String,
    /// Value
    pub value: String,
}
