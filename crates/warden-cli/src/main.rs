mod cli;
mod commands;
mod config;
mod output;
mod prompt;
mod session;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use output::print_error;
use session::SessionOptions;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = run(cli).await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    let profile = &cli.profile;
    let format = cli.format.unwrap_or_default();
    let timeout = Duration::from_secs(cli.timeout);

    let options = |prompt: bool, username: Option<String>, password: Option<String>| -> Result<SessionOptions> {
        let cfg = config::load_profile(profile)?;
        Ok(SessionOptions {
            server: config::resolve_server(cli.server.as_deref(), profile)?,
            timeout,
            username: username.or(cfg.username),
            password,
            prompt,
        })
    };

    match &cli.command {
        Commands::Login(args) => {
            let opts = options(true, args.username.clone(), args.password.clone())?;
            commands::auth::login(opts, format).await?;
        }
        Commands::Logout => {
            commands::auth::logout(options(false, None, None)?).await?;
        }
        Commands::Whoami => {
            commands::auth::whoami(options(false, None, None)?, format).await?;
        }
        Commands::Sessions => {
            commands::sessions::list(options(false, None, None)?, format).await?;
        }
        Commands::Revoke(args) => {
            commands::sessions::revoke(options(false, None, None)?, args.session_id).await?;
        }
        Commands::Refresh(args) => {
            commands::auth::refresh(options(args.prompt, None, None)?, format).await?;
        }
        Commands::Config(args) => match &args.command {
            cli::ConfigCommands::Show => {
                let cfg = config::load_profile(profile)?;
                println!("{}: {}", "Profile".cyan(), profile);
                println!(
                    "{}: {}",
                    "Server".cyan(),
                    cfg.server.as_deref().unwrap_or("(not set)")
                );
                println!(
                    "{}: {}",
                    "Username".cyan(),
                    cfg.username.as_deref().unwrap_or("(not set)")
                );
            }
            cli::ConfigCommands::Set(set_args) => {
                let mut cfg = config::load_profile(profile)?;
                match set_args.key.as_str() {
                    "server" => cfg.server = Some(set_args.value.clone()),
                    "username" => cfg.username = Some(set_args.value.clone()),
                    other => {
                        anyhow::bail!("Unknown config key: {other}. Valid keys: server, username")
                    }
                }
                config::save_profile(profile, &cfg)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        },
    }

    Ok(())
}
