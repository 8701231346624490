use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::Style;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;
use warden_auth::{SessionInfo, TokenResponse, WhoAmI};

use crate::cli::OutputFormat;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

fn format_time(at: OffsetDateTime) -> String {
    at.format(&Rfc3339).unwrap_or_else(|_| at.unix_timestamp().to_string())
}

fn format_unix(seconds: i64) -> String {
    OffsetDateTime::from_unix_timestamp(seconds)
        .map(format_time)
        .unwrap_or_else(|_| seconds.to_string())
}

fn session_state(session: &SessionInfo) -> String {
    if session.revoked {
        "revoked".red().to_string()
    } else if session.expires_at <= OffsetDateTime::now_utc() {
        "expired".yellow().to_string()
    } else {
        "active".green().to_string()
    }
}

pub fn print_tokens(tokens: &TokenResponse, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            // Token values stay in the cache.
            let body = serde_json::json!({
                "identity": tokens.identity,
                "session_id": tokens.session_id,
                "access_token_expires_at": tokens.access_token_expires_at,
                "refresh_token_expires_at": tokens.refresh_token_expires_at,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Table => {
            println!("{}: {}", "Identity".cyan(), tokens.identity);
            println!("{}: {}", "Session".cyan(), tokens.session_id);
            println!(
                "{}: {}",
                "Access token expires".cyan(),
                format_unix(tokens.access_token_expires_at)
            );
            println!(
                "{}: {}",
                "Refresh token expires".cyan(),
                format_unix(tokens.refresh_token_expires_at)
            );
        }
    }
    Ok(())
}

pub fn print_whoami(me: &WhoAmI, server: &str, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(me)?),
        OutputFormat::Table => {
            println!("{}: {}", "Server".cyan(), server);
            println!("{}: {}", "Identity".cyan(), me.identity);
            println!("{}: {}", "Session".cyan(), me.current_session);
            let active = me
                .sessions
                .iter()
                .filter(|s| !s.revoked && s.expires_at > OffsetDateTime::now_utc())
                .count();
            println!("{}: {active}", "Active sessions".cyan());
        }
    }
    Ok(())
}

pub fn print_sessions(me: &WhoAmI, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&me.sessions)?),
        OutputFormat::Table => {
            if me.sessions.is_empty() {
                println!("No sessions found.");
                return Ok(());
            }
            println!("{}", sessions_table(&me.sessions, me.current_session));
        }
    }
    Ok(())
}

fn sessions_table(sessions: &[SessionInfo], current: Uuid) -> String {
    let mut builder = Builder::default();
    builder.push_record(["", "ID", "Created", "Expires", "State"]);
    for session in sessions {
        let marker = if session.id == current { "*" } else { "" };
        builder.push_record([
            marker.to_string(),
            session.id.to_string(),
            format_time(session.created_at),
            format_time(session.expires_at),
            session_state(session),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}
