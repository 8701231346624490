use anyhow::Result;
use colored::Colorize;
use warden_client::ClientError;

use crate::cli::OutputFormat;
use crate::output::{print_success, print_tokens, print_whoami};
use crate::session::{self, SessionOptions};

pub async fn login(opts: SessionOptions, format: OutputFormat) -> Result<()> {
    let server = opts.server.clone();
    let context = session::login(opts).await?;
    let tokens = context.tokens().await;
    print_success(&format!(
        "Logged in to {} as {}",
        server.cyan(),
        tokens.identity.to_string().cyan()
    ));
    print_tokens(&tokens, format)
}

pub async fn logout(opts: SessionOptions) -> Result<()> {
    let context = session::resume(opts).await?;
    let session_id = context.session_id().await;
    context.logout().await?;
    print_success(&format!("Logged out (session {session_id} revoked)"));
    Ok(())
}

pub async fn whoami(opts: SessionOptions, format: OutputFormat) -> Result<()> {
    let server = opts.server.clone();
    let context = session::resume(opts).await?;
    let me = context.whoami().await.map_err(explain)?;
    print_whoami(&me, &server, format)
}

pub async fn refresh(opts: SessionOptions, format: OutputFormat) -> Result<()> {
    let prompt = opts.prompt;
    let context = session::resume(opts).await?;
    context.reauthenticate(prompt).await.map_err(explain)?;
    print_success("Access token refreshed");
    print_tokens(&context.tokens().await, format)
}

/// Adds a hint to errors that require logging in again.
pub fn explain(err: ClientError) -> anyhow::Error {
    match err.cannot_refresh_reason() {
        Some(reason) => anyhow::Error::new(err)
            .context(format!("Session can no longer be refreshed ({reason}). Run: warden login")),
        None => err.into(),
    }
}
