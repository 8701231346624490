use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use warden_client::{
    AuthTransport, ClientAuthContext, ClientAuthContextBuilder, ClientError, FileTokenCache,
    HttpTransport,
};

use crate::prompt::TerminalCredentials;

/// Everything needed to reach one server with one profile.
pub struct SessionOptions {
    pub server: String,
    pub timeout: Duration,
    pub username: Option<String>,
    pub password: Option<String>,
    pub prompt: bool,
}

fn builder(opts: SessionOptions) -> Result<(ClientAuthContextBuilder, FileTokenCache)> {
    let transport = HttpTransport::new(&opts.server)
        .with_context(|| format!("Invalid server URL {}", opts.server))?;
    let cache = FileTokenCache::in_user_cache_dir(&transport.server_key())?;
    let builder = ClientAuthContext::builder(Arc::new(transport))
        .with_cache(Arc::new(cache.clone()))
        .with_credentials(Arc::new(TerminalCredentials::new(
            opts.username,
            opts.password,
        )))
        .with_prompt(opts.prompt)
        .with_request_timeout(opts.timeout);
    Ok((builder, cache))
}

/// Logs in and caches the new session.
pub async fn login(opts: SessionOptions) -> Result<ClientAuthContext> {
    let (builder, _) = builder(opts)?;
    Ok(builder.authenticate().await?)
}

/// Opens the cached session.
pub async fn resume(opts: SessionOptions) -> Result<ClientAuthContext> {
    let server = opts.server.clone();
    let (builder, cache) = builder(opts)?;
    match builder.resume().await {
        Ok(context) => Ok(context),
        Err(ClientError::NotAuthenticated { .. }) => {
            anyhow::bail!("Not logged in to {server}. Run: warden login")
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!(
            "Cannot read token cache {}",
            cache.path().display()
        ))),
    }
}
