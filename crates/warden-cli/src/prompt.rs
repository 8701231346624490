use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use warden_auth::Credentials;
use warden_client::{ClientError, ClientResult, CredentialProvider};

/// Reads whatever part of the credentials was not given on the command line
/// from the terminal.
pub struct TerminalCredentials {
    username: Option<String>,
    password: Option<String>,
}

impl TerminalCredentials {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }
}

fn read_line(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt}")?;
    stderr.flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[async_trait]
impl CredentialProvider for TerminalCredentials {
    async fn credentials(&self) -> ClientResult<Credentials> {
        let username = self.username.clone();
        let password = self.password.clone();
        tokio::task::spawn_blocking(move || -> io::Result<Credentials> {
            let username = match username {
                Some(u) => u,
                None => read_line("Username: ")?,
            };
            let password = match password {
                Some(p) => p,
                None => read_line("Password: ")?,
            };
            Ok(Credentials::new(username, password))
        })
        .await
        .map_err(|e| ClientError::not_authenticated(format!("credential prompt failed: {e}")))?
        .map_err(|e| ClientError::not_authenticated(format!("cannot read credentials: {e}")))
    }
}
