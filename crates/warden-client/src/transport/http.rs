//! HTTP transport.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;
use warden_auth::types::{Credentials, ErrorBody, RefreshRequest, TokenResponse, WhoAmI};

use crate::error::ClientError;
use crate::ClientResult;
use crate::transport::AuthTransport;

/// Talks to the Warden HTTP surface.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Creates a transport for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the URL does not parse or is not
    /// an `http(s)` URL.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_client(Client::new(), base_url)
    }

    /// Creates a transport reusing an existing `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if the URL is unusable.
    pub fn with_client(client: Client, base_url: &str) -> ClientResult<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| ClientError::Validation {
            message: format!("invalid server URL '{base_url}': {e}"),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::Validation {
                message: format!("unsupported URL scheme '{}'", base_url.scheme()),
            });
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    /// Returns the server base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::transport(format!("cannot build URL for {path}: {e}")))
    }
}

/// Turns a response into `T`, or into the `ClientError` its error body describes.
async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let response = check_status(response).await?;
    response.json::<T>().await.map_err(ClientError::from)
}

async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.json::<ErrorBody>().await.ok();
    debug!(status = status.as_u16(), error = ?body.as_ref().map(|b| &b.error), "Server rejected request");
    Err(ClientError::from_response(status.as_u16(), body))
}

#[async_trait]
impl AuthTransport for HttpTransport {
    async fn login(&self, credentials: &Credentials) -> ClientResult<TokenResponse> {
        let response = self
            .client
            .post(self.endpoint("auth/token")?)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;
        read_json(response).await
    }

    async fn refresh(&self, refresh_token: &str) -> ClientResult<TokenResponse> {
        let response = self
            .client
            .post(self.endpoint("auth/token/refresh")?)
            .json(&RefreshRequest {
                refresh_token: refresh_token.to_string(),
            })
            .send()
            .await?;
        read_json(response).await
    }

    async fn whoami(&self, access_token: &str) -> ClientResult<WhoAmI> {
        let response = self
            .client
            .get(self.endpoint("auth/whoami")?)
            .bearer_auth(access_token)
            .send()
            .await?;
        read_json(response).await
    }

    async fn revoke_session(&self, access_token: &str, session_id: Uuid) -> ClientResult<()> {
        let response = self
            .client
            .delete(self.endpoint(&format!("auth/session/{session_id}"))?)
            .bearer_auth(access_token)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    fn server_key(&self) -> String {
        let host = self.base_url.host_str().unwrap_or("localhost");
        match self.base_url.port_or_known_default() {
            Some(port) => format!("{host}_{port}"),
            None => host.to_string(),
        }
    }
}
