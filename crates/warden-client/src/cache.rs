//! Token caches.
//!
//! A cache persists one session's [`TokenResponse`] so that a later
//! [`ClientAuthContext`](crate::ClientAuthContext) can resume the session
//! without credentials. Caches may be shared by several contexts.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;
use warden_auth::types::TokenResponse;

use crate::ClientResult;
use crate::error::ClientError;

/// Storage for a session's current token pair.
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Returns the cached pair, if any.
    async fn load(&self) -> ClientResult<Option<TokenResponse>>;

    /// Replaces the cached pair.
    async fn store(&self, tokens: &TokenResponse) -> ClientResult<()>;

    /// Removes the cached pair. Clearing an empty cache succeeds.
    async fn clear(&self) -> ClientResult<()>;
}

// ============================================================================
// In-memory
// ============================================================================

/// Keeps the token pair in process memory.
#[derive(Debug, Default)]
pub struct MemoryTokenCache {
    tokens: Mutex<Option<TokenResponse>>,
}

impl MemoryTokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ClientResult<std::sync::MutexGuard<'_, Option<TokenResponse>>> {
        self.tokens
            .lock()
            .map_err(|_| ClientError::cache("token cache lock poisoned"))
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    async fn load(&self) -> ClientResult<Option<TokenResponse>> {
        Ok(self.lock()?.clone())
    }

    async fn store(&self, tokens: &TokenResponse) -> ClientResult<()> {
        *self.lock()? = Some(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        *self.lock()? = None;
        Ok(())
    }
}

// ============================================================================
// File
// ============================================================================

const TOKEN_FILE: &str = "tokens.json";

/// Keeps the token pair in a JSON file readable only by its owner.
///
/// Layout: `<root>/<server_key>/tokens.json`, where `server_key` identifies
/// the server by host and port.
#[derive(Debug, Clone)]
pub struct FileTokenCache {
    path: PathBuf,
}

impl FileTokenCache {
    /// Creates a cache for `server_key` under `root`.
    #[must_use]
    pub fn new(root: impl AsRef<Path>, server_key: &str) -> Self {
        Self {
            path: root
                .as_ref()
                .join(sanitize(server_key))
                .join(TOKEN_FILE),
        }
    }

    /// Creates a cache for `server_key` under the user's cache directory
    /// (`~/.cache/warden` on Linux).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Cache` if the platform has no cache directory.
    pub fn in_user_cache_dir(server_key: &str) -> ClientResult<Self> {
        let root = dirs::cache_dir()
            .ok_or_else(|| ClientError::cache("cannot determine cache directory"))?
            .join("warden");
        Ok(Self::new(root, server_key))
    }

    /// Returns the path of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Keeps a server key usable as a single path component.
fn sanitize(server_key: &str) -> String {
    server_key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> ClientError {
    ClientError::cache(format!("cannot {action} {}: {err}", path.display()))
}

#[async_trait]
impl TokenCache for FileTokenCache {
    async fn load(&self) -> ClientResult<Option<TokenResponse>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", &self.path, e)),
        };
        let tokens = serde_json::from_str(&content).map_err(|e| {
            ClientError::cache(format!("corrupt token file {}: {e}", self.path.display()))
        })?;
        Ok(Some(tokens))
    }

    async fn store(&self, tokens: &TokenResponse) -> ClientResult<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| io_error("create", dir, e))?;
        }

        let content = serde_json::to_vec_pretty(tokens)
            .map_err(|e| ClientError::cache(format!("cannot serialize tokens: {e}")))?;

        // Written next to the target and renamed, so readers never see a partial file.
        // Unique per writer, so concurrent stores never share a temp file.
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&tmp)
            .await
            .map_err(|e| io_error("create", &tmp, e))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, &content)
            .await
            .map_err(|e| io_error("write", &tmp, e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error("sync", &tmp, e))?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error("replace", &self.path, e));
        }
        debug!(path = %self.path.display(), "Stored token pair");
        Ok(())
    }

    async fn clear(&self) -> ClientResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove", &self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;
    use warden_auth::types::Identity;

    use super::*;

    fn sample_tokens() -> TokenResponse {
        TokenResponse {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 900,
            access_token_expires_at: 1_700_000_900,
            refresh_token_expires_at: 1_700_604_800,
            session_id: Uuid::new_v4(),
            identity: Identity::new("alice"),
        }
    }

    #[tokio::test]
    async fn test_memory_cache() {
        let cache = MemoryTokenCache::new();
        assert!(cache.load().await.unwrap().is_none());

        let tokens = sample_tokens();
        cache.store(&tokens).await.unwrap();
        assert_eq!(cache.load().await.unwrap(), Some(tokens));

        cache.clear().await.unwrap();
        assert!(cache.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTokenCache::new(dir.path(), "localhost_8000");
        assert!(cache.load().await.unwrap().is_none());

        let tokens = sample_tokens();
        cache.store(&tokens).await.unwrap();
        assert!(cache.path().starts_with(dir.path().join("localhost_8000")));
        assert_eq!(cache.load().await.unwrap(), Some(tokens));

        cache.clear().await.unwrap();
        assert!(cache.load().await.unwrap().is_none());
        // Clearing twice is fine.
        cache.clear().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_cache_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let cache = FileTokenCache::new(dir.path(), "localhost_8000");
        cache.store(&sample_tokens()).await.unwrap();

        let mode = std::fs::metadata(cache.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_concurrent_writers_share_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = FileTokenCache::new(&root, "localhost_8000");
            handles.push(tokio::spawn(async move {
                cache.store(&sample_tokens()).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let cache = FileTokenCache::new(&root, "localhost_8000");
        assert!(cache.load().await.unwrap().is_some());
        let leftovers: Vec<_> = std::fs::read_dir(cache.path().parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("tokens.json")]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_cache_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileTokenCache::new(dir.path(), "localhost_8000");
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(cache.path(), "not json").unwrap();

        assert!(matches!(
            cache.load().await,
            Err(ClientError::Cache { .. })
        ));
    }

    #[test]
    fn test_server_key_sanitized() {
        assert_eq!(sanitize("127.0.0.1_8000"), "127.0.0.1_8000");
        assert_eq!(sanitize("../etc/passwd"), ".._etc_passwd");
    }
}
