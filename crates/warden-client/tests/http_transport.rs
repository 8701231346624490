use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use warden_auth::{AuthConfig, AuthService, AuthenticatorConfig, CannotRefreshReason};
use warden_client::{
    AuthTransport, ClientAuthContext, ClientError, FileTokenCache, HttpTransport,
    StaticCredentials, TokenCache,
};

fn test_config() -> AuthConfig {
    AuthConfig {
        secret_keys: vec!["SECRET".to_string()],
        authenticator: AuthenticatorConfig::Dictionary {
            users: HashMap::from([
                ("alice".to_string(), "secret1".to_string()),
                ("bob".to_string(), "secret2".to_string()),
            ]),
        },
        ..AuthConfig::default()
    }
}

async fn start_server() -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let service = Arc::new(AuthService::from_config(&test_config()).expect("service"));
    let app = warden_auth::auth_router(service);

    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

#[tokio::test]
async fn login_errors_map_over_http() {
    let (base, shutdown_tx, handle) = start_server().await;
    let transport = Arc::new(HttpTransport::new(&base).unwrap());

    let err = ClientAuthContext::authenticate(
        transport.clone(),
        Arc::new(StaticCredentials::new("alice", "wrong")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClientError::AuthenticationFailed { .. }));

    let err = ClientAuthContext::authenticate(
        transport.clone(),
        Arc::new(StaticCredentials::new("alice", "")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClientError::Validation { .. }));

    let err = transport.whoami("not-a-token").await.unwrap_err();
    assert!(err.is_token_rejection());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn session_lifecycle_over_http_with_file_cache() {
    let (base, shutdown_tx, handle) = start_server().await;
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(HttpTransport::new(&base).unwrap());
    let cache = Arc::new(FileTokenCache::new(dir.path(), &transport.server_key()));

    let context = ClientAuthContext::builder(transport.clone())
        .with_cache(cache.clone())
        .with_credentials(Arc::new(StaticCredentials::new("alice", "secret1")))
        .authenticate()
        .await
        .unwrap();
    assert!(cache.path().exists());

    let me = context.whoami().await.unwrap();
    assert_eq!(me.identity.as_str(), "alice");
    assert_eq!(me.current_session, context.session_id().await);

    context.reauthenticate(false).await.unwrap();
    let cached = cache.load().await.unwrap().unwrap();
    assert_eq!(cached, context.tokens().await);

    // A second process resumes from the file and revokes the session.
    let resumed = ClientAuthContext::resume(transport.clone(), cache.clone())
        .await
        .unwrap();
    resumed
        .revoke_session(resumed.session_id().await)
        .await
        .unwrap();
    assert!(cache.load().await.unwrap().is_none());

    let err = context.reauthenticate(false).await.unwrap_err();
    assert_eq!(err.cannot_refresh_reason(), Some(CannotRefreshReason::Revoked));

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn unreachable_server_is_recoverable() {
    let listener = std::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = Arc::new(HttpTransport::new(&format!("http://{addr}")).unwrap());
    let err = ClientAuthContext::authenticate(
        transport,
        Arc::new(StaticCredentials::new("alice", "secret1")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
    assert!(err.is_recoverable());
}
