use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use warden_auth::{AuthConfig, AuthService, AuthenticatorConfig, TokenResponse};
use warden_server::{AppConfig, build_app, reload_config};

fn test_config() -> AppConfig {
    AppConfig {
        auth: AuthConfig {
            secret_keys: vec!["SECRET".to_string()],
            authenticator: AuthenticatorConfig::Dictionary {
                users: HashMap::from([("alice".to_string(), "secret1".to_string())]),
            },
            ..AuthConfig::default()
        },
        ..AppConfig::default()
    }
}

async fn start_server(
    service: Arc<AuthService>,
) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_app(&test_config(), service);

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
async fn server_endpoints_work() {
    let service = Arc::new(AuthService::from_config(&test_config().auth).unwrap());
    let (base, shutdown_tx, handle) = start_server(service).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "Warden");
    assert_eq!(body["status"], "ok");

    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let resp = client
        .post(format!("{base}/auth/token"))
        .form(&[("username", "alice"), ("password", "secret1")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let tokens: TokenResponse = resp.json().await.unwrap();
    assert_eq!(tokens.identity.as_str(), "alice");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn reload_rotates_signing_secrets() {
    let service = Arc::new(AuthService::from_config(&test_config().auth).unwrap());
    let (base, shutdown_tx, handle) = start_server(service.clone()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/auth/token"))
        .form(&[("username", "alice"), ("password", "secret1")])
        .send()
        .await
        .unwrap();
    let tokens: TokenResponse = resp.json().await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warden.toml");
    let write_secrets = |secrets: &str| {
        std::fs::write(
            &path,
            format!(
                "[auth]\nsecret_keys = [{secrets}]\n\n[auth.authenticator]\nprovider = \"dictionary\"\nusers = {{ alice = \"secret1\" }}\n"
            ),
        )
        .unwrap();
    };

    // Prepend a new secret: old tokens still refresh.
    write_secrets("\"NEW_SECRET\", \"SECRET\"");
    reload_config(path.to_str().unwrap(), &service).unwrap();
    assert_eq!(service.keys().len(), 2);

    let resp = client
        .post(format!("{base}/auth/token/refresh"))
        .json(&serde_json::json!({ "refresh_token": tokens.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Drop the old secret: tokens signed with it are rejected.
    write_secrets("\"NEW_SECRET\"");
    reload_config(path.to_str().unwrap(), &service).unwrap();

    let resp = client
        .post(format!("{base}/auth/token/refresh"))
        .json(&serde_json::json!({ "refresh_token": tokens.refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "cannot_refresh");
    assert_eq!(body["reason"], "invalid_token");

    // A config without secrets is rejected and the ring is left alone.
    std::fs::write(&path, "[auth]\nsecret_keys = []\n").unwrap();
    assert!(reload_config(path.to_str().unwrap(), &service).is_err());
    assert_eq!(service.keys().len(), 1);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
