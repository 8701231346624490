use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use warden_auth::AuthService;

use crate::config::{AppConfig, ServerConfigError, loader::load_config};
use crate::{handlers, observability};

pub struct WardenServer {
    addr: SocketAddr,
    app: Router,
    service: Arc<AuthService>,
    config_path: Option<String>,
}

/// Builds the HTTP application around an existing service.
pub fn build_app(cfg: &AppConfig, service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .merge(warden_auth::auth_router(service))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(cfg.server.body_limit_bytes))
}

pub struct ServerBuilder {
    config: AppConfig,
    config_path: Option<String>,
}

impl ServerBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    /// Remembers where the configuration came from, enabling reload on SIGHUP.
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn build(self) -> anyhow::Result<WardenServer> {
        let service = Arc::new(AuthService::from_config(&self.config.auth)?);
        let app = build_app(&self.config, service.clone());
        Ok(WardenServer {
            addr: self.config.addr(),
            app,
            service,
            config_path: self.config_path,
        })
    }
}

impl WardenServer {
    pub fn service(&self) -> &Arc<AuthService> {
        &self.service
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);

        let reloader = self
            .config_path
            .map(|path| tokio::spawn(reload_on_hangup(path, self.service.clone())));

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        if let Some(handle) = reloader {
            handle.abort();
        }
        Ok(())
    }
}

/// Re-reads the configuration and applies what can change at runtime:
/// the signing secrets and the log level.
///
/// Lifetimes, the identity backend and admins require a restart.
pub fn reload_config(path: &str, service: &AuthService) -> Result<AppConfig, ServerConfigError> {
    let cfg = load_config(Some(path))?;
    service
        .keys()
        .reload(cfg.auth.secret_keys.iter().cloned())
        .map_err(|e| ServerConfigError::Invalid(e.to_string()))?;
    observability::apply_logging_level(&cfg.logging.level);
    tracing::info!(
        path,
        secrets = service.keys().len(),
        current_kid = %service.keys().current_kid(),
        "Configuration reloaded"
    );
    Ok(cfg)
}

#[cfg(unix)]
async fn reload_on_hangup(path: String, service: Arc<AuthService>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot listen for SIGHUP, config reload disabled");
            return;
        }
    };
    while hangup.recv().await.is_some() {
        if let Err(e) = reload_config(&path, &service) {
            tracing::warn!(error = %e, "Config reload failed, keeping previous configuration");
        }
    }
}

#[cfg(not(unix))]
async fn reload_on_hangup(_path: String, _service: Arc<AuthService>) {}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
