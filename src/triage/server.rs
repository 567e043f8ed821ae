use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};

/// Configuration for the triage server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8765,
            dev_mode: false,
        }
    }
}

impl ServerConfig {
    /// Dev mode listens on all interfaces.
    pub fn bind_host(&self) -> &str {
        if self.dev_mode { "0.0.0.0" } else { self.host.as_str() }
    }
}

/// Build the full application router: API routes, static fallback and
/// request tracing.
pub fn build_router(state: Arc<AppState>, dev_mode: bool) -> Router {
    let mut app = api::api_router()
        .fallback(api::static_handler)
        .method_not_allowed_fallback(api::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if dev_mode {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Requests a graceful stop of a running [`TriageServer`].
#[derive(Clone)]
pub struct ShutdownHandle(watch::Sender<bool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}

/// A bound server. Stops accepting connections once its shutdown handle
/// fires; in-flight requests are allowed to finish.
pub struct TriageServer {
    listener: TcpListener,
    router: Router,
    shutdown_tx: watch::Sender<bool>,
}

impl TriageServer {
    pub async fn bind(config: &ServerConfig, state: Arc<AppState>) -> Result<Self> {
        let addr = format!("{}:{}", config.bind_host(), config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            listener,
            router: build_router(state, config.dev_mode),
            shutdown_tx,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().context("Failed to read local address")
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Serve until the shutdown handle fires.
    pub async fn serve(self) -> Result<()> {
        let Self {
            listener,
            router,
            shutdown_tx,
        } = self;
        let mut shutdown_rx = shutdown_tx.subscribe();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await
            .context("Server error")?;

        drop(shutdown_tx);
        tracing::info!("server shut down gracefully");
        Ok(())
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::assets::AssetSource;
    use crate::triage::runner::testing::MockRunner;
    use crate::triage::store::TriageStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    fn test_state(dir: &std::path::Path) -> Arc<AppState> {
        Arc::new(AppState::new(
            TriageStore::new(dir),
            Arc::new(MockRunner::new()),
            "owner/repo",
            AssetSource::Embedded,
        ))
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            port: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()), false);
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_static_index_via_full_router() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()), false);
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).contains("Issue Triage"));
    }

    #[tokio::test]
    async fn test_dev_mode_adds_cors_headers() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()), true);
        let req = Request::builder()
            .uri("/health")
            .header("origin", "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.headers().contains_key("access-control-allow-origin"));
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8765);
        assert_eq!(config.bind_host(), "127.0.0.1");
        let dev = ServerConfig {
            dev_mode: true,
            ..Default::default()
        };
        assert_eq!(dev.bind_host(), "0.0.0.0");
    }

    #[tokio::test]
    async fn test_serve_over_tcp_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let server = TriageServer::bind(&test_config(), test_state(dir.path()))
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
        let handle = server.shutdown_handle();
        let task = tokio::spawn(server.serve());

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("ok"));

        handle.shutdown();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let first = TriageServer::bind(&test_config(), test_state(dir.path()))
            .await
            .unwrap();
        let port = first.local_addr().unwrap().port();
        let config = ServerConfig {
            port,
            ..Default::default()
        };
        let err = TriageServer::bind(&config, test_state(dir.path()))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to bind"));
    }
}
