use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use libris_auth::{AuthState, HeaderResourceOwner, StoragePorts};
use libris_auth_memory::InMemoryAuthStorage;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::bootstrap::seed_storage;
use crate::config::AppConfig;

pub struct LibrisServer {
    addr: SocketAddr,
    app: Router,
    storage: Arc<InMemoryAuthStorage>,
}

async fn healthz() -> &'static str {
    "ok"
}

pub fn build_app(cfg: &AppConfig, state: AuthState) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    let mut app = libris_auth::router(state).route("/healthz", get(healthz));

    if !cfg.server.cors_allowed_origins.is_empty() {
        let origins: Vec<HeaderValue> = cfg
            .server
            .cors_allowed_origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        );
    }

    app.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &axum::http::Request<_>| {
                use tracing::field::Empty;
                // The query string of /authorize carries state and challenges; log the path only
                tracing::info_span!(
                    "http.request",
                    http.method = %req.method(),
                    http.target = %req.uri().path(),
                    http.status_code = Empty,
                )
            })
            .on_response(
                |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
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
    .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Seeds the store and wires the authorization server.
    pub async fn build(self) -> anyhow::Result<LibrisServer> {
        let cfg = self.config;
        cfg.validate()?;
        let addr = cfg.addr()?;

        let storage = Arc::new(InMemoryAuthStorage::new());
        let stats = seed_storage(&storage, &cfg).await?;
        tracing::debug!(?stats, "Storage seeded");

        let owner = Arc::new(HeaderResourceOwner::new(&cfg.server.resource_owner_header)?);
        let state = AuthState::new(
            &cfg.auth,
            StoragePorts::from_backend(storage.clone()),
            owner,
        )?;
        tracing::info!(issuer = %cfg.auth.issuer, "Authorization server configured");

        Ok(LibrisServer {
            addr,
            app: build_app(&cfg, state),
            storage,
        })
    }
}

impl LibrisServer {
    /// The backing store, for seeding beyond the configuration file.
    pub fn storage(&self) -> &Arc<InMemoryAuthStorage> {
        &self.storage
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.run_with_listener(listener).await
    }

    pub async fn run_with_listener(self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!("listening on {}", listener.local_addr()?);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
