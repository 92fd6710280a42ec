//! MiniHub gateway: HTTP surface for the app builder, app manager and generation studio, plus
//! dynamic hosting of every app mounted in the host entry point.
//!
//! The routing table for mounted apps is a snapshot of the entry point, re-scanned after each
//! lifecycle mutation, on `POST /api/host/reload`, and when the file changes on disk.

mod handlers;
mod host;
mod watch;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request},
    middleware::Next,
    response::Response,
    routing::{get, post, put},
    Router,
};
use minihub_core::{AppLifecycle, HostConfig, HubResult, MountSnapshot};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
pub(crate) struct AppState {
    pub config: Arc<HostConfig>,
    pub hub: Arc<AppLifecycle>,
    pub mounts: Arc<RwLock<MountSnapshot>>,
    /// Client used to forward `/api/<slug>` traffic to the backend runtime.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: HostConfig, hub: AppLifecycle) -> Self {
        Self {
            config: Arc::new(config),
            hub: Arc::new(hub),
            mounts: Arc::new(RwLock::new(MountSnapshot::default())),
            http: reqwest::Client::new(),
        }
    }

    /// Re-scan the entry point and swap in the new snapshot. The write lock is held across
    /// the scan so rescans apply in the order they read the file.
    pub async fn try_refresh_mounts(&self, reason: &str) -> HubResult<usize> {
        let mut mounts = self.mounts.write().await;
        let snapshot = self.hub.snapshot().await?;
        let mounted = snapshot.len();
        *mounts = snapshot;
        drop(mounts);
        tracing::info!(target: "minihub::gateway", reason, mounted, "mount registry rescanned");
        Ok(mounted)
    }

    /// Like [`try_refresh_mounts`](Self::try_refresh_mounts), keeping the previous snapshot on failure.
    pub async fn refresh_mounts(&self, reason: &str) {
        if let Err(e) = self.try_refresh_mounts(reason).await {
            tracing::warn!(target: "minihub::gateway", reason, error = %e, "mount rescan failed; keeping previous snapshot");
        }
    }
}

fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // App builder
        .route("/api/appbuilder/create", post(handlers::apps::create_app))
        // App manager
        .route("/api/appmanager/apps", get(handlers::apps::list_apps))
        .route(
            "/api/appmanager/app/:slug",
            get(handlers::apps::get_app)
                .put(handlers::apps::save_app)
                .delete(handlers::apps::delete_app),
        )
        .route("/api/appmanager/app/:slug/context", post(handlers::apps::build_context))
        // Generation studio
        .route("/api/gen-studio/apps", get(handlers::apps::list_apps))
        .route("/api/gen-studio/app/:slug", get(handlers::apps::get_app))
        .route("/api/gen-studio/create", post(handlers::studio::generate_create))
        .route("/api/gen-studio/mount", post(handlers::studio::mount_generated))
        .route("/api/gen-studio/edit", post(handlers::studio::generate_edit))
        .route("/api/gen-studio/save", put(handlers::studio::save_edit))
        .route("/api/gen-studio/models", get(handlers::studio::list_models))
        // Host registry
        .route("/api/host/mounts", get(host::mounts))
        .route("/api/host/reload", post(host::reload))
        .fallback(host::dispatch)
        .with_state(state)
        .layer(axum::middleware::from_fn(log_request))
        .layer(cors)
}

async fn log_request(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let response = next.run(request).await;
    tracing::info!(target: "minihub::http", %method, path = %path, client = %client, status = response.status().as_u16(), "request");
    response
}

async fn health() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[minihub-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match HostConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Config load failed: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        root = %config.root_dir.display(),
        entry_point = %config.entry_point_path().display(),
        apps = %config.apps_path().display(),
        backend = config.backend_url.as_deref().unwrap_or("<none>"),
        "configuration loaded"
    );

    let hub = match AppLifecycle::from_config(&config) {
        Ok(hub) => hub,
        Err(e) => {
            tracing::error!("Lifecycle setup failed: {}", e);
            std::process::exit(1);
        }
    };
    let state = AppState::new(config, hub);
    state.refresh_mounts("startup").await;

    if state.config.watch_entry_point {
        if let Err(e) = watch::spawn_entry_point_watcher(state.clone()) {
            tracing::warn!("Entry-point watcher not started: {} (use POST /api/host/reload)", e);
        }
    }

    let addr = state.config.bind_addr.clone();
    let app = build_app(state);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("MiniHub listening on {}", addr);

    let server = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>());
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested (Ctrl+C)");
        }
    }
}
