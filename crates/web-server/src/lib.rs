//! # Salesboard Web Server
//!
//! The JSON API the presentation layer talks to. Every route except `/api/health`
//! requires a bearer token issued by the platform's auth service.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use backend_client::{AuthProvider, Backend};
use configuration::{AuthConfig, ExportConfig};
use service::SalesService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
pub struct AppState {
    pub service: SalesService,
    pub auth: Arc<dyn AuthProvider>,
    pub backend: Arc<dyn Backend>,
}

impl AppState {
    pub fn new(
        backend: Arc<dyn Backend>,
        auth: Arc<dyn AuthProvider>,
        auth_config: AuthConfig,
        export_config: ExportConfig,
    ) -> Self {
        let service = SalesService::new(backend.clone(), auth_config, export_config);
        Self { service, auth, backend }
    }
}

/// Builds the application router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/ranking", get(handlers::get_ranking))
        .route("/api/orders", get(handlers::get_orders).post(handlers::create_order))
        .route("/api/orders/:id", delete(handlers::delete_order))
        .route("/api/metrics", get(handlers::get_metrics))
        .route("/api/metrics/:id", put(handlers::update_metric))
        .route(
            "/api/custom-fields",
            get(handlers::get_custom_fields).post(handlers::create_custom_field),
        )
        .route("/api/custom-fields/:id", delete(handlers::delete_custom_field))
        .route("/api/users", get(handlers::get_users).post(handlers::invite_user))
        .route("/api/users/:id/promote", post(handlers::promote_user))
        .route("/api/users/:id/demote", post(handlers::demote_user))
        .route("/api/export", get(handlers::export_orders))
        .with_state(state)
        .layer(cors)
        // Logs every incoming request.
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
}

/// Serves the API on `addr` until the process is stopped.
pub async fn run_server(state: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server started and listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
