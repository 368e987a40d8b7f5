//! Web server module.

mod auth;
mod handlers;
mod validate;

use crate::config::ServerConfig;
use crate::db::Store;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<Store>,
}

/// JSON error body in the `{ success: false, error }` shape.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

/// Generic 500. Details stay in the server log.
pub(crate) fn internal_error() -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let admin = Router::new()
        .route("/api/admin/dashboard-stats", get(handlers::handle_dashboard_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    Router::new()
        .merge(admin)
        // Public forms
        .route("/api/bookings/tour", post(handlers::handle_tour_booking))
        .route("/api/bookings/car-rental", post(handlers::handle_car_rental))
        .route("/api/bookings/cab", post(handlers::handle_cab_booking))
        .route("/api/events/register", post(handlers::handle_event_registration))
        .route("/api/air-travel", post(handlers::handle_air_travel))
        .route("/api/contact", post(handlers::handle_contact))
        .route("/api/newsletter", post(handlers::handle_newsletter))
        // Public content
        .route("/api/content/{category}", get(handlers::handle_list_content))
        .route("/api/health", get(handlers::handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
        .with_state(state)
}

/// Web server for tripdesk.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, store: Arc<Store>) -> Self {
        Self {
            state: AppState { config, store },
        }
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = router(self.state.clone());

        if self.state.config.admin_token.is_none() {
            tracing::warn!("TRIPDESK_ADMIN_TOKEN is not set; admin routes will reject every request");
        }
        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
