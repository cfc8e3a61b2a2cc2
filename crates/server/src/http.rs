//! HTTP Endpoints
//!
//! REST API and WebSocket upgrade surface for the translation relay.

use axum::{
    extract::{Json, Path, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::websocket::WebSocketHandler;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let settings = state.get_settings();
    let cors_layer = build_cors_layer(&settings.server.cors_origins, settings.server.cors_enabled);
    drop(settings);

    Router::new()
        .route("/api/sessions/:id", get(get_session_status))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .route("/admin/reload-config", post(reload_config))
        .route("/ws/:session_id", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

/// Builds the CORS layer from configured origins.
///
/// - If `cors_enabled` is false, returns a permissive layer (development only).
/// - If `origins` is empty, defaults to localhost for safety.
/// - Otherwise, restricts to the configured origins with credentials allowed.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    if origins.is_empty() {
        tracing::info!("No CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::error!("All configured CORS origins are invalid, falling back to localhost");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(true)
}

/// Debug/ops visibility into a session's current state (not part of the
/// client wire protocol, which reports status over the WebSocket instead).
async fn get_session_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let status = state
        .session_status(&id)
        .await
        .map_err(|_| StatusCode::NOT_FOUND)?;

    Ok(Json(serde_json::json!({
        "session_id": id,
        "listener_count": status.listener_count,
        "language_distribution": status.language_distribution,
        "session_duration_secs": status.session_duration_secs,
        "broadcast_state": status.broadcast_state,
    })))
}

async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let active_sessions = state.sessions.list_active_sessions().await.len();
    let health = state.degradation.get_system_health();

    let status_code = match health.status {
        relay_resilience::HealthStatus::Healthy => StatusCode::OK,
        relay_resilience::HealthStatus::Degraded => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if status_code == StatusCode::OK { "ready" } else { "degraded" },
            "active_sessions": active_sessions,
            "degraded_services": health.degraded_services,
        })),
    )
}

async fn metrics_handler(State(_state): State<AppState>) -> impl IntoResponse {
    crate::metrics::render()
}

/// Reloads configuration from disk. Useful for updating settings without a
/// restart. Some settings (like the listening port) are only applied at
/// startup.
async fn reload_config(State(state): State<AppState>) -> impl IntoResponse {
    match state.reload_config() {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "message": "configuration reloaded successfully"
            })),
        ),
        Err(e) => {
            tracing::error!("config reload failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e
                })),
            )
        }
    }
}

async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    WebSocketHandler::handle(ws, State(state), Path(session_id)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_config::Settings;

    #[test]
    fn test_router_creation() {
        let state = AppState::new(Settings::default());
        let _ = create_router(state);
    }
}
