//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;

use crate::app::AppState;
use crate::config::AssetMode;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/api/health", get(health_handler))
        .route("/ws", get(ws_handler));

    let router = match state.config.asset_mode {
        AssetMode::Static => {
            let dir = &state.config.static_dir;
            info!(static_dir = %dir.display(), "Serving client assets");
            // Unknown paths fall back to the SPA entry point
            let assets = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
            router.fallback_service(assets)
        }
        AssetMode::Development => router.layer(dev_cors(&state.config.client_origin)),
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

/// CORS for an external dev asset server (comma-separated origins or `*`)
fn dev_cors(client_origin: &str) -> CorsLayer {
    let allow_origin = if client_origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = client_origin
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        players: state.session.player_count(),
    })
}
