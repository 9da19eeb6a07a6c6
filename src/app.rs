// src/app.rs
//! Router composition

use axum::{
    extract::Extension,
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::common::{ApiError, AppState};
use crate::{auth, content, gate, logging_middleware, payments};

pub fn build_router(state: Arc<AppState>) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    Router::new()
        // ====================================================================
        // PUBLIC
        // ====================================================================
        .route("/", get(root))
        .route("/health", get(health))
        // ====================================================================
        // FEATURE ROUTES
        // ====================================================================
        .merge(auth::auth_routes())
        .merge(payments::payment_routes())
        .merge(content::content_routes())
        // ====================================================================
        // MIDDLEWARE AND LAYERS (outermost last)
        // ====================================================================
        .layer(middleware::from_fn(gate::access_gate))
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "learn-anywhere",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    sqlx::query("SELECT 1").execute(&state.db).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
