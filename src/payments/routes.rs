//! Payment routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// # Routes
/// - `POST /api/payment/initialize` - Start a provider transaction
/// - `GET /api/payment/verify` - Provider callback, redirects the browser
pub fn payment_routes() -> Router {
    Router::new()
        .route("/api/payment/initialize", post(handlers::initialize_payment))
        .route("/api/payment/verify", get(handlers::verify_payment))
}
