//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/signup` - Create account and start a session
/// - `POST /api/auth/login` - Email/password login
/// - `POST /api/auth/logout` - Clear the session cookie
/// - `GET /api/me` - Current user and session claims
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/signup", post(handlers::signup_handler))
        .route("/api/auth/login", post(handlers::login_handler))
        .route("/api/auth/logout", post(handlers::logout_handler))
        .route("/api/me", get(handlers::me_handler))
}
