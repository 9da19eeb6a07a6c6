//! Authentication handlers

use axum::extract::{Extension, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::extractors::AuthedUser;
use super::models::{LoginRequest, NewUser, Role, SignupRequest, User, UserResponse};
use super::password::{hash_password, verify_password};
use super::session::removal_cookie;
use super::store::UserStore;
use crate::common::{safe_email_log, ApiError, AppState, Validator};

/// POST /api/auth/signup
/// Creates an unpaid account and starts a session
///
/// # Request Body
/// ```json
/// { "email": "a@x.com", "password": "p", "role": "student",
///   "first_name": "Amani", "last_name": "Otieno", "language_preference": "sw" }
/// ```
pub async fn signup_handler(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<SignupRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    payload.validate().into_result()?;

    let store = UserStore::new(state.db.clone());
    if store.get_user_by_email(&payload.email).await?.is_some() {
        warn!(email = %safe_email_log(&payload.email), "Signup rejected: email already registered");
        return Err(ApiError::Conflict("User already exists".to_string()));
    }

    let role: Role = payload
        .role
        .parse()
        .map_err(|e: String| ApiError::ValidationError(format!("role: {}", e)))?;
    let password_hash = hash_password_blocking(payload.password).await?;

    let user = store
        .create_user(NewUser {
            email: payload.email,
            password_hash,
            role,
            first_name: payload.first_name.trim().to_string(),
            last_name: payload.last_name.trim().to_string(),
            language_preference: payload
                .language_preference
                .unwrap_or_else(|| "en".to_string()),
        })
        .await?;

    let jar = start_session(&state, jar, &user)?;
    Ok((jar, Json(serde_json::json!({ "user": UserResponse::from(&user) }))))
}

/// POST /api/auth/login
pub async fn login_handler(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    payload.validate().into_result()?;

    let store = UserStore::new(state.db.clone());
    let user = match store.get_user_by_email(&payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %safe_email_log(&payload.email), "Login failed: unknown email");
            return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
        }
    };

    if !verify_password_blocking(payload.password, user.password_hash.clone()).await? {
        warn!(user_id = user.id, "Login failed: wrong password");
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let jar = start_session(&state, jar, &user)?;
    Ok((jar, Json(serde_json::json!({ "user": UserResponse::from(&user) }))))
}

/// POST /api/auth/logout
/// Clears the session cookie; the token itself simply expires
pub async fn logout_handler(jar: CookieJar) -> (CookieJar, Json<serde_json::Value>) {
    (
        jar.remove(removal_cookie()),
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    )
}

/// GET /api/me
/// Returns the live user record next to the (possibly stale) session claims
pub async fn me_handler(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let store = UserStore::new(state.db.clone());
    let user = match store.get_user_by_id(authed.id).await? {
        Some(u) => u,
        None => {
            warn!(user_id = authed.id, "Session refers to a user that no longer exists");
            return Err(ApiError::Unauthorized("user not found".into()));
        }
    };

    Ok(Json(serde_json::json!({
        "user": UserResponse::from(&user),
        "session": {
            "email": authed.email,
            "role": authed.role,
            "has_paid": authed.has_paid,
        },
    })))
}

/// Issue a token for `user` and attach it as the session cookie
pub fn start_session(state: &AppState, jar: CookieJar, user: &User) -> Result<CookieJar, ApiError> {
    let token = state.sessions.issue(user)?;
    let expires = Utc::now() + state.sessions.ttl();

    info!(
        user_id = user.id,
        email = %safe_email_log(&user.email),
        has_paid = user.has_paid,
        expires_at = %expires.to_rfc3339(),
        "Session issued"
    );

    Ok(jar.add(state.sessions.cookie(token, state.config.production)))
}

async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            error!(error = %e, "Password hashing task failed");
            ApiError::InternalServer("password hashing failed".to_string())
        })?
        .map_err(|e| {
            error!(error = %e, "Password hashing failed");
            ApiError::InternalServer("password hashing failed".to_string())
        })
}

async fn verify_password_blocking(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            error!(error = %e, "Password verification task failed");
            ApiError::InternalServer("password verification failed".to_string())
        })
}
