//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::Role;
use super::session::{token_from_request, SessionClaims};
use crate::common::{safe_email_log, ApiError, AppState};

/// Authenticated user extractor
///
/// Reuses the claims the access gate already validated for this request;
/// otherwise decodes the session cookie (or bearer token) itself.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub has_paid: bool,
}

impl AuthedUser {
    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn require_teacher(&self) -> Result<(), ApiError> {
        if self.is_teacher() {
            Ok(())
        } else {
            warn!(user_id = self.id, "Teacher-only operation attempted by student");
            Err(ApiError::Forbidden("Access denied".to_string()))
        }
    }
}

impl From<SessionClaims> for AuthedUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            id: claims.user_id,
            email: claims.email,
            role: claims.role,
            has_paid: claims.has_paid,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<SessionClaims>() {
            return Ok(claims.clone().into());
        }

        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let jar = CookieJar::from_headers(&parts.headers);
        let token = match token_from_request(&jar, &parts.headers) {
            Some(t) => t,
            None => {
                warn!("Authentication failed: no session cookie or bearer token");
                return Err(ApiError::Unauthorized("missing session".into()));
            }
        };

        let claims = app_state.sessions.validate(&token)?;
        debug!(
            user_id = claims.user_id,
            email = %safe_email_log(&claims.email),
            "Session validated via extractor"
        );

        Ok(claims.into())
    }
}

/// Authenticated user whose session carries the paid claim
#[derive(Debug, Clone)]
pub struct PaidUser(pub AuthedUser);

#[async_trait]
impl<S> FromRequestParts<S> for PaidUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthedUser::from_request_parts(parts, state).await?;
        if !user.has_paid {
            warn!(user_id = user.id, "Paid content requested without payment");
            return Err(ApiError::PaymentRequired("Payment required".to_string()));
        }
        Ok(PaidUser(user))
    }
}
