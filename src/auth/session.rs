//! Session token codec and cookie delivery
//!
//! Sessions are HS256 JWTs carrying a small, cached claim set. `hasPaid` is
//! a snapshot taken at issue time and may lag the database by up to the
//! token lifetime; the payment callback re-issues the cookie for the payer.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use super::models::{Role, User};
use crate::common::ApiError;

pub const SESSION_COOKIE: &str = "session";

/// Claims embedded in a session token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub has_paid: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad signature, expired, wrong algorithm or undecodable payload
    #[error("invalid session token")]
    Invalid,

    #[error("failed to sign session token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Invalid => ApiError::Unauthorized("invalid session".to_string()),
            SessionError::Signing(e) => {
                error!(error = %e, "Session token signing failed");
                ApiError::InternalServer("session error".to_string())
            }
        }
    }
}

#[derive(Clone)]
pub struct SessionCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionCodec {
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &User) -> Result<String, SessionError> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, SessionError> {
        let claims = SessionClaims {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role(),
            has_paid: user.has_paid,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(SessionError::Signing)
    }

    /// Fails closed: any decode problem yields `SessionError::Invalid`
    pub fn validate(&self, token: &str) -> Result<SessionClaims, SessionError> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Session token rejected");
                SessionError::Invalid
            })
    }

    /// `HttpOnly`, `SameSite=Lax`, `Path=/`, `Secure` in production
    pub fn cookie(&self, token: String, secure: bool) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::seconds(self.ttl.num_seconds()))
            .build()
    }
}

/// Cookie value used to clear the session on logout
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Session token from the cookie, falling back to `Authorization: Bearer`
pub fn token_from_request(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}
