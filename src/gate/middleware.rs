//! Access gate middleware, run in front of every route

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, warn};

use super::policy::{
    classify, decide, is_api_path, AccessState, GateDecision, LOGIN_PATH, PAYMENT_PATH,
};
use crate::auth::session::{removal_cookie, token_from_request};
use crate::common::{ApiError, AppState};

pub async fn access_gate(
    Extension(state): Extension<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let token = token_from_request(&jar, request.headers());
    let claims = token
        .as_deref()
        .and_then(|t| state.sessions.validate(t).ok());
    let stale_cookie = token.is_some() && claims.is_none();

    let access = AccessState::from_claims(claims.as_ref());
    let route = classify(&path);

    match decide(access, route) {
        GateDecision::Allow => {
            debug!(path = %path, access = ?access, route = ?route, "Access gate allowed request");
            if let Some(claims) = claims {
                request.extensions_mut().insert(claims);
            }
            next.run(request).await
        }
        GateDecision::RedirectToLogin => {
            warn!(path = %path, stale_cookie = stale_cookie, "Access gate: session required");
            let jar = if stale_cookie {
                jar.remove(removal_cookie())
            } else {
                jar
            };
            if is_api_path(&path) {
                (jar, ApiError::Unauthorized("Authentication required".to_string())).into_response()
            } else {
                (jar, Redirect::temporary(LOGIN_PATH)).into_response()
            }
        }
        GateDecision::RedirectToPayment => {
            warn!(
                path = %path,
                user_id = ?claims.as_ref().map(|c| c.user_id),
                "Access gate: payment required"
            );
            if is_api_path(&path) {
                ApiError::PaymentRequired("Payment required".to_string()).into_response()
            } else {
                Redirect::temporary(PAYMENT_PATH).into_response()
            }
        }
    }
}
