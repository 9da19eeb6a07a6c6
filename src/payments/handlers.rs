//! Payment handlers

use axum::{
    extract::{Extension, Json, Query},
    response::Redirect,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::gateway::GatewayError;
use super::models::{generate_reference, InitializeRequest, InitializeResponse, VerifyQuery};
use super::reconciler::PaymentReconciler;
use crate::auth::handlers::start_session;
use crate::auth::{AuthedUser, UserStore};
use crate::common::helpers::now_millis;
use crate::common::{safe_token_log, ApiError, AppState};

pub const SUCCESS_REDIRECT: &str = "/dashboard?payment=success";

pub fn failure_redirect(code: &str) -> String {
    format!("/payment?error={}", code)
}

/// POST /api/payment/initialize
/// Starts a provider transaction for the signed-in, unpaid user
///
/// # Response
/// ```json
/// { "authorization_url": "https://checkout.paystack.com/...", "reference": "learn_anywhere_7_1700000000000" }
/// ```
pub async fn initialize_payment(
    Extension(state): Extension<Arc<AppState>>,
    authed: AuthedUser,
) -> Result<Json<InitializeResponse>, ApiError> {
    let store = UserStore::new(state.db.clone());
    let user = store
        .get_user_by_id(authed.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    // Live check: the session claim may predate the payment
    if user.has_paid {
        return Err(ApiError::BadRequest("Payment already completed".to_string()));
    }

    let payment = &state.config.payment;
    let request = InitializeRequest {
        email: user.email.clone(),
        amount: payment.amount,
        currency: payment.currency.clone(),
        reference: generate_reference(&payment.reference_prefix, user.id, now_millis()),
        callback_url: format!("{}/api/payment/verify", state.config.app_url),
        metadata: json!({
            "user_id": user.id,
            "user_email": user.email,
            "product": "Learn-Anywhere Access",
        }),
    };

    let transaction = state.gateway.initialize(&request).await.map_err(|e| match e {
        GatewayError::NotConfigured => {
            error!("Payment initialization attempted without PAYSTACK_SECRET_KEY");
            ApiError::ServiceUnavailable("Payment system not configured".to_string())
        }
        other => {
            error!(error = %other, user_id = user.id, "Payment initialization failed");
            ApiError::InternalServer("Payment initialization failed".to_string())
        }
    })?;

    info!(
        user_id = user.id,
        reference = %safe_token_log(&transaction.reference),
        "Payment initialized"
    );

    Ok(Json(InitializeResponse {
        authorization_url: transaction.authorization_url,
        reference: transaction.reference,
    }))
}

/// GET /api/payment/verify?reference=...
/// Provider callback; always answers with a browser redirect
pub async fn verify_payment(
    Extension(state): Extension<Arc<AppState>>,
    session: Option<AuthedUser>,
    jar: CookieJar,
    Query(query): Query<VerifyQuery>,
) -> (CookieJar, Redirect) {
    let reference = match query.reference() {
        Some(r) => r.to_string(),
        None => {
            warn!("Payment callback without reference");
            return (jar, Redirect::temporary(&failure_redirect("missing_reference")));
        }
    };

    let reconciler = PaymentReconciler::new(
        state.gateway.clone(),
        UserStore::new(state.db.clone()),
        &state.config.payment.reference_prefix,
    );

    let outcome = match reconciler.reconcile(&reference).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(
                reference = %safe_token_log(&reference),
                error = %e,
                code = e.redirect_code(),
                "Payment verification did not grant access"
            );
            return (jar, Redirect::temporary(&failure_redirect(e.redirect_code())));
        }
    };

    // Refresh the payer's cached claim so the gate lets them straight in
    let jar = match session {
        Some(authed) if authed.id == outcome.user_id() && !authed.has_paid => {
            match refresh_session(&state, jar.clone(), authed.id).await {
                Ok(refreshed) => refreshed,
                Err(e) => {
                    warn!(error = %e, user_id = authed.id, "Could not refresh session after payment");
                    jar
                }
            }
        }
        _ => jar,
    };

    (jar, Redirect::temporary(SUCCESS_REDIRECT))
}

async fn refresh_session(state: &AppState, jar: CookieJar, user_id: i64) -> Result<CookieJar, ApiError> {
    let user = UserStore::new(state.db.clone())
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    start_session(state, jar, &user)
}
