// src/payments/gateway.rs
//! Payment provider client (Paystack)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::models::{
    user_id_from_metadata, InitializeRequest, InitializedTransaction, TransactionStatus,
    VerifiedTransaction,
};
use crate::common::{safe_token_log, PaymentConfig};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("payment provider not configured")]
    NotConfigured,

    /// The provider answered and refused (unknown reference, bad request)
    #[error("provider rejected request: {0}")]
    Rejected(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(
        &self,
        request: &InitializeRequest,
    ) -> Result<InitializedTransaction, GatewayError>;

    /// Fetch the provider's authoritative record for `reference`
    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError>;
}

pub struct PaystackClient {
    http: Client,
    base_url: String,
    secret_key: Option<String>,
}

impl PaystackClient {
    pub fn new(config: &PaymentConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn secret(&self) -> Result<&str, GatewayError> {
        self.secret_key.as_deref().ok_or(GatewayError::NotConfigured)
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(
        &self,
        request: &InitializeRequest,
    ) -> Result<InitializedTransaction, GatewayError> {
        let secret = self.secret()?;
        let url = format!("{}/transaction/initialize", self.base_url);

        debug!(
            reference = %safe_token_log(&request.reference),
            amount = request.amount,
            currency = %request.currency,
            "Initializing provider transaction"
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(secret)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = %url, "HTTP error contacting payment provider");
                GatewayError::Unavailable(e.to_string())
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let transaction = parse_initialize_response(status, &body)?;
        info!(
            reference = %safe_token_log(&transaction.reference),
            "Provider transaction initialized"
        );
        Ok(transaction)
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError> {
        let secret = self.secret()?;
        let url = format!(
            "{}/transaction/verify/{}",
            self.base_url,
            urlencoding::encode(reference)
        );

        let resp = self
            .http
            .get(&url)
            .bearer_auth(secret)
            .send()
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    reference = %safe_token_log(reference),
                    "HTTP error verifying transaction with payment provider"
                );
                GatewayError::Unavailable(e.to_string())
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        parse_verify_response(status, &body)
    }
}

/// Splits the `{status, message, data}` envelope, classifying failures
fn unwrap_envelope(status: StatusCode, body: &str) -> Result<Value, GatewayError> {
    if status.is_server_error() {
        warn!(http_status = %status, "Payment provider returned server error");
        return Err(GatewayError::Unavailable(format!("provider returned {}", status)));
    }

    let json: Value = serde_json::from_str(body).map_err(|e| {
        GatewayError::InvalidResponse(format!("body is not JSON ({}): {}", status, e))
    })?;

    let message = json
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("no message")
        .to_string();
    let ok = json.get("status").and_then(Value::as_bool).unwrap_or(false);

    if !status.is_success() || !ok {
        warn!(http_status = %status, message = %message, "Payment provider rejected request");
        return Err(GatewayError::Rejected(message));
    }

    match json.get("data") {
        Some(data) if data.is_object() => Ok(data.clone()),
        _ => Err(GatewayError::InvalidResponse("missing data object".to_string())),
    }
}

pub fn parse_initialize_response(
    status: StatusCode,
    body: &str,
) -> Result<InitializedTransaction, GatewayError> {
    let data = unwrap_envelope(status, body)?;
    serde_json::from_value(data).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

pub fn parse_verify_response(
    status: StatusCode,
    body: &str,
) -> Result<VerifiedTransaction, GatewayError> {
    let data = unwrap_envelope(status, body)?;

    let reference = data
        .get("reference")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidResponse("missing reference".to_string()))?
        .to_string();

    let status = data
        .get("status")
        .cloned()
        .map(serde_json::from_value::<TransactionStatus>)
        .transpose()
        .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?
        .unwrap_or(TransactionStatus::Other);

    Ok(VerifiedTransaction {
        reference,
        status,
        amount: data.get("amount").and_then(Value::as_u64),
        currency: data
            .get("currency")
            .and_then(Value::as_str)
            .map(str::to_string),
        user_id: data.get("metadata").and_then(user_id_from_metadata),
    })
}
