//! Payment provider data models and reference helpers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider-side transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
    Failed,
    Pending,
    #[serde(other)]
    Other,
}

/// Authoritative transaction state fetched from the provider
#[derive(Debug, Clone)]
pub struct VerifiedTransaction {
    pub reference: String,
    pub status: TransactionStatus,
    pub amount: Option<u64>,
    pub currency: Option<String>,
    /// Owning user from the metadata attached at initialization
    pub user_id: Option<i64>,
}

/// Outbound transaction initialization
#[derive(Debug, Clone, Serialize)]
pub struct InitializeRequest {
    pub email: String,
    pub amount: u64,
    pub currency: String,
    pub reference: String,
    pub callback_url: String,
    pub metadata: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializedTransaction {
    pub authorization_url: String,
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
}

/// Response body of POST /api/payment/initialize
#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub authorization_url: String,
    pub reference: String,
}

/// Query string of the provider callback
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub reference: Option<String>,
    /// Paystack sends both `reference` and `trxref`
    pub trxref: Option<String>,
}

impl VerifyQuery {
    pub fn reference(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .or(self.trxref.as_deref())
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

const MAX_REFERENCE_LEN: usize = 100;

/// `{prefix}_{user_id}_{millis}`
pub fn generate_reference(prefix: &str, user_id: i64, millis: i64) -> String {
    format!("{}_{}_{}", prefix, user_id, millis)
}

/// Characters the provider accepts in a reference, bounded length
pub fn is_well_formed_reference(reference: &str) -> bool {
    !reference.is_empty()
        && reference.len() <= MAX_REFERENCE_LEN
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '='))
}

/// User id embedded in a reference minted by `generate_reference`.
///
/// References from elsewhere (not carrying the prefix) yield `None`.
pub fn user_id_in_reference(prefix: &str, reference: &str) -> Option<i64> {
    let rest = reference.strip_prefix(prefix)?.strip_prefix('_')?;
    let (user_id, millis) = rest.split_once('_')?;
    if millis.is_empty() || !millis.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    user_id.parse().ok()
}

/// Reads `user_id` out of provider metadata.
///
/// Metadata may arrive as an object, as a JSON-encoded string, with the id
/// as a number or a numeric string.
pub fn user_id_from_metadata(metadata: &Value) -> Option<i64> {
    match metadata {
        Value::Object(map) => match map.get("user_id")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        },
        Value::String(s) if !s.trim().is_empty() => {
            let inner: Value = serde_json::from_str(s).ok()?;
            match inner {
                Value::Object(_) => user_id_from_metadata(&inner),
                _ => None,
            }
        }
        _ => None,
    }
}
