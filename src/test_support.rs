//! Shared fixtures for in-process tests: in-memory database, fake payment
//! provider, seeded users and request builders.

use async_trait::async_trait;
use axum::{body::Body, http::Request};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::auth::models::{NewUser, Role, User};
use crate::auth::store::UserStore;
use crate::common::migrations::migrate;
use crate::common::{AppConfig, AppState};
use crate::payments::gateway::GatewayError;
use crate::payments::PaymentGateway;
use crate::payments::models::{
    InitializeRequest, InitializedTransaction, TransactionStatus, VerifiedTransaction,
};

/// Single-connection in-memory database with the schema applied
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite pool");
    migrate(&pool, false).await.expect("schema migration");
    pool
}

pub fn test_state(pool: SqlitePool, gateway: Arc<FakeGateway>) -> Arc<AppState> {
    Arc::new(AppState::new(pool, AppConfig::for_tests(), gateway))
}

/// Insert a user without paying for a real password hash
pub async fn insert_user(pool: &SqlitePool, email: &str, role: Role) -> User {
    UserStore::new(pool.clone())
        .create_user(NewUser {
            email: email.to_string(),
            password_hash: "unusable".to_string(),
            role,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            language_preference: "en".to_string(),
        })
        .await
        .expect("create user")
}

pub async fn insert_paid_user(pool: &SqlitePool, email: &str, role: Role) -> User {
    let user = insert_user(pool, email, role).await;
    let store = UserStore::new(pool.clone());
    store
        .update_payment_status(user.id, &format!("seed_{}", user.id))
        .await
        .expect("mark paid");
    store
        .get_user_by_id(user.id)
        .await
        .expect("reload")
        .expect("user exists")
}

pub fn session_cookie(state: &AppState, user: &User) -> String {
    format!("session={}", state.sessions.issue(user).expect("issue session"))
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).expect("request")
}

pub fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `name=value` of the session cookie set by a response, if any
pub fn set_session_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("session="))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
}

// ============================================================================
// Fake payment provider
// ============================================================================

#[derive(Debug, Clone)]
pub enum FakeVerification {
    Transaction {
        status: TransactionStatus,
        user_id: Option<i64>,
        reported_reference: Option<String>,
    },
    Rejected,
    Unavailable,
}

pub struct FakeGateway {
    configured: bool,
    verifications: HashMap<String, FakeVerification>,
    pub verify_calls: AtomicUsize,
    pub initialized: Mutex<Vec<InitializeRequest>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            configured: true,
            verifications: HashMap::new(),
            verify_calls: AtomicUsize::new(0),
            initialized: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn with_transaction(
        mut self,
        reference: &str,
        status: TransactionStatus,
        user_id: Option<i64>,
    ) -> Self {
        self.verifications.insert(
            reference.to_string(),
            FakeVerification::Transaction {
                status,
                user_id,
                reported_reference: None,
            },
        );
        self
    }

    pub fn with_verification(mut self, reference: &str, verification: FakeVerification) -> Self {
        self.verifications.insert(reference.to_string(), verification);
        self
    }

    pub fn verify_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initialize(
        &self,
        request: &InitializeRequest,
    ) -> Result<InitializedTransaction, GatewayError> {
        if !self.configured {
            return Err(GatewayError::NotConfigured);
        }
        self.initialized
            .lock()
            .expect("initialize log")
            .push(request.clone());
        Ok(InitializedTransaction {
            authorization_url: format!("https://checkout.example/{}", request.reference),
            reference: request.reference.clone(),
            access_code: None,
        })
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if !self.configured {
            return Err(GatewayError::NotConfigured);
        }
        match self.verifications.get(reference) {
            Some(FakeVerification::Transaction {
                status,
                user_id,
                reported_reference,
            }) => Ok(VerifiedTransaction {
                reference: reported_reference
                    .clone()
                    .unwrap_or_else(|| reference.to_string()),
                status: *status,
                amount: Some(100_000),
                currency: Some("KES".to_string()),
                user_id: *user_id,
            }),
            Some(FakeVerification::Unavailable) => {
                Err(GatewayError::Unavailable("connection refused".to_string()))
            }
            Some(FakeVerification::Rejected) | None => {
                Err(GatewayError::Rejected("Transaction reference not found".to_string()))
            }
        }
    }
}
