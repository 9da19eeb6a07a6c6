// src/common/config.rs
//! Environment-driven configuration loaded once at startup

use std::env;
use tracing::warn;

const DEV_JWT_SECRET: &str = "learn-anywhere-dev-secret";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub production: bool,
    pub app_url: String,
    pub cors_origins: Vec<String>,
    pub payment: PaymentConfig,
}

/// Settings for the hosted payment provider
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// `None` means payments are not configured; callbacks report `config_error`
    pub secret_key: Option<String>,
    pub base_url: String,
    pub amount: u64,
    pub currency: String,
    pub reference_prefix: String,
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let production = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
            == "production";

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set, falling back to the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://learn_anywhere.db".to_string()),
            port: parse_or("PORT", 8080),
            jwt_secret,
            session_ttl_hours: bounded_session_ttl(parse_or("SESSION_TTL_HOURS", 24)),
            production,
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            cors_origins,
            payment: PaymentConfig::from_env(),
        }
    }

    /// Production deployments must not run on the built-in secret
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl PaymentConfig {
    pub fn from_env() -> Self {
        Self {
            secret_key: env::var("PAYSTACK_SECRET_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            base_url: env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string())
                .trim_end_matches('/')
                .to_string(),
            amount: parse_or("PAYMENT_AMOUNT", 100_000),
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "KES".to_string()),
            reference_prefix: env::var("PAYMENT_REFERENCE_PREFIX")
                .unwrap_or_else(|_| "learn_anywhere".to_string()),
            timeout_secs: parse_or("PAYMENT_TIMEOUT_SECS", 15),
        }
    }
}

const MIN_SESSION_TTL_HOURS: i64 = 1;
const MAX_SESSION_TTL_HOURS: i64 = 720;

/// Session lifetime limited to between one hour and thirty days
pub fn bounded_session_ttl(hours: i64) -> i64 {
    let bounded = hours.clamp(MIN_SESSION_TTL_HOURS, MAX_SESSION_TTL_HOURS);
    if bounded != hours {
        warn!(hours = hours, using = bounded, "SESSION_TTL_HOURS out of range, clamping");
    }
    bounded
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(key = key, value = %raw, "Ignoring unparseable environment value");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
impl AppConfig {
    /// Deterministic configuration for in-process tests
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            jwt_secret: "test_secret_key".to_string(),
            session_ttl_hours: 24,
            production: false,
            app_url: "http://localhost:8080".to_string(),
            cors_origins: Vec::new(),
            payment: PaymentConfig {
                secret_key: Some("sk_test_secret".to_string()),
                base_url: "http://127.0.0.1:9".to_string(),
                amount: 100_000,
                currency: "KES".to_string(),
                reference_prefix: "learn_anywhere".to_string(),
                timeout_secs: 1,
            },
        }
    }
}
