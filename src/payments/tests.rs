//! Tests for payments module
//!
//! - Reference helpers and metadata parsing
//! - Provider response parsing
//! - Reconciliation outcomes, including duplicate and hostile callbacks
//! - Initialize and verify endpoints

#[cfg(test)]
mod tests {
    use super::super::gateway::{parse_initialize_response, parse_verify_response, GatewayError};
    use super::super::handlers::{failure_redirect, SUCCESS_REDIRECT};
    use super::super::models::*;
    use super::super::*;
    use crate::app::build_router;
    use crate::auth::models::Role;
    use crate::auth::UserStore;
    use crate::test_support::*;
    use axum::http::StatusCode;
    use reqwest::StatusCode as ProviderStatus;
    use serde_json::json;
    use sqlx::SqlitePool;
    use std::sync::Arc;
    use tower::ServiceExt;

    const PREFIX: &str = "learn_anywhere";

    fn reconciler(pool: &SqlitePool, gateway: FakeGateway) -> PaymentReconciler {
        PaymentReconciler::new(Arc::new(gateway), UserStore::new(pool.clone()), PREFIX)
    }

    async fn paid_state(pool: &SqlitePool, user_id: i64) -> (bool, Option<String>) {
        let user = UserStore::new(pool.clone())
            .get_user_by_id(user_id)
            .await
            .expect("lookup")
            .expect("user exists");
        (user.has_paid, user.payment_reference)
    }

    // ========================================================================
    // Reference helpers
    // ========================================================================

    #[test]
    fn test_generated_reference_embeds_user() {
        let reference = generate_reference(PREFIX, 7, 1_700_000_000_000);

        assert_eq!(reference, "learn_anywhere_7_1700000000000");
        assert!(is_well_formed_reference(&reference));
        assert_eq!(user_id_in_reference(PREFIX, &reference), Some(7));
    }

    #[test]
    fn test_foreign_references_carry_no_user() {
        assert_eq!(user_id_in_reference(PREFIX, "tx_1"), None);
        assert_eq!(user_id_in_reference(PREFIX, "learn_anywhere_7"), None);
        assert_eq!(user_id_in_reference(PREFIX, "learn_anywhere_x_123"), None);
        assert_eq!(user_id_in_reference(PREFIX, "learn_anywhere_7_12a"), None);
    }

    #[test]
    fn test_reference_shape() {
        assert!(is_well_formed_reference("tx_1"));
        assert!(is_well_formed_reference("T-1.a=b"));
        assert!(!is_well_formed_reference(""));
        assert!(!is_well_formed_reference("tx 1"));
        assert!(!is_well_formed_reference("tx/1"));
        assert!(!is_well_formed_reference("tx_1&status=success"));
        assert!(!is_well_formed_reference(&"a".repeat(101)));
    }

    #[test]
    fn test_user_id_from_metadata_shapes() {
        assert_eq!(user_id_from_metadata(&json!({ "user_id": 7 })), Some(7));
        assert_eq!(user_id_from_metadata(&json!({ "user_id": "7" })), Some(7));
        assert_eq!(user_id_from_metadata(&json!("{\"user_id\":7}")), Some(7));
        assert_eq!(user_id_from_metadata(&json!({ "user_id": "seven" })), None);
        assert_eq!(user_id_from_metadata(&json!({})), None);
        assert_eq!(user_id_from_metadata(&json!("")), None);
        assert_eq!(user_id_from_metadata(&json!(null)), None);
    }

    #[test]
    fn test_verify_query_accepts_trxref() {
        let query = VerifyQuery {
            reference: None,
            trxref: Some(" tx_1 ".to_string()),
        };
        assert_eq!(query.reference(), Some("tx_1"));

        let empty = VerifyQuery {
            reference: Some("".to_string()),
            trxref: None,
        };
        assert_eq!(empty.reference(), None);
    }

    // ========================================================================
    // Provider responses
    // ========================================================================

    #[test]
    fn test_parse_successful_verification() {
        let body = json!({
            "status": true,
            "message": "Verification successful",
            "data": {
                "reference": "tx_1",
                "status": "success",
                "amount": 100000,
                "currency": "KES",
                "metadata": { "user_id": 7 }
            }
        })
        .to_string();

        let tx = parse_verify_response(ProviderStatus::OK, &body).expect("parse");
        assert_eq!(tx.reference, "tx_1");
        assert_eq!(tx.status, TransactionStatus::Success);
        assert_eq!(tx.amount, Some(100_000));
        assert_eq!(tx.currency.as_deref(), Some("KES"));
        assert_eq!(tx.user_id, Some(7));
    }

    #[test]
    fn test_parse_unusual_transaction_status() {
        let body = json!({
            "status": true,
            "message": "ok",
            "data": { "reference": "tx_1", "status": "abandoned", "metadata": "" }
        })
        .to_string();

        let tx = parse_verify_response(ProviderStatus::OK, &body).expect("parse");
        assert_eq!(tx.status, TransactionStatus::Other);
        assert_eq!(tx.user_id, None);
    }

    #[test]
    fn test_parse_provider_refusals() {
        let not_found = json!({ "status": false, "message": "Transaction reference not found" })
            .to_string();
        assert!(matches!(
            parse_verify_response(ProviderStatus::BAD_REQUEST, &not_found),
            Err(GatewayError::Rejected(m)) if m == "Transaction reference not found"
        ));

        let status_false = json!({ "status": false, "message": "nope", "data": {} }).to_string();
        assert!(matches!(
            parse_verify_response(ProviderStatus::OK, &status_false),
            Err(GatewayError::Rejected(_))
        ));
    }

    #[test]
    fn test_parse_server_failures_and_garbage() {
        assert!(matches!(
            parse_verify_response(ProviderStatus::BAD_GATEWAY, "<html>bad gateway</html>"),
            Err(GatewayError::Unavailable(_))
        ));
        assert!(matches!(
            parse_verify_response(ProviderStatus::OK, "not json"),
            Err(GatewayError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_verify_response(ProviderStatus::OK, r#"{"status":true,"message":"ok"}"#),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_initialize_response() {
        let body = json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": "https://checkout.paystack.com/abc",
                "access_code": "abc",
                "reference": "learn_anywhere_7_1"
            }
        })
        .to_string();

        let tx = parse_initialize_response(ProviderStatus::OK, &body).expect("parse");
        assert_eq!(tx.authorization_url, "https://checkout.paystack.com/abc");
        assert_eq!(tx.reference, "learn_anywhere_7_1");
        assert_eq!(tx.access_code.as_deref(), Some("abc"));
    }

    // ========================================================================
    // Reconciler
    // ========================================================================

    #[tokio::test]
    async fn test_successful_payment_is_applied_once() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway =
            FakeGateway::new().with_transaction("tx_1", TransactionStatus::Success, Some(user.id));
        let reconciler = reconciler(&pool, gateway);

        let first = reconciler.reconcile("tx_1").await.expect("first callback");
        assert_eq!(first, ReconcileOutcome::Applied { user_id: user.id });
        assert_eq!(paid_state(&pool, user.id).await, (true, Some("tx_1".to_string())));

        let second = reconciler.reconcile("tx_1").await.expect("duplicate callback");
        assert_eq!(second, ReconcileOutcome::AlreadyApplied { user_id: user.id });
        assert_eq!(paid_state(&pool, user.id).await, (true, Some("tx_1".to_string())));
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_user_unpaid() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway =
            FakeGateway::new().with_transaction("tx_bad", TransactionStatus::Failed, Some(user.id));

        let err = reconciler(&pool, gateway)
            .reconcile("tx_bad")
            .await
            .expect_err("failed transaction");

        assert!(matches!(err, ReconcileError::VerificationFailed));
        assert_eq!(err.redirect_code(), "verification_failed");
        assert_eq!(paid_state(&pool, user.id).await, (false, None));
    }

    #[tokio::test]
    async fn test_pending_transaction_is_not_success() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway =
            FakeGateway::new().with_transaction("tx_p", TransactionStatus::Pending, Some(user.id));

        let err = reconciler(&pool, gateway).reconcile("tx_p").await.expect_err("pending");
        assert!(matches!(err, ReconcileError::VerificationFailed));
    }

    #[tokio::test]
    async fn test_unknown_reference_fails_verification() {
        let pool = test_pool().await;
        let gateway = FakeGateway::new();

        let err = reconciler(&pool, gateway)
            .reconcile("tx_missing")
            .await
            .expect_err("unknown reference");
        assert!(matches!(err, ReconcileError::VerificationFailed));
    }

    #[tokio::test]
    async fn test_provider_refusal_fails_verification() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway = FakeGateway::new().with_verification("tx_1", FakeVerification::Rejected);

        let err = reconciler(&pool, gateway).reconcile("tx_1").await.expect_err("refused");

        assert!(matches!(err, ReconcileError::VerificationFailed));
        assert_eq!(err.redirect_code(), "verification_failed");
        assert_eq!(paid_state(&pool, user.id).await, (false, None));
    }

    #[tokio::test]
    async fn test_metadata_for_missing_user() {
        let pool = test_pool().await;
        let gateway = FakeGateway::new().with_transaction("tx_1", TransactionStatus::Success, Some(404));

        let err = reconciler(&pool, gateway).reconcile("tx_1").await.expect_err("no such user");
        assert!(matches!(err, ReconcileError::UnknownUser));
        assert_eq!(err.redirect_code(), "unknown_user");
    }

    #[tokio::test]
    async fn test_metadata_without_user() {
        let pool = test_pool().await;
        let gateway = FakeGateway::new().with_transaction("tx_1", TransactionStatus::Success, None);

        let err = reconciler(&pool, gateway).reconcile("tx_1").await.expect_err("no metadata");
        assert!(matches!(err, ReconcileError::UnknownUser));
    }

    #[tokio::test]
    async fn test_reference_owned_by_another_user() {
        let pool = test_pool().await;
        let owner = insert_user(&pool, "a@x.com", Role::Student).await;
        let other = insert_user(&pool, "b@x.com", Role::Student).await;
        UserStore::new(pool.clone())
            .update_payment_status(owner.id, "tx_1")
            .await
            .expect("owner paid");

        let gateway =
            FakeGateway::new().with_transaction("tx_1", TransactionStatus::Success, Some(other.id));
        let err = reconciler(&pool, gateway).reconcile("tx_1").await.expect_err("stolen reference");

        assert!(matches!(err, ReconcileError::InvalidReference));
        assert_eq!(paid_state(&pool, other.id).await, (false, None));
        assert_eq!(paid_state(&pool, owner.id).await, (true, Some("tx_1".to_string())));
    }

    #[tokio::test]
    async fn test_malformed_reference_skips_provider() {
        let pool = test_pool().await;
        let gateway = Arc::new(FakeGateway::new());
        let reconciler =
            PaymentReconciler::new(gateway.clone(), UserStore::new(pool.clone()), PREFIX);

        let err = reconciler
            .reconcile("tx_1?status=success")
            .await
            .expect_err("malformed");

        assert!(matches!(err, ReconcileError::InvalidReference));
        assert_eq!(err.redirect_code(), "invalid_reference");
        assert_eq!(gateway.verify_count(), 0);
    }

    #[tokio::test]
    async fn test_reference_prefix_must_match_metadata_user() {
        let pool = test_pool().await;
        let payer = insert_user(&pool, "a@x.com", Role::Student).await;
        let victim = insert_user(&pool, "b@x.com", Role::Student).await;
        let reference = generate_reference(PREFIX, payer.id, 1_700_000_000_000);
        let gateway = FakeGateway::new().with_transaction(
            &reference,
            TransactionStatus::Success,
            Some(victim.id),
        );

        let err = reconciler(&pool, gateway)
            .reconcile(&reference)
            .await
            .expect_err("mismatched user");

        assert!(matches!(err, ReconcileError::InvalidReference));
        assert_eq!(paid_state(&pool, victim.id).await, (false, None));
        assert_eq!(paid_state(&pool, payer.id).await, (false, None));
    }

    #[tokio::test]
    async fn test_provider_reporting_other_reference() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway = FakeGateway::new().with_verification(
            "tx_1",
            FakeVerification::Transaction {
                status: TransactionStatus::Success,
                user_id: Some(user.id),
                reported_reference: Some("tx_2".to_string()),
            },
        );

        let err = reconciler(&pool, gateway).reconcile("tx_1").await.expect_err("mismatch");
        assert!(matches!(err, ReconcileError::InvalidReference));
        assert_eq!(paid_state(&pool, user.id).await, (false, None));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_reports_config_error() {
        let pool = test_pool().await;

        let err = reconciler(&pool, FakeGateway::unconfigured())
            .reconcile("tx_1")
            .await
            .expect_err("not configured");

        assert!(matches!(
            err,
            ReconcileError::ProviderUnavailable(GatewayError::NotConfigured)
        ));
        assert_eq!(err.redirect_code(), "config_error");
    }

    #[tokio::test]
    async fn test_provider_outage_is_server_error() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway = FakeGateway::new().with_verification("tx_1", FakeVerification::Unavailable);

        let err = reconciler(&pool, gateway).reconcile("tx_1").await.expect_err("outage");
        assert_eq!(err.redirect_code(), "server_error");
        assert_eq!(paid_state(&pool, user.id).await, (false, None));
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_callbacks_apply_once() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway = Arc::new(
            FakeGateway::new().with_transaction("tx_1", TransactionStatus::Success, Some(user.id)),
        );

        let a = PaymentReconciler::new(gateway.clone(), UserStore::new(pool.clone()), PREFIX);
        let b = PaymentReconciler::new(gateway.clone(), UserStore::new(pool.clone()), PREFIX);
        let (first, second) = tokio::join!(a.reconcile("tx_1"), b.reconcile("tx_1"));

        let outcomes = [first.expect("first"), second.expect("second")];
        let applied = outcomes
            .iter()
            .filter(|o| matches!(o, ReconcileOutcome::Applied { .. }))
            .count();
        assert_eq!(applied, 1);
        assert_eq!(paid_state(&pool, user.id).await, (true, Some("tx_1".to_string())));
    }

    // ========================================================================
    // Endpoints
    // ========================================================================

    #[tokio::test]
    async fn test_verify_without_reference_redirects_with_error() {
        let app = build_router(test_state(test_pool().await, Arc::new(FakeGateway::new())));

        let response = app
            .oneshot(get("/api/payment/verify", None))
            .await
            .expect("verify");

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), failure_redirect("missing_reference"));
    }

    #[tokio::test]
    async fn test_verify_callback_grants_access_and_refreshes_session() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway = Arc::new(
            FakeGateway::new().with_transaction("tx_1", TransactionStatus::Success, Some(user.id)),
        );
        let state = test_state(pool.clone(), gateway);
        let app = build_router(state.clone());
        let stale = session_cookie(&state, &user);

        let response = app
            .clone()
            .oneshot(get("/api/payment/verify?reference=tx_1&trxref=tx_1", Some(&stale)))
            .await
            .expect("verify");

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), SUCCESS_REDIRECT);
        assert_eq!(paid_state(&pool, user.id).await, (true, Some("tx_1".to_string())));

        let fresh = set_session_cookie(&response).expect("refreshed cookie");
        let claims = state
            .sessions
            .validate(fresh.trim_start_matches("session="))
            .expect("valid session");
        assert!(claims.has_paid);

        let dashboard = app
            .oneshot(get("/dashboard", Some(&fresh)))
            .await
            .expect("dashboard");
        assert_eq!(dashboard.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_verify_callback_without_session_still_reconciles() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway = Arc::new(
            FakeGateway::new().with_transaction("tx_1", TransactionStatus::Success, Some(user.id)),
        );
        let app = build_router(test_state(pool.clone(), gateway));

        let response = app
            .oneshot(get("/api/payment/verify?reference=tx_1", None))
            .await
            .expect("verify");

        assert_eq!(location(&response), SUCCESS_REDIRECT);
        assert!(set_session_cookie(&response).is_none());
        assert_eq!(paid_state(&pool, user.id).await, (true, Some("tx_1".to_string())));
    }

    #[tokio::test]
    async fn test_duplicate_verify_callback_still_redirects_to_success() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway = Arc::new(
            FakeGateway::new().with_transaction("tx_1", TransactionStatus::Success, Some(user.id)),
        );
        let app = build_router(test_state(pool.clone(), gateway.clone()));

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(get("/api/payment/verify?reference=tx_1", None))
                .await
                .expect("verify");

            assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
            assert_eq!(location(&response), SUCCESS_REDIRECT);
        }

        assert_eq!(gateway.verify_count(), 2);
        assert_eq!(paid_state(&pool, user.id).await, (true, Some("tx_1".to_string())));
    }

    #[tokio::test]
    async fn test_verify_callback_for_failed_payment() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway = Arc::new(
            FakeGateway::new().with_transaction("tx_bad", TransactionStatus::Failed, Some(user.id)),
        );
        let app = build_router(test_state(pool.clone(), gateway));

        let response = app
            .oneshot(get("/api/payment/verify?reference=tx_bad", None))
            .await
            .expect("verify");

        assert_eq!(location(&response), "/payment?error=verification_failed");
        assert_eq!(paid_state(&pool, user.id).await, (false, None));
    }

    #[tokio::test]
    async fn test_initialize_uses_prefixed_reference_and_metadata() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let gateway = Arc::new(FakeGateway::new());
        let state = test_state(pool, gateway.clone());
        let cookie = session_cookie(&state, &user);

        let response = build_router(state)
            .oneshot(post_json("/api/payment/initialize", Some(&cookie), json!({})))
            .await
            .expect("initialize");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let reference = body["reference"].as_str().expect("reference").to_string();
        assert_eq!(user_id_in_reference(PREFIX, &reference), Some(user.id));
        assert_eq!(
            body["authorization_url"],
            format!("https://checkout.example/{}", reference)
        );

        let sent = gateway.initialized.lock().expect("log");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].email, "a@x.com");
        assert_eq!(sent[0].amount, 100_000);
        assert_eq!(sent[0].currency, "KES");
        assert_eq!(sent[0].metadata["user_id"], user.id);
        assert_eq!(
            sent[0].callback_url,
            "http://localhost:8080/api/payment/verify"
        );
    }

    #[tokio::test]
    async fn test_initialize_refuses_paid_user() {
        let pool = test_pool().await;
        let user = insert_paid_user(&pool, "a@x.com", Role::Student).await;
        let state = test_state(pool, Arc::new(FakeGateway::new()));
        let cookie = session_cookie(&state, &user);

        let response = build_router(state)
            .oneshot(post_json("/api/payment/initialize", Some(&cookie), json!({})))
            .await
            .expect("initialize");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_initialize_without_provider_key() {
        let pool = test_pool().await;
        let user = insert_user(&pool, "a@x.com", Role::Student).await;
        let state = test_state(pool, Arc::new(FakeGateway::unconfigured()));
        let cookie = session_cookie(&state, &user);

        let response = build_router(state)
            .oneshot(post_json("/api/payment/initialize", Some(&cookie), json!({})))
            .await
            .expect("initialize");

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_initialize_requires_session() {
        let app = build_router(test_state(test_pool().await, Arc::new(FakeGateway::new())));

        let response = app
            .oneshot(post_json("/api/payment/initialize", None, json!({})))
            .await
            .expect("initialize");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
