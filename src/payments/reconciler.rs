//! Payment reconciliation: provider verification → user paid status

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::gateway::{GatewayError, PaymentGateway};
use super::models::{is_well_formed_reference, user_id_in_reference, TransactionStatus};
use crate::auth::store::{PaymentUpdate, StoreError, UserStore};
use crate::common::safe_token_log;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Malformed, foreign, or already claimed by another account
    #[error("invalid payment reference")]
    InvalidReference,

    /// The provider says the transaction did not succeed
    #[error("payment verification failed")]
    VerificationFailed,

    #[error("payment metadata names an unknown user")]
    UnknownUser,

    #[error("payment provider unavailable: {0}")]
    ProviderUnavailable(#[source] GatewayError),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl ReconcileError {
    /// Value of the `error` query parameter on the failure redirect
    pub fn redirect_code(&self) -> &'static str {
        match self {
            ReconcileError::InvalidReference => "invalid_reference",
            ReconcileError::VerificationFailed => "verification_failed",
            ReconcileError::UnknownUser => "unknown_user",
            ReconcileError::ProviderUnavailable(GatewayError::NotConfigured) => "config_error",
            ReconcileError::ProviderUnavailable(_) | ReconcileError::Database(_) => "server_error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// `has_paid` flipped on this call
    Applied { user_id: i64 },
    /// Duplicate delivery of an already recorded reference
    AlreadyApplied { user_id: i64 },
}

impl ReconcileOutcome {
    pub fn user_id(&self) -> i64 {
        match self {
            ReconcileOutcome::Applied { user_id } | ReconcileOutcome::AlreadyApplied { user_id } => {
                *user_id
            }
        }
    }
}

pub struct PaymentReconciler {
    gateway: Arc<dyn PaymentGateway>,
    store: UserStore,
    reference_prefix: String,
}

impl PaymentReconciler {
    pub fn new(gateway: Arc<dyn PaymentGateway>, store: UserStore, reference_prefix: &str) -> Self {
        Self {
            gateway,
            store,
            reference_prefix: reference_prefix.to_string(),
        }
    }

    /// Verify `reference` with the provider and record it against its user.
    ///
    /// Never trusts client-supplied status. The user row is written only
    /// after a `success` verification, and at most once per reference.
    pub async fn reconcile(&self, reference: &str) -> Result<ReconcileOutcome, ReconcileError> {
        if !is_well_formed_reference(reference) {
            warn!(reference = %safe_token_log(reference), "Rejecting malformed payment reference");
            return Err(ReconcileError::InvalidReference);
        }

        let transaction = self.gateway.verify(reference).await.map_err(|e| match e {
            GatewayError::Rejected(message) => {
                warn!(
                    reference = %safe_token_log(reference),
                    message = %message,
                    "Provider refused verification"
                );
                ReconcileError::VerificationFailed
            }
            other => {
                warn!(
                    reference = %safe_token_log(reference),
                    error = %other,
                    "Payment provider unavailable during verification"
                );
                ReconcileError::ProviderUnavailable(other)
            }
        })?;

        if transaction.reference != reference {
            warn!(
                requested = %safe_token_log(reference),
                returned = %safe_token_log(&transaction.reference),
                "Provider returned a different reference"
            );
            return Err(ReconcileError::InvalidReference);
        }

        if transaction.status != TransactionStatus::Success {
            warn!(
                reference = %safe_token_log(reference),
                status = ?transaction.status,
                "Transaction not successful, leaving user untouched"
            );
            return Err(ReconcileError::VerificationFailed);
        }

        let user_id = transaction.user_id.ok_or_else(|| {
            warn!(reference = %safe_token_log(reference), "Transaction metadata has no user_id");
            ReconcileError::UnknownUser
        })?;

        if let Some(embedded) = user_id_in_reference(&self.reference_prefix, reference) {
            if embedded != user_id {
                warn!(
                    reference = %safe_token_log(reference),
                    metadata_user_id = user_id,
                    reference_user_id = embedded,
                    "Reference and metadata disagree on the paying user"
                );
                return Err(ReconcileError::InvalidReference);
            }
        }

        let outcome = self
            .store
            .update_payment_status(user_id, reference)
            .await
            .map_err(|e| match e {
                StoreError::UnknownUser(_) => ReconcileError::UnknownUser,
                StoreError::ReferenceInUse => ReconcileError::InvalidReference,
                StoreError::DuplicateEmail => ReconcileError::InvalidReference,
                StoreError::Database(e) => ReconcileError::Database(e),
            })?;

        match outcome {
            PaymentUpdate::Applied => {
                info!(
                    user_id = user_id,
                    reference = %safe_token_log(reference),
                    amount = ?transaction.amount,
                    currency = ?transaction.currency,
                    "Payment reconciled, access granted"
                );
                Ok(ReconcileOutcome::Applied { user_id })
            }
            PaymentUpdate::AlreadyApplied => {
                info!(
                    user_id = user_id,
                    reference = %safe_token_log(reference),
                    "Duplicate payment callback absorbed"
                );
                Ok(ReconcileOutcome::AlreadyApplied { user_id })
            }
        }
    }
}
