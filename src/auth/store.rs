//! Credential store: user rows and the paid-status transition

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::models::{NewUser, User};
use crate::common::{safe_email_log, safe_token_log, ApiError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("user {0} not found")]
    UnknownUser(i64),

    #[error("payment reference is linked to another account")]
    ReferenceInUse,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => ApiError::Conflict("User already exists".to_string()),
            StoreError::UnknownUser(_) => ApiError::NotFound("User not found".to_string()),
            StoreError::ReferenceInUse => {
                ApiError::Conflict("Payment reference already used".to_string())
            }
            StoreError::Database(e) => ApiError::DatabaseError(e),
        }
    }
}

/// Result of recording a verified payment against a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentUpdate {
    /// The row changed: the user is now paid with this reference
    Applied,
    /// The user already holds this reference; nothing was written
    AlreadyApplied,
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub struct UserStore {
    db: SqlitePool,
}

impl UserStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// Lookup is case-insensitive; emails are stored lower-cased
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    /// Insert a new, unpaid user and return the stored row
    pub async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let email = new_user.email.trim().to_lowercase();

        let result = sqlx::query(
            r#"
            INSERT INTO users (email, password_hash, role, first_name, last_name, language_preference)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&email)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.language_preference)
        .execute(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateEmail
            } else {
                StoreError::Database(e)
            }
        })?;

        let id = result.last_insert_rowid();
        info!(
            user_id = id,
            email = %safe_email_log(&email),
            role = %new_user.role,
            "User account created"
        );

        self.get_user_by_id(id)
            .await?
            .ok_or(StoreError::UnknownUser(id))
    }

    /// Mark a user as paid with a provider-verified reference.
    ///
    /// Runs as one transaction whose first statement is the conditional
    /// write, so concurrent callbacks for the same user serialize on the
    /// write lock. Re-delivering the same reference writes nothing.
    pub async fn update_payment_status(
        &self,
        user_id: i64,
        reference: &str,
    ) -> Result<PaymentUpdate, StoreError> {
        let mut tx = self.db.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET has_paid = 1, payment_reference = ?, updated_at = datetime('now')
            WHERE id = ? AND payment_reference IS NOT ?
            "#,
        )
        .bind(reference)
        .bind(user_id)
        .bind(reference)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                warn!(
                    user_id = user_id,
                    reference = %safe_token_log(reference),
                    "Payment reference already belongs to another user"
                );
                StoreError::ReferenceInUse
            } else {
                StoreError::Database(e)
            }
        })?;

        if result.rows_affected() == 1 {
            tx.commit().await?;
            info!(
                user_id = user_id,
                reference = %safe_token_log(reference),
                "User payment status updated"
            );
            return Ok(PaymentUpdate::Applied);
        }

        let existing: Option<(Option<String>,)> =
            sqlx::query_as("SELECT payment_reference FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        tx.commit().await?;

        match existing {
            None => Err(StoreError::UnknownUser(user_id)),
            Some(_) => {
                debug!(
                    user_id = user_id,
                    reference = %safe_token_log(reference),
                    "Payment reference already recorded, skipping update"
                );
                Ok(PaymentUpdate::AlreadyApplied)
            }
        }
    }
}
