//! # Payments Module
//!
//! Paid-access purchase flow against the payment provider:
//! - Transaction initialization for the signed-in user
//! - Verification callback handling
//! - Reconciliation of provider state into `users.has_paid`, idempotent
//!   against duplicate callbacks

pub mod gateway;
pub mod handlers;
pub mod models;
pub mod reconciler;
pub mod routes;

#[cfg(test)]
mod tests;

pub use gateway::{PaymentGateway, PaystackClient};
pub use reconciler::{PaymentReconciler, ReconcileError, ReconcileOutcome};
pub use routes::payment_routes;
