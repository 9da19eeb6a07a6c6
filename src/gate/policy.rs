//! Access decisions, independent of HTTP plumbing

use crate::auth::session::SessionClaims;

/// Routes reachable without a session
pub const PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/health",
    "/login",
    "/signup",
    "/api/auth/login",
    "/api/auth/signup",
    "/api/payment/verify",
];

/// Routes that need a session but never a payment, so a user mid-purchase
/// can always reach the payment flow and their own account
pub const PAYMENT_EXEMPT_ROUTES: &[&str] = &[
    "/payment",
    "/api/payment/initialize",
    "/api/payment/verify",
    "/api/auth/logout",
    "/api/me",
];

pub const LOGIN_PATH: &str = "/login";
pub const PAYMENT_PATH: &str = "/payment";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    Anonymous,
    Authenticated,
    AuthenticatedPaid,
}

impl AccessState {
    pub fn from_claims(claims: Option<&SessionClaims>) -> Self {
        match claims {
            None => AccessState::Anonymous,
            Some(c) if c.has_paid => AccessState::AuthenticatedPaid,
            Some(_) => AccessState::Authenticated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    PaymentExempt,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToLogin,
    RedirectToPayment,
}

/// Trailing slashes are ignored; anything unlisted is paid
pub fn classify(path: &str) -> RouteClass {
    let trimmed = path.trim_end_matches('/');
    let normalized = if trimmed.is_empty() { "/" } else { trimmed };

    if PUBLIC_ROUTES.contains(&normalized) {
        RouteClass::Public
    } else if PAYMENT_EXEMPT_ROUTES.contains(&normalized) {
        RouteClass::PaymentExempt
    } else {
        RouteClass::Paid
    }
}

pub fn decide(access: AccessState, route: RouteClass) -> GateDecision {
    match (access, route) {
        (_, RouteClass::Public) => GateDecision::Allow,
        (AccessState::Anonymous, _) => GateDecision::RedirectToLogin,
        (AccessState::Authenticated, RouteClass::PaymentExempt) => GateDecision::Allow,
        (AccessState::Authenticated, RouteClass::Paid) => GateDecision::RedirectToPayment,
        (AccessState::AuthenticatedPaid, _) => GateDecision::Allow,
    }
}

/// JSON endpoints get error bodies instead of browser redirects
pub fn is_api_path(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}
