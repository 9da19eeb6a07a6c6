//! # Auth Module
//!
//! Accounts and sessions:
//! - Email/password signup and login (argon2 hashes)
//! - Signed session tokens delivered as an HTTP-only cookie
//! - Credential store over SQLite
//! - AuthedUser / PaidUser extractors for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod password;
pub mod routes;
pub mod session;
pub mod store;
pub mod validators;


pub use extractors::{AuthedUser, PaidUser};
pub use models::{Role, User};
pub use routes::auth_routes;
pub use store::UserStore;
