//! # Access Gate
//!
//! Per-request decision between anonymous, authenticated and paid access.
//! `policy` holds the pure state machine, `middleware` applies it to axum.

pub mod middleware;
pub mod policy;


pub use middleware::access_gate;
