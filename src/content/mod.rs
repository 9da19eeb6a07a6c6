//! # Content Module
//!
//! Paid learning content:
//! - Subjects, lessons, flashcards and quizzes
//! - Server-side quiz grading and student progress
//! - Teacher lesson authoring
//! - Role-specific dashboard

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use routes::content_routes;
