use super::handlers;
use axum::{
    routing::{get, post},
    Router,
};

/// Creates the content router: dashboard, catalogue, progress, teacher authoring
pub fn content_routes() -> Router {
    Router::new()
        .route("/dashboard", get(handlers::dashboard))
        // Catalogue
        .route("/api/subjects", get(handlers::get_subjects))
        .route("/api/lessons", get(handlers::get_lessons))
        .route("/api/flashcards", get(handlers::get_flashcards))
        .route("/api/quizzes", get(handlers::get_quizzes))
        // Student progress
        .route("/api/quizzes/:id/attempts", post(handlers::submit_quiz_attempt))
        .route("/api/progress", get(handlers::get_progress))
        .route("/api/progress/:lesson_id", post(handlers::update_progress))
        // Teacher authoring
        .route("/api/teacher/lessons", get(handlers::get_teacher_lessons))
        .route("/api/teacher/create-lesson", post(handlers::create_lesson))
}
