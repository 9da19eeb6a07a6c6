use super::models::{
    CreateLessonRequest, CreateLessonResponse, LessonIdQuery, LessonsQuery, ProgressUpdateRequest,
    QuizAttemptRequest,
};
use super::services::ContentService;
use crate::auth::PaidUser;
use crate::common::{ApiError, AppState, Validator};
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

// ============================================================================
// Dashboard
// ============================================================================

/// GET /dashboard - Role-specific landing data
pub async fn dashboard(
    Extension(state): Extension<Arc<AppState>>,
    PaidUser(user): PaidUser,
) -> Result<impl IntoResponse, ApiError> {
    let service = ContentService::new(state.db.clone());

    if user.is_teacher() {
        let lessons = service.teacher_lessons(user.id).await?;
        return Ok(Json(json!({
            "role": user.role,
            "lessons": lessons,
        })));
    }

    let subjects = service.list_subjects().await?;
    let progress = service.student_progress(user.id, None).await?;
    Ok(Json(json!({
        "role": user.role,
        "subjects": subjects,
        "progress": progress,
    })))
}

// ============================================================================
// Catalogue
// ============================================================================

/// GET /api/subjects
pub async fn get_subjects(
    Extension(state): Extension<Arc<AppState>>,
    _user: PaidUser,
) -> Result<impl IntoResponse, ApiError> {
    let subjects = ContentService::new(state.db.clone()).list_subjects().await?;
    Ok(Json(json!({ "subjects": subjects })))
}

/// GET /api/lessons?subject_id=&grade_level=
pub async fn get_lessons(
    Extension(state): Extension<Arc<AppState>>,
    _user: PaidUser,
    Query(query): Query<LessonsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let subject_id = query
        .subject_id
        .ok_or_else(|| ApiError::BadRequest("Subject ID is required".to_string()))?;

    let lessons = ContentService::new(state.db.clone())
        .lessons_by_subject(subject_id, query.grade_level)
        .await?;
    Ok(Json(json!({ "lessons": lessons })))
}

/// GET /api/flashcards?lesson_id=
pub async fn get_flashcards(
    Extension(state): Extension<Arc<AppState>>,
    _user: PaidUser,
    Query(query): Query<LessonIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson_id = query
        .lesson_id
        .ok_or_else(|| ApiError::BadRequest("Lesson ID is required".to_string()))?;

    let flashcards = ContentService::new(state.db.clone())
        .flashcards_by_lesson(lesson_id)
        .await?;
    Ok(Json(json!({ "flashcards": flashcards })))
}

/// GET /api/quizzes?lesson_id=
pub async fn get_quizzes(
    Extension(state): Extension<Arc<AppState>>,
    _user: PaidUser,
    Query(query): Query<LessonIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let lesson_id = query
        .lesson_id
        .ok_or_else(|| ApiError::BadRequest("Lesson ID is required".to_string()))?;

    let quizzes: Vec<_> = ContentService::new(state.db.clone())
        .quizzes_by_lesson(lesson_id)
        .await?
        .iter()
        .map(|q| q.to_view())
        .collect();
    Ok(Json(json!({ "quizzes": quizzes })))
}

// ============================================================================
// Student progress
// ============================================================================

/// POST /api/quizzes/:id/attempts
pub async fn submit_quiz_attempt(
    Extension(state): Extension<Arc<AppState>>,
    PaidUser(user): PaidUser,
    Path(quiz_id): Path<i64>,
    Json(request): Json<QuizAttemptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if matches!(request.time_taken, Some(t) if t < 0) {
        return Err(ApiError::ValidationError(
            "time_taken: must not be negative".to_string(),
        ));
    }

    let service = ContentService::new(state.db.clone());
    let quiz = service.get_quiz(quiz_id).await?;
    let result = service
        .record_quiz_attempt(user.id, &quiz, &request.answers, request.time_taken)
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/progress?lesson_id=
pub async fn get_progress(
    Extension(state): Extension<Arc<AppState>>,
    PaidUser(user): PaidUser,
    Query(query): Query<LessonIdQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = ContentService::new(state.db.clone())
        .student_progress(user.id, query.lesson_id)
        .await?;
    Ok(Json(json!({ "progress": progress })))
}

/// POST /api/progress/:lesson_id
pub async fn update_progress(
    Extension(state): Extension<Arc<AppState>>,
    PaidUser(user): PaidUser,
    Path(lesson_id): Path<i64>,
    Json(request): Json<ProgressUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate().into_result()?;

    let progress = ContentService::new(state.db.clone())
        .update_progress(user.id, lesson_id, &request)
        .await?;
    Ok(Json(progress))
}

// ============================================================================
// Teacher authoring
// ============================================================================

/// GET /api/teacher/lessons
pub async fn get_teacher_lessons(
    Extension(state): Extension<Arc<AppState>>,
    PaidUser(user): PaidUser,
) -> Result<impl IntoResponse, ApiError> {
    user.require_teacher()?;

    let lessons = ContentService::new(state.db.clone())
        .teacher_lessons(user.id)
        .await?;
    Ok(Json(json!({ "lessons": lessons })))
}

/// POST /api/teacher/create-lesson
pub async fn create_lesson(
    Extension(state): Extension<Arc<AppState>>,
    PaidUser(user): PaidUser,
    Json(request): Json<CreateLessonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    user.require_teacher()?;
    request.validate().into_result()?;

    debug!(teacher_id = user.id, title = %request.title, "Creating lesson");
    let lesson_id = ContentService::new(state.db.clone())
        .create_lesson(user.id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateLessonResponse {
            success: true,
            lesson_id,
            message: "Lesson created successfully".to_string(),
        }),
    ))
}
