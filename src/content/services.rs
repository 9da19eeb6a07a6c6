use super::models::{
    CreateLessonRequest, Flashcard, Lesson, ProgressUpdateRequest, Quiz, QuizAttemptResult,
    QuizQuestion, StudentProgress, Subject, TeacherLesson,
};
use crate::common::ApiError;
use sqlx::SqlitePool;
use tracing::info;

/// Score as a whole percentage; skipped and out-of-range answers count wrong
pub fn grade(questions: &[QuizQuestion], answers: &[Option<usize>]) -> (i64, i64, i64) {
    let total = questions.len() as i64;
    let correct = questions
        .iter()
        .zip(answers.iter().chain(std::iter::repeat(&None)))
        .filter(|(q, a)| **a == Some(q.correct_answer))
        .count() as i64;

    let score = if total == 0 {
        0
    } else {
        (correct * 100 + total / 2) / total
    };

    (correct, total, score)
}

pub struct ContentService {
    db: SqlitePool,
}

impl ContentService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ============================================================================
    // Catalogue
    // ============================================================================

    pub async fn list_subjects(&self) -> Result<Vec<Subject>, ApiError> {
        let subjects = sqlx::query_as::<_, Subject>("SELECT * FROM subjects ORDER BY name")
            .fetch_all(&self.db)
            .await?;
        Ok(subjects)
    }

    pub async fn lessons_by_subject(
        &self,
        subject_id: i64,
        grade_level: Option<i64>,
    ) -> Result<Vec<Lesson>, ApiError> {
        let lessons = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT * FROM lessons
            WHERE subject_id = ? AND (? IS NULL OR grade_level = ?)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(subject_id)
        .bind(grade_level)
        .bind(grade_level)
        .fetch_all(&self.db)
        .await?;
        Ok(lessons)
    }

    pub async fn flashcards_by_lesson(&self, lesson_id: i64) -> Result<Vec<Flashcard>, ApiError> {
        let cards = sqlx::query_as::<_, Flashcard>(
            "SELECT * FROM flashcards WHERE lesson_id = ? ORDER BY difficulty_level, id",
        )
        .bind(lesson_id)
        .fetch_all(&self.db)
        .await?;
        Ok(cards)
    }

    pub async fn quizzes_by_lesson(&self, lesson_id: i64) -> Result<Vec<Quiz>, ApiError> {
        let quizzes = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE lesson_id = ? ORDER BY id")
            .bind(lesson_id)
            .fetch_all(&self.db)
            .await?;
        Ok(quizzes)
    }

    pub async fn get_quiz(&self, quiz_id: i64) -> Result<Quiz, ApiError> {
        sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ?")
            .bind(quiz_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound("Quiz not found".to_string()))
    }

    // ============================================================================
    // Teacher authoring
    // ============================================================================

    pub async fn teacher_lessons(&self, teacher_id: i64) -> Result<Vec<TeacherLesson>, ApiError> {
        let lessons = sqlx::query_as::<_, TeacherLesson>(
            r#"
            SELECT l.id, l.subject_id, l.title, l.title_sw, l.grade_level, l.created_at,
                   s.name AS subject_name, s.name_sw AS subject_name_sw,
                   (SELECT COUNT(*) FROM flashcards f WHERE f.lesson_id = l.id) AS flashcard_count
            FROM lessons l
            JOIN subjects s ON l.subject_id = s.id
            WHERE l.teacher_id = ?
            ORDER BY l.created_at DESC, l.id DESC
            "#,
        )
        .bind(teacher_id)
        .fetch_all(&self.db)
        .await?;
        Ok(lessons)
    }

    /// Lesson, its flashcards and optional quiz, written atomically
    pub async fn create_lesson(
        &self,
        teacher_id: i64,
        request: CreateLessonRequest,
    ) -> Result<i64, ApiError> {
        let mut tx = self.db.begin().await?;

        let subject: Option<(i64,)> = sqlx::query_as("SELECT id FROM subjects WHERE id = ?")
            .bind(request.subject_id)
            .fetch_optional(&mut *tx)
            .await?;
        if subject.is_none() {
            return Err(ApiError::BadRequest("Subject not found".to_string()));
        }

        let content = match &request.content {
            Some(value) => value.to_string(),
            None => serde_json::json!({
                "flashcards": request
                    .flashcards
                    .iter()
                    .map(|c| serde_json::json!({ "question": c.question, "answer": c.answer }))
                    .collect::<Vec<_>>()
            })
            .to_string(),
        };

        let lesson_id = sqlx::query(
            r#"
            INSERT INTO lessons (subject_id, teacher_id, title, title_sw, content, grade_level)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.subject_id)
        .bind(teacher_id)
        .bind(request.title.trim())
        .bind(&request.title_sw)
        .bind(&content)
        .bind(request.grade_level)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for card in &request.flashcards {
            sqlx::query(
                r#"
                INSERT INTO flashcards (lesson_id, question, question_sw, answer, answer_sw, difficulty_level)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(lesson_id)
            .bind(card.question.trim())
            .bind(&card.question_sw)
            .bind(card.answer.trim())
            .bind(&card.answer_sw)
            .bind(card.difficulty.unwrap_or(1))
            .execute(&mut *tx)
            .await?;
        }

        if let Some(quiz) = &request.quiz {
            let questions = serde_json::to_string(&quiz.questions)
                .map_err(|e| ApiError::BadRequest(format!("invalid quiz questions: {}", e)))?;
            sqlx::query(
                r#"
                INSERT INTO quizzes (lesson_id, title, title_sw, questions, total_questions)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(lesson_id)
            .bind(quiz.title.trim())
            .bind(&quiz.title_sw)
            .bind(&questions)
            .bind(quiz.questions.len() as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            lesson_id = lesson_id,
            teacher_id = teacher_id,
            flashcards = request.flashcards.len(),
            has_quiz = request.quiz.is_some(),
            "Lesson created"
        );
        Ok(lesson_id)
    }

    // ============================================================================
    // Student progress
    // ============================================================================

    /// Grade server-side, store the attempt, fold the score into progress
    pub async fn record_quiz_attempt(
        &self,
        student_id: i64,
        quiz: &Quiz,
        answers: &[Option<usize>],
        time_taken: Option<i64>,
    ) -> Result<QuizAttemptResult, ApiError> {
        let questions = quiz.parsed_questions();
        let (correct, total, score) = grade(&questions, answers);
        let answers_json = serde_json::to_string(answers)
            .map_err(|e| ApiError::BadRequest(format!("invalid answers: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let attempt_id = sqlx::query(
            r#"
            INSERT INTO quiz_attempts (student_id, quiz_id, score, total_questions, correct_answers, time_taken, answers)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(student_id)
        .bind(quiz.id)
        .bind(score)
        .bind(total)
        .bind(correct)
        .bind(time_taken)
        .bind(&answers_json)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            r#"
            INSERT INTO student_progress (student_id, lesson_id, quiz_attempts, best_quiz_score, completion_percentage)
            VALUES (?, ?, 1, ?, ?)
            ON CONFLICT(student_id, lesson_id) DO UPDATE SET
                quiz_attempts = quiz_attempts + 1,
                best_quiz_score = MAX(best_quiz_score, excluded.best_quiz_score),
                completion_percentage = MAX(completion_percentage, excluded.completion_percentage),
                last_accessed = datetime('now')
            "#,
        )
        .bind(student_id)
        .bind(quiz.lesson_id)
        .bind(score)
        .bind(score)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            student_id = student_id,
            quiz_id = quiz.id,
            score = score,
            "Quiz attempt recorded"
        );

        Ok(QuizAttemptResult {
            attempt_id,
            score,
            correct_answers: correct,
            total_questions: total,
        })
    }

    pub async fn student_progress(
        &self,
        student_id: i64,
        lesson_id: Option<i64>,
    ) -> Result<Vec<StudentProgress>, ApiError> {
        let progress = sqlx::query_as::<_, StudentProgress>(
            r#"
            SELECT * FROM student_progress
            WHERE student_id = ? AND (? IS NULL OR lesson_id = ?)
            ORDER BY last_accessed DESC, id DESC
            "#,
        )
        .bind(student_id)
        .bind(lesson_id)
        .bind(lesson_id)
        .fetch_all(&self.db)
        .await?;
        Ok(progress)
    }

    /// Counters only move forward; study time accumulates
    pub async fn update_progress(
        &self,
        student_id: i64,
        lesson_id: i64,
        update: &ProgressUpdateRequest,
    ) -> Result<StudentProgress, ApiError> {
        let lesson: Option<(i64,)> = sqlx::query_as("SELECT id FROM lessons WHERE id = ?")
            .bind(lesson_id)
            .fetch_optional(&self.db)
            .await?;
        if lesson.is_none() {
            return Err(ApiError::NotFound("Lesson not found".to_string()));
        }

        sqlx::query(
            r#"
            INSERT INTO student_progress (student_id, lesson_id, flashcards_completed, total_study_time, completion_percentage)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(student_id, lesson_id) DO UPDATE SET
                flashcards_completed = MAX(flashcards_completed, excluded.flashcards_completed),
                total_study_time = CASE
                    WHEN total_study_time > 9223372036854775807 - excluded.total_study_time
                        THEN 9223372036854775807
                    ELSE total_study_time + excluded.total_study_time
                END,
                completion_percentage = MAX(completion_percentage, excluded.completion_percentage),
                last_accessed = datetime('now')
            "#,
        )
        .bind(student_id)
        .bind(lesson_id)
        .bind(update.flashcards_completed.unwrap_or(0))
        .bind(update.study_time_seconds.unwrap_or(0).max(0))
        .bind(update.completion_percentage.unwrap_or(0))
        .execute(&self.db)
        .await?;

        let progress = sqlx::query_as::<_, StudentProgress>(
            "SELECT * FROM student_progress WHERE student_id = ? AND lesson_id = ?",
        )
        .bind(student_id)
        .bind(lesson_id)
        .fetch_one(&self.db)
        .await?;
        Ok(progress)
    }
}
