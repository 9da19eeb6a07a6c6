use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

/// Emits a JSON-encoded TEXT column as structured JSON
fn serialize_json_text<S>(raw: &str, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let value: serde_json::Value =
        serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    value.serialize(serializer)
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub name_sw: Option<String>,
    pub description: Option<String>,
    pub description_sw: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Lesson {
    pub id: i64,
    pub subject_id: i64,
    pub teacher_id: i64,
    pub title: String,
    pub title_sw: Option<String>,
    #[serde(serialize_with = "serialize_json_text")]
    pub content: String,
    pub grade_level: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Teacher listing row, joined with the subject names
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TeacherLesson {
    pub id: i64,
    pub subject_id: i64,
    pub title: String,
    pub title_sw: Option<String>,
    pub grade_level: i64,
    pub created_at: String,
    pub subject_name: String,
    pub subject_name_sw: Option<String>,
    pub flashcard_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Flashcard {
    pub id: i64,
    pub lesson_id: i64,
    pub question: String,
    pub question_sw: Option<String>,
    pub answer: String,
    pub answer_sw: Option<String>,
    pub difficulty_level: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct Quiz {
    pub id: i64,
    pub lesson_id: i64,
    pub title: String,
    pub title_sw: Option<String>,
    pub questions: String,
    pub total_questions: i64,
}

/// Stored quiz question, including the answer key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(default)]
    pub question_sw: Option<String>,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

/// Question as shown to students; the answer key stays server-side
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub question: String,
    pub question_sw: Option<String>,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizView {
    pub id: i64,
    pub lesson_id: i64,
    pub title: String,
    pub title_sw: Option<String>,
    pub total_questions: i64,
    pub questions: Vec<PublicQuestion>,
}

impl Quiz {
    /// Stored questions; unparseable JSON reads as an empty quiz
    pub fn parsed_questions(&self) -> Vec<QuizQuestion> {
        serde_json::from_str(&self.questions).unwrap_or_default()
    }

    pub fn to_view(&self) -> QuizView {
        QuizView {
            id: self.id,
            lesson_id: self.lesson_id,
            title: self.title.clone(),
            title_sw: self.title_sw.clone(),
            total_questions: self.total_questions,
            questions: self
                .parsed_questions()
                .into_iter()
                .map(|q| PublicQuestion {
                    question: q.question,
                    question_sw: q.question_sw,
                    options: q.options,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StudentProgress {
    pub id: i64,
    pub student_id: i64,
    pub lesson_id: i64,
    pub flashcards_completed: i64,
    pub quiz_attempts: i64,
    pub best_quiz_score: i64,
    pub total_study_time: i64,
    pub completion_percentage: i64,
    pub last_accessed: String,
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LessonsQuery {
    pub subject_id: Option<i64>,
    pub grade_level: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LessonIdQuery {
    pub lesson_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlashcardInput {
    pub question: String,
    pub question_sw: Option<String>,
    pub answer: String,
    pub answer_sw: Option<String>,
    pub difficulty: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizInput {
    pub title: String,
    pub title_sw: Option<String>,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLessonRequest {
    pub title: String,
    pub title_sw: Option<String>,
    pub subject_id: i64,
    pub grade_level: i64,
    pub content: Option<serde_json::Value>,
    #[serde(default)]
    pub flashcards: Vec<FlashcardInput>,
    pub quiz: Option<QuizInput>,
}

#[derive(Debug, Deserialize)]
pub struct QuizAttemptRequest {
    /// Chosen option index per question, `null` when skipped
    pub answers: Vec<Option<usize>>,
    pub time_taken: Option<i64>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct QuizAttemptResult {
    pub attempt_id: i64,
    pub score: i64,
    pub correct_answers: i64,
    pub total_questions: i64,
}

#[derive(Debug, Deserialize)]
pub struct ProgressUpdateRequest {
    pub flashcards_completed: Option<i64>,
    pub study_time_seconds: Option<i64>,
    pub completion_percentage: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CreateLessonResponse {
    pub success: bool,
    pub lesson_id: i64,
    pub message: String,
}
