use super::models::{CreateLessonRequest, ProgressUpdateRequest, QuizQuestion};
use crate::common::validation::require_text;
use crate::common::{ValidationResult, Validator};

pub const MIN_GRADE: i64 = 1;
pub const MAX_GRADE: i64 = 12;
/// Study time reported in a single progress update, in seconds
pub const MAX_STUDY_SECONDS_PER_UPDATE: i64 = 86_400;

impl Validator for CreateLessonRequest {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        require_text(&mut result, "title", &self.title, 200);

        if self.subject_id <= 0 {
            result.add_error("subject_id", "must be a valid subject");
        }

        if !(MIN_GRADE..=MAX_GRADE).contains(&self.grade_level) {
            result.add_error("grade_level", "must be between 1 and 12");
        }

        if self.flashcards.is_empty() {
            result.add_error("flashcards", "at least one flashcard is required");
        }

        for (i, card) in self.flashcards.iter().enumerate() {
            if card.question.trim().is_empty() || card.answer.trim().is_empty() {
                result.add_error(
                    &format!("flashcards[{}]", i),
                    "question and answer are required",
                );
            }
            if let Some(difficulty) = card.difficulty {
                if !(1..=5).contains(&difficulty) {
                    result.add_error(
                        &format!("flashcards[{}].difficulty", i),
                        "must be between 1 and 5",
                    );
                }
            }
        }

        if let Some(quiz) = &self.quiz {
            require_text(&mut result, "quiz.title", &quiz.title, 200);
            if quiz.questions.is_empty() {
                result.add_error("quiz.questions", "at least one question is required");
            }
            for (i, question) in quiz.questions.iter().enumerate() {
                if let Some(message) = question_problem(question) {
                    result.add_error(&format!("quiz.questions[{}]", i), message);
                }
            }
        }

        result
    }
}

fn question_problem(question: &QuizQuestion) -> Option<&'static str> {
    if question.question.trim().is_empty() {
        Some("question text is required")
    } else if question.options.len() < 2 {
        Some("at least two options are required")
    } else if question.correct_answer >= question.options.len() {
        Some("correct_answer must index one of the options")
    } else {
        None
    }
}

impl Validator for ProgressUpdateRequest {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if matches!(self.flashcards_completed, Some(n) if n < 0) {
            result.add_error("flashcards_completed", "must not be negative");
        }
        match self.study_time_seconds {
            Some(n) if n < 0 => result.add_error("study_time_seconds", "must not be negative"),
            Some(n) if n > MAX_STUDY_SECONDS_PER_UPDATE => {
                result.add_error("study_time_seconds", "must not exceed 86400 per update")
            }
            _ => {}
        }
        if matches!(self.completion_percentage, Some(n) if !(0..=100).contains(&n)) {
            result.add_error("completion_percentage", "must be between 0 and 100");
        }

        result
    }
}
