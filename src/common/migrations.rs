// src/common/migrations.rs
//! Database schema creation and seed data

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created if missing. `RESET_DB=true` drops everything first.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";
    migrate(pool, should_reset_db).await
}

pub async fn migrate(pool: &SqlitePool, reset: bool) -> Result<(), sqlx::Error> {
    if reset {
        warn!("RESET_DB=true - dropping all tables and recreating schema");
        drop_all_tables(pool).await?;
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_user_tables(pool).await?;
    create_content_tables(pool).await?;
    create_progress_tables(pool).await?;
    create_indexes(pool).await?;
    seed_subjects(pool).await?;

    info!("Database migration completed");
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Reverse dependency order
    let tables = [
        "quiz_attempts",
        "student_progress",
        "quizzes",
        "flashcards",
        "lessons",
        "subjects",
        "users",
    ];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('student', 'teacher')),
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            language_preference TEXT NOT NULL DEFAULT 'en' CHECK (language_preference IN ('en', 'sw')),
            has_paid BOOLEAN NOT NULL DEFAULT 0,
            payment_reference TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_content_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            name_sw TEXT,
            description TEXT,
            description_sw TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lessons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_id INTEGER NOT NULL REFERENCES subjects(id),
            teacher_id INTEGER NOT NULL REFERENCES users(id),
            title TEXT NOT NULL,
            title_sw TEXT,
            content TEXT NOT NULL,
            grade_level INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS flashcards (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lesson_id INTEGER NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
            question TEXT NOT NULL,
            question_sw TEXT,
            answer TEXT NOT NULL,
            answer_sw TEXT,
            difficulty_level INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quizzes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lesson_id INTEGER NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            title_sw TEXT,
            questions TEXT NOT NULL,
            total_questions INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_progress_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS student_progress (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL REFERENCES users(id),
            lesson_id INTEGER NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
            flashcards_completed INTEGER NOT NULL DEFAULT 0,
            quiz_attempts INTEGER NOT NULL DEFAULT 0,
            best_quiz_score INTEGER NOT NULL DEFAULT 0,
            total_study_time INTEGER NOT NULL DEFAULT 0,
            completion_percentage INTEGER NOT NULL DEFAULT 0,
            last_accessed TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (student_id, lesson_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quiz_attempts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL REFERENCES users(id),
            quiz_id INTEGER NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
            score INTEGER NOT NULL,
            total_questions INTEGER NOT NULL,
            correct_answers INTEGER NOT NULL,
            time_taken INTEGER,
            answers TEXT NOT NULL,
            completed_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        // One verified transaction can entitle at most one account
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_payment_reference ON users(payment_reference) WHERE payment_reference IS NOT NULL",
        "CREATE INDEX IF NOT EXISTS idx_lessons_subject ON lessons(subject_id, grade_level)",
        "CREATE INDEX IF NOT EXISTS idx_lessons_teacher ON lessons(teacher_id)",
        "CREATE INDEX IF NOT EXISTS idx_flashcards_lesson ON flashcards(lesson_id)",
        "CREATE INDEX IF NOT EXISTS idx_quizzes_lesson ON quizzes(lesson_id)",
        "CREATE INDEX IF NOT EXISTS idx_quiz_attempts_student ON quiz_attempts(student_id)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

async fn seed_subjects(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let subjects = [
        (
            "Mathematics",
            "Hisabati",
            "Numbers, algebra, geometry and problem solving",
            "Namba, aljebra, jiometri na utatuzi wa matatizo",
        ),
        (
            "English",
            "Kiingereza",
            "Reading, writing and grammar",
            "Kusoma, kuandika na sarufi",
        ),
        (
            "Science",
            "Sayansi",
            "Biology, chemistry and physics fundamentals",
            "Misingi ya biolojia, kemia na fizikia",
        ),
        (
            "Kiswahili",
            "Kiswahili",
            "Swahili grammar, literature and composition",
            "Lugha ya Kiswahili: sarufi, fasihi na utunzi",
        ),
    ];

    for (name, name_sw, description, description_sw) in subjects {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO subjects (name, name_sw, description, description_sw)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(name_sw)
        .bind(description)
        .bind(description_sw)
        .execute(pool)
        .await?;
    }

    Ok(())
}
