use sqlx::PgPool;

use crate::db::models::{QuestionRow, QuizDefinition, QuizRow};

pub(crate) const COLUMNS: &str = "\
    id, course_id, chapter_id, title, time_limit_minutes, passing_score, max_attempts, \
    available_from, available_to, shuffle_questions, shuffle_options, show_correct_answers, \
    deleted_at, created_at, updated_at";

const QUESTION_COLUMNS: &str = "id, quiz_id, position, text, options, correct_answer_index";

/// Soft-deleted quizzes are treated as missing.
pub(crate) async fn find_active_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<QuizRow>, sqlx::Error> {
    sqlx::query_as::<_, QuizRow>(&format!(
        "SELECT {COLUMNS} FROM quizzes WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_questions(
    pool: &PgPool,
    quiz_id: &str,
) -> Result<Vec<QuestionRow>, sqlx::Error> {
    sqlx::query_as::<_, QuestionRow>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM quiz_questions WHERE quiz_id = $1 ORDER BY position, id"
    ))
    .bind(quiz_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn load_definition(
    pool: &PgPool,
    id: &str,
) -> Result<Option<QuizDefinition>, sqlx::Error> {
    let Some(quiz) = find_active_by_id(pool, id).await? else {
        return Ok(None);
    };
    let questions = list_questions(pool, &quiz.id).await?;
    Ok(Some(quiz.into_definition(questions)))
}
