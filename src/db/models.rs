use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::AttemptStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer_index: i32,
}

/// A quiz as read from the catalog. Attempts keep their own copy of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct QuizDefinition {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) chapter_id: Option<String>,
    pub(crate) title: String,
    pub(crate) questions: Vec<Question>,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) passing_score: i32,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) available_from: Option<PrimitiveDateTime>,
    pub(crate) available_to: Option<PrimitiveDateTime>,
    pub(crate) shuffle_questions: bool,
    pub(crate) shuffle_options: bool,
    pub(crate) show_correct_answers: bool,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuizRow {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) chapter_id: Option<String>,
    pub(crate) title: String,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) passing_score: i32,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) available_from: Option<PrimitiveDateTime>,
    pub(crate) available_to: Option<PrimitiveDateTime>,
    pub(crate) shuffle_questions: bool,
    pub(crate) shuffle_options: bool,
    pub(crate) show_correct_answers: bool,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuestionRow {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) position: i32,
    pub(crate) text: String,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) correct_answer_index: i32,
}

impl QuizRow {
    pub(crate) fn into_definition(self, questions: Vec<QuestionRow>) -> QuizDefinition {
        QuizDefinition {
            id: self.id,
            course_id: self.course_id,
            chapter_id: self.chapter_id,
            title: self.title,
            questions: questions
                .into_iter()
                .map(|row| Question {
                    id: row.id,
                    text: row.text,
                    options: row.options.0,
                    correct_answer_index: row.correct_answer_index,
                })
                .collect(),
            time_limit_minutes: self.time_limit_minutes,
            passing_score: self.passing_score,
            max_attempts: self.max_attempts,
            available_from: self.available_from,
            available_to: self.available_to,
            shuffle_questions: self.shuffle_questions,
            shuffle_options: self.shuffle_options,
            show_correct_answers: self.show_correct_answers,
        }
    }
}

/// Graded answer, stored against the original (unshuffled) option indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct AttemptAnswer {
    pub(crate) question_id: String,
    pub(crate) selected_answer_index: i32,
    pub(crate) is_correct: bool,
}

/// Order in which an attempt's questions and options were shown to the learner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PresentationOrder {
    pub(crate) questions: Vec<PresentedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PresentedQuestion {
    pub(crate) question_id: String,
    /// `option_order[displayed] == original`.
    pub(crate) option_order: Vec<usize>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) course_id: String,
    pub(crate) learner_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: Option<PrimitiveDateTime>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) time_spent_seconds: Option<i64>,
    pub(crate) score: Option<i32>,
    pub(crate) is_passed: Option<bool>,
    pub(crate) answers: Json<Vec<AttemptAnswer>>,
    pub(crate) definition: Json<QuizDefinition>,
    pub(crate) definition_digest: String,
    pub(crate) presentation: Json<PresentationOrder>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
