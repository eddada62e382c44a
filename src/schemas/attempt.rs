use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::api::pagination::default_limit;
use crate::db::models::Attempt;
use crate::db::types::AttemptStatus;
use crate::schemas::quiz::QuizView;

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) quiz_id: String,
    pub(crate) started_at: String,
    pub(crate) expires_at: Option<String>,
    pub(crate) time_limit_seconds: Option<i64>,
    pub(crate) quiz: QuizView,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct AnswerPayload {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    #[serde(alias = "selectedAnswerIndex")]
    #[validate(range(min = -1, message = "selected_answer_index must be -1 or an option index"))]
    pub(crate) selected_answer_index: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub(crate) struct SubmitAttemptRequest {
    #[serde(default)]
    #[validate(nested)]
    pub(crate) answers: Vec<AnswerPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct QuestionResultResponse {
    pub(crate) question_id: String,
    pub(crate) selected_answer_index: i32,
    pub(crate) is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer_index: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AttemptResultResponse {
    pub(crate) attempt_id: String,
    pub(crate) quiz_id: String,
    pub(crate) learner_id: String,
    pub(crate) score: i32,
    pub(crate) is_passed: bool,
    pub(crate) passing_score: i32,
    pub(crate) correct_answers: usize,
    pub(crate) total_questions: usize,
    pub(crate) started_at: String,
    pub(crate) submitted_at: String,
    pub(crate) time_spent_seconds: i64,
    pub(crate) show_correct_answers: bool,
    pub(crate) results: Vec<QuestionResultResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AttemptSummary {
    pub(crate) id: String,
    pub(crate) quiz_id: String,
    pub(crate) course_id: String,
    pub(crate) learner_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) expires_at: Option<String>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) time_spent_seconds: Option<i64>,
    pub(crate) score: Option<i32>,
    pub(crate) is_passed: Option<bool>,
}

impl From<&Attempt> for AttemptSummary {
    fn from(attempt: &Attempt) -> Self {
        Self {
            id: attempt.id.clone(),
            quiz_id: attempt.quiz_id.clone(),
            course_id: attempt.course_id.clone(),
            learner_id: attempt.learner_id.clone(),
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            expires_at: attempt.expires_at.map(format_primitive),
            submitted_at: attempt.submitted_at.map(format_primitive),
            time_spent_seconds: attempt.time_spent_seconds,
            score: attempt.score,
            is_passed: attempt.is_passed,
        }
    }
}

/// In progress: `quiz` carries the attempt's own question order.
/// Submitted: `result` carries the graded answers.
#[derive(Debug, Serialize)]
pub(crate) struct AttemptDetailResponse {
    pub(crate) attempt: AttemptSummary,
    pub(crate) quiz: Option<QuizView>,
    pub(crate) result: Option<AttemptResultResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListAttemptsQuery {
    #[serde(default, alias = "quizId")]
    pub(crate) quiz_id: Option<String>,
    #[serde(default, alias = "learnerId")]
    pub(crate) learner_id: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<AttemptStatus>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

impl Default for ListAttemptsQuery {
    fn default() -> Self {
        Self { quiz_id: None, learner_id: None, status: None, skip: 0, limit: default_limit() }
    }
}
