use serde::Serialize;

use crate::services::availability::Availability;

/// A question as shown to a learner: no answer key, options in display order.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuizView {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) chapter_id: Option<String>,
    pub(crate) title: String,
    pub(crate) time_limit_minutes: Option<i32>,
    pub(crate) passing_score: i32,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) available_from: Option<String>,
    pub(crate) available_to: Option<String>,
    pub(crate) show_correct_answers: bool,
    pub(crate) questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ActiveAttemptInfo {
    pub(crate) attempt_id: String,
    pub(crate) started_at: String,
    pub(crate) expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LearnerQuizResponse {
    pub(crate) quiz: QuizView,
    pub(crate) availability: Availability,
    pub(crate) active_attempt: Option<ActiveAttemptInfo>,
}
