use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::api::pagination::{clamp_page, PaginatedResponse};
use crate::core::config::{ExpiredAttemptPolicy, Settings};
use crate::core::time::{format_primitive, Clock, SystemClock};
use crate::db::models::{Attempt, AttemptAnswer, PresentationOrder, QuizDefinition};
use crate::db::types::{AttemptStatus, CallerRole};
use crate::repositories::attempts::{AttemptFilter, FinishAttempt};
use crate::schemas::attempt::{
    AttemptDetailResponse, AttemptResultResponse, AttemptSummary, ListAttemptsQuery,
    QuestionResultResponse, StartAttemptResponse,
};
use crate::schemas::quiz::{ActiveAttemptInfo, LearnerQuizResponse};
use crate::services::attempt_timing;
use crate::services::availability::{self, AttemptHistory};
use crate::services::presentation;
use crate::services::scoring::{self, SubmittedAnswer};
use crate::services::store::{AttemptStore, EnrollmentDirectory, PgBackend, QuizCatalog, StoreError};

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("not found")]
    NotFound,
    #[error("learner is not enrolled in this course")]
    NotEnrolled,
    #[error("access denied")]
    Forbidden,
    #[error("{0}")]
    QuizUnavailable(String),
    #[error("attempt has already been submitted")]
    AlreadySubmitted,
    #[error("attempt time limit has expired")]
    AttemptExpired,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AttemptError {
    fn metric_label(&self) -> &'static str {
        match self {
            AttemptError::NotFound => "not_found",
            AttemptError::NotEnrolled => "not_enrolled",
            AttemptError::Forbidden => "forbidden",
            AttemptError::QuizUnavailable(_) => "quiz_unavailable",
            AttemptError::AlreadySubmitted => "already_submitted",
            AttemptError::AttemptExpired => "attempt_expired",
            AttemptError::Validation(_) => "validation",
            AttemptError::Store(_) => "store",
        }
    }
}

/// The authenticated `(user id, role)` pair handed over by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Caller {
    pub(crate) user_id: String,
    pub(crate) role: CallerRole,
}

impl Caller {
    pub(crate) fn new(user_id: impl Into<String>, role: CallerRole) -> Self {
        Self { user_id: user_id.into(), role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AttemptPolicy {
    pub(crate) grace_period_seconds: i64,
    pub(crate) expired_attempts: ExpiredAttemptPolicy,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            grace_period_seconds: attempt_timing::DEFAULT_GRACE_PERIOD_SECONDS,
            expired_attempts: ExpiredAttemptPolicy::Retain,
        }
    }
}

impl AttemptPolicy {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            grace_period_seconds: settings.quiz().grace_period_seconds,
            expired_attempts: settings.quiz().expired_attempts,
        }
    }
}

/// Drives the attempt lifecycle: availability, start, submit, expiry and reads.
#[derive(Clone)]
pub(crate) struct AttemptEngine {
    catalog: Arc<dyn QuizCatalog>,
    enrollments: Arc<dyn EnrollmentDirectory>,
    store: Arc<dyn AttemptStore>,
    clock: Arc<dyn Clock>,
    policy: AttemptPolicy,
}

impl AttemptEngine {
    pub(crate) fn new(
        catalog: Arc<dyn QuizCatalog>,
        enrollments: Arc<dyn EnrollmentDirectory>,
        store: Arc<dyn AttemptStore>,
        clock: Arc<dyn Clock>,
        policy: AttemptPolicy,
    ) -> Self {
        Self { catalog, enrollments, store, clock, policy }
    }

    pub(crate) fn postgres(pool: PgPool, settings: &Settings) -> Self {
        let backend = Arc::new(PgBackend::new(pool));
        Self::new(
            backend.clone(),
            backend.clone(),
            backend,
            Arc::new(SystemClock),
            AttemptPolicy::from_settings(settings),
        )
    }

    pub(crate) async fn quiz_for_learner(
        &self,
        quiz_id: &str,
        caller: &Caller,
    ) -> Result<LearnerQuizResponse, AttemptError> {
        self.observe(self.quiz_for_learner_inner(quiz_id, caller).await)
    }

    pub(crate) async fn start_attempt(
        &self,
        quiz_id: &str,
        caller: &Caller,
    ) -> Result<StartAttemptResponse, AttemptError> {
        self.observe(self.start_attempt_inner(quiz_id, caller).await)
    }

    pub(crate) async fn submit_attempt(
        &self,
        attempt_id: &str,
        caller: &Caller,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<AttemptResultResponse, AttemptError> {
        self.observe(self.submit_attempt_inner(attempt_id, caller, answers).await)
    }

    pub(crate) async fn attempt_details(
        &self,
        attempt_id: &str,
        caller: &Caller,
    ) -> Result<AttemptDetailResponse, AttemptError> {
        self.observe(self.attempt_details_inner(attempt_id, caller).await)
    }

    pub(crate) async fn list_attempts(
        &self,
        query: ListAttemptsQuery,
        caller: &Caller,
    ) -> Result<PaginatedResponse<AttemptSummary>, AttemptError> {
        self.observe(self.list_attempts_inner(query, caller).await)
    }

    fn observe<T>(&self, result: Result<T, AttemptError>) -> Result<T, AttemptError> {
        if let Err(err) = &result {
            if !matches!(err, AttemptError::Store(_)) {
                metrics::counter!("quiz_attempt_rejections_total", "reason" => err.metric_label())
                    .increment(1);
            }
        }
        result
    }

    async fn quiz_for_learner_inner(
        &self,
        quiz_id: &str,
        caller: &Caller,
    ) -> Result<LearnerQuizResponse, AttemptError> {
        let quiz = self.load_quiz(quiz_id).await?;
        if !self.is_course_staff(caller, &quiz.course_id).await? {
            self.ensure_enrolled(caller, &quiz.course_id).await?;
        }

        let now = self.clock.now();
        let pending = self.live_unsubmitted(&caller.user_id, &quiz.id, now).await?;
        let history = self.history(&caller.user_id, &quiz.id, pending.is_some()).await?;
        let availability = availability::evaluate(&quiz, history, now);

        let mut rng = StdRng::from_entropy();
        let (view, _) = presentation::present(&quiz, &mut rng);

        Ok(LearnerQuizResponse {
            quiz: view,
            availability,
            active_attempt: pending.map(|attempt| ActiveAttemptInfo {
                attempt_id: attempt.id,
                started_at: format_primitive(attempt.started_at),
                expires_at: attempt.expires_at.map(format_primitive),
            }),
        })
    }

    async fn start_attempt_inner(
        &self,
        quiz_id: &str,
        caller: &Caller,
    ) -> Result<StartAttemptResponse, AttemptError> {
        let quiz = self.load_quiz(quiz_id).await?;
        self.ensure_enrolled(caller, &quiz.course_id).await?;

        let now = self.clock.now();
        let pending = self.live_unsubmitted(&caller.user_id, &quiz.id, now).await?;
        let history = self.history(&caller.user_id, &quiz.id, pending.is_some()).await?;
        let availability = availability::evaluate(&quiz, history, now);
        if !availability.can_start {
            let reason = availability.reason.unwrap_or_else(|| "Quiz is not available".to_string());
            return Err(AttemptError::QuizUnavailable(reason));
        }

        let definition_digest = snapshot_digest(&quiz)?;
        let order = {
            let mut rng = StdRng::from_entropy();
            presentation::shuffle_order(&quiz, &mut rng)
        };
        let view = presentation::render(&quiz, &order);

        let attempt = Attempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz.id.clone(),
            course_id: quiz.course_id.clone(),
            learner_id: caller.user_id.clone(),
            status: AttemptStatus::InProgress,
            started_at: now,
            expires_at: attempt_timing::compute_expires_at(now, quiz.time_limit_minutes),
            submitted_at: None,
            time_spent_seconds: None,
            score: None,
            is_passed: None,
            answers: Json(Vec::new()),
            definition: Json(quiz),
            definition_digest,
            presentation: Json(order),
            created_at: now,
            updated_at: now,
        };

        if !self.store.create_attempt(&attempt).await? {
            return Err(AttemptError::QuizUnavailable(
                "You already have an unfinished attempt; finish it or let the pending attempt expire"
                    .to_string(),
            ));
        }

        tracing::info!(
            attempt_id = %attempt.id,
            quiz_id = %attempt.quiz_id,
            learner_id = %attempt.learner_id,
            digest = %attempt.definition_digest,
            "Quiz attempt started"
        );
        metrics::counter!("quiz_attempts_started_total").increment(1);

        Ok(StartAttemptResponse {
            attempt_id: attempt.id,
            quiz_id: attempt.quiz_id,
            started_at: format_primitive(attempt.started_at),
            expires_at: attempt.expires_at.map(format_primitive),
            time_limit_seconds: attempt_timing::time_limit_seconds(
                attempt.definition.time_limit_minutes,
            ),
            quiz: view,
        })
    }

    async fn submit_attempt_inner(
        &self,
        attempt_id: &str,
        caller: &Caller,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<AttemptResultResponse, AttemptError> {
        let attempt = self.store.find_attempt(attempt_id).await?.ok_or(AttemptError::NotFound)?;
        if attempt.learner_id != caller.user_id {
            return Err(AttemptError::Forbidden);
        }
        match attempt.status {
            AttemptStatus::Submitted => return Err(AttemptError::AlreadySubmitted),
            AttemptStatus::Expired => return Err(AttemptError::AttemptExpired),
            AttemptStatus::InProgress => {}
        }

        let now = self.clock.now();
        if self.is_past_deadline(&attempt, now) {
            if !self.expire(&attempt, now).await? {
                return Err(self.lost_race(attempt_id).await?);
            }
            return Err(AttemptError::AttemptExpired);
        }

        let definition = &attempt.definition.0;
        let order = &attempt.presentation.0;
        let translated: Vec<SubmittedAnswer> = answers
            .into_iter()
            .map(|answer| SubmittedAnswer {
                selected_answer_index: order
                    .to_original(&answer.question_id, answer.selected_answer_index),
                question_id: answer.question_id,
            })
            .collect();

        let sheet = scoring::score(&definition.questions, &translated)
            .map_err(|err| AttemptError::Validation(err.to_string()))?;

        let stored_answers: Vec<AttemptAnswer> = sheet
            .results
            .iter()
            .map(|result| AttemptAnswer {
                question_id: result.question_id.clone(),
                selected_answer_index: result.selected_answer_index,
                is_correct: result.is_correct,
            })
            .collect();
        let time_spent_seconds = attempt_timing::elapsed_seconds(attempt.started_at, now);
        let is_passed = sheet.score >= definition.passing_score;

        let finished = self
            .store
            .finish_if_unsubmitted(
                &attempt.id,
                FinishAttempt {
                    submitted_at: now,
                    time_spent_seconds,
                    score: sheet.score,
                    is_passed,
                    answers: &stored_answers,
                },
            )
            .await?;
        if !finished {
            return Err(self.lost_race(attempt_id).await?);
        }

        tracing::info!(
            attempt_id = %attempt.id,
            quiz_id = %attempt.quiz_id,
            learner_id = %attempt.learner_id,
            score = sheet.score,
            is_passed,
            time_spent_seconds,
            "Quiz attempt submitted"
        );
        metrics::counter!("quiz_attempts_submitted_total", "passed" => is_passed.to_string())
            .increment(1);

        let submitted = Attempt {
            status: AttemptStatus::Submitted,
            submitted_at: Some(now),
            time_spent_seconds: Some(time_spent_seconds),
            score: Some(sheet.score),
            is_passed: Some(is_passed),
            answers: Json(stored_answers),
            updated_at: now,
            ..attempt
        };
        let reveal = submitted.definition.show_correct_answers;
        result_response(&submitted, reveal).ok_or(AttemptError::NotFound)
    }

    async fn attempt_details_inner(
        &self,
        attempt_id: &str,
        caller: &Caller,
    ) -> Result<AttemptDetailResponse, AttemptError> {
        let mut attempt =
            self.store.find_attempt(attempt_id).await?.ok_or(AttemptError::NotFound)?;

        let is_owner = attempt.learner_id == caller.user_id;
        let is_staff = self.is_course_staff(caller, &attempt.course_id).await?;
        if !is_owner && !is_staff {
            return Err(AttemptError::Forbidden);
        }

        let now = self.clock.now();
        if attempt.status == AttemptStatus::InProgress && self.is_past_deadline(&attempt, now) {
            self.expire(&attempt, now).await?;
            attempt = self
                .store
                .find_attempt(attempt_id)
                .await?
                .ok_or(AttemptError::AttemptExpired)?;
        }

        let quiz = (attempt.status == AttemptStatus::InProgress)
            .then(|| presentation::render(&attempt.definition, &attempt.presentation));
        let reveal = is_staff || attempt.definition.show_correct_answers;
        let result = result_response(&attempt, reveal);

        Ok(AttemptDetailResponse { attempt: AttemptSummary::from(&attempt), quiz, result })
    }

    async fn list_attempts_inner(
        &self,
        query: ListAttemptsQuery,
        caller: &Caller,
    ) -> Result<PaginatedResponse<AttemptSummary>, AttemptError> {
        let (skip, limit) = clamp_page(query.skip, query.limit);
        let mut filter = AttemptFilter {
            quiz_id: query.quiz_id,
            learner_id: query.learner_id,
            course_owner_id: None,
            status: query.status,
            skip,
            limit,
        };

        match caller.role {
            CallerRole::Learner => {
                if filter.learner_id.as_deref().is_some_and(|id| id != caller.user_id) {
                    return Err(AttemptError::Forbidden);
                }
                filter.learner_id = Some(caller.user_id.clone());
            }
            CallerRole::Instructor => filter.course_owner_id = Some(caller.user_id.clone()),
            CallerRole::Admin => {}
        }

        let attempts = self.store.list_attempts(&filter).await?;
        let total_count = self.store.count_attempts(&filter).await?;

        Ok(PaginatedResponse {
            items: attempts.iter().map(AttemptSummary::from).collect(),
            total_count,
            skip: filter.skip,
            limit: filter.limit,
        })
    }

    async fn load_quiz(&self, quiz_id: &str) -> Result<QuizDefinition, AttemptError> {
        self.catalog.quiz_definition(quiz_id).await?.ok_or(AttemptError::NotFound)
    }

    async fn ensure_enrolled(&self, caller: &Caller, course_id: &str) -> Result<(), AttemptError> {
        if self.enrollments.is_enrolled(&caller.user_id, course_id).await? {
            Ok(())
        } else {
            Err(AttemptError::NotEnrolled)
        }
    }

    async fn is_course_staff(&self, caller: &Caller, course_id: &str) -> Result<bool, AttemptError> {
        match caller.role {
            CallerRole::Admin => Ok(true),
            CallerRole::Instructor => {
                let owner = self.catalog.course_owner(course_id).await?;
                Ok(owner.as_deref() == Some(caller.user_id.as_str()))
            }
            CallerRole::Learner => Ok(false),
        }
    }

    async fn history(
        &self,
        learner_id: &str,
        quiz_id: &str,
        has_unsubmitted_attempt: bool,
    ) -> Result<AttemptHistory, AttemptError> {
        let submitted_attempts = self.store.count_submitted(learner_id, quiz_id).await?;
        Ok(AttemptHistory { submitted_attempts, has_unsubmitted_attempt })
    }

    /// The learner's in-progress attempt, after expiring it if it ran out of time.
    async fn live_unsubmitted(
        &self,
        learner_id: &str,
        quiz_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<Option<Attempt>, AttemptError> {
        let Some(attempt) = self.store.find_unsubmitted(learner_id, quiz_id).await? else {
            return Ok(None);
        };
        if self.is_past_deadline(&attempt, now) {
            self.expire(&attempt, now).await?;
            return Ok(None);
        }
        Ok(Some(attempt))
    }

    fn is_past_deadline(&self, attempt: &Attempt, now: PrimitiveDateTime) -> bool {
        attempt_timing::is_past_deadline(
            attempt.started_at,
            attempt.definition.time_limit_minutes,
            self.policy.grace_period_seconds,
            now,
        )
    }

    async fn expire(&self, attempt: &Attempt, now: PrimitiveDateTime) -> Result<bool, AttemptError> {
        let policy = self.policy.expired_attempts;
        let changed = match policy {
            ExpiredAttemptPolicy::Retain => {
                self.store.expire_if_unsubmitted(&attempt.id, now).await?
            }
            ExpiredAttemptPolicy::Delete => self.store.delete_attempt(&attempt.id).await?,
        };

        if changed {
            tracing::info!(
                attempt_id = %attempt.id,
                quiz_id = %attempt.quiz_id,
                learner_id = %attempt.learner_id,
                policy = policy.as_str(),
                "Quiz attempt expired"
            );
            metrics::counter!("quiz_attempts_expired_total", "policy" => policy.as_str())
                .increment(1);
        }
        Ok(changed)
    }

    /// Explains why a compare-and-swap on an in-progress attempt found nothing to change.
    async fn lost_race(&self, attempt_id: &str) -> Result<AttemptError, AttemptError> {
        let current = self.store.find_attempt(attempt_id).await?;
        Ok(match current.map(|attempt| attempt.status) {
            Some(AttemptStatus::Submitted) => AttemptError::AlreadySubmitted,
            _ => AttemptError::AttemptExpired,
        })
    }
}

fn snapshot_digest(quiz: &QuizDefinition) -> Result<String, StoreError> {
    let encoded = serde_json::to_vec(quiz)?;
    Ok(hex::encode(Sha256::digest(&encoded)))
}

/// Graded view of a submitted attempt, with option indices in the order the
/// learner saw them.
fn result_response(attempt: &Attempt, reveal: bool) -> Option<AttemptResultResponse> {
    let submitted_at = attempt.submitted_at?;
    let score = attempt.score?;
    let definition = &attempt.definition.0;
    let order: &PresentationOrder = &attempt.presentation.0;

    let results: Vec<QuestionResultResponse> = attempt
        .answers
        .iter()
        .map(|answer| {
            let correct = definition
                .questions
                .iter()
                .find(|question| question.id == answer.question_id)
                .map(|question| order.to_displayed(&question.id, question.correct_answer_index));
            QuestionResultResponse {
                question_id: answer.question_id.clone(),
                selected_answer_index: order
                    .to_displayed(&answer.question_id, answer.selected_answer_index),
                is_correct: answer.is_correct,
                correct_answer_index: if reveal { correct } else { None },
            }
        })
        .collect();

    Some(AttemptResultResponse {
        attempt_id: attempt.id.clone(),
        quiz_id: attempt.quiz_id.clone(),
        learner_id: attempt.learner_id.clone(),
        score,
        is_passed: attempt.is_passed.unwrap_or(score >= definition.passing_score),
        passing_score: definition.passing_score,
        correct_answers: results.iter().filter(|result| result.is_correct).count(),
        total_questions: definition.questions.len(),
        started_at: format_primitive(attempt.started_at),
        submitted_at: format_primitive(submitted_at),
        time_spent_seconds: attempt.time_spent_seconds.unwrap_or_default(),
        show_correct_answers: definition.show_correct_answers,
        results,
    })
}
