use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use time::PrimitiveDateTime;

use crate::db::models::{Attempt, QuizDefinition};
use crate::repositories;
use crate::repositories::attempts::{AttemptFilter, FinishAttempt};

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("quiz snapshot could not be encoded: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Read side of the quiz catalog.
#[async_trait]
pub(crate) trait QuizCatalog: Send + Sync {
    /// `None` for unknown or soft-deleted quizzes.
    async fn quiz_definition(&self, quiz_id: &str) -> Result<Option<QuizDefinition>, StoreError>;

    async fn course_owner(&self, course_id: &str) -> Result<Option<String>, StoreError>;
}

#[async_trait]
pub(crate) trait EnrollmentDirectory: Send + Sync {
    async fn is_enrolled(&self, learner_id: &str, course_id: &str) -> Result<bool, StoreError>;
}

/// Attempt persistence. The `*_if_unsubmitted` operations are compare-and-swap
/// on the in-progress state and report whether this call won.
#[async_trait]
pub(crate) trait AttemptStore: Send + Sync {
    /// `false` when the learner already holds an in-progress attempt for the quiz.
    async fn create_attempt(&self, attempt: &Attempt) -> Result<bool, StoreError>;

    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<Attempt>, StoreError>;

    async fn find_unsubmitted(
        &self,
        learner_id: &str,
        quiz_id: &str,
    ) -> Result<Option<Attempt>, StoreError>;

    async fn count_submitted(&self, learner_id: &str, quiz_id: &str) -> Result<i64, StoreError>;

    async fn finish_if_unsubmitted(
        &self,
        attempt_id: &str,
        outcome: FinishAttempt<'_>,
    ) -> Result<bool, StoreError>;

    async fn expire_if_unsubmitted(
        &self,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<bool, StoreError>;

    async fn delete_attempt(&self, attempt_id: &str) -> Result<bool, StoreError>;

    async fn list_attempts(&self, filter: &AttemptFilter) -> Result<Vec<Attempt>, StoreError>;

    async fn count_attempts(&self, filter: &AttemptFilter) -> Result<i64, StoreError>;
}

/// Postgres implementation of every collaborator the engine needs.
#[derive(Clone)]
pub(crate) struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizCatalog for PgBackend {
    async fn quiz_definition(&self, quiz_id: &str) -> Result<Option<QuizDefinition>, StoreError> {
        Ok(repositories::quizzes::load_definition(&self.pool, quiz_id).await?)
    }

    async fn course_owner(&self, course_id: &str) -> Result<Option<String>, StoreError> {
        Ok(repositories::courses::find_owner_id(&self.pool, course_id).await?)
    }
}

#[async_trait]
impl EnrollmentDirectory for PgBackend {
    async fn is_enrolled(&self, learner_id: &str, course_id: &str) -> Result<bool, StoreError> {
        Ok(repositories::courses::is_enrolled(&self.pool, learner_id, course_id).await?)
    }
}

#[async_trait]
impl AttemptStore for PgBackend {
    async fn create_attempt(&self, attempt: &Attempt) -> Result<bool, StoreError> {
        Ok(repositories::attempts::create(&self.pool, attempt).await?)
    }

    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<Attempt>, StoreError> {
        Ok(repositories::attempts::find_by_id(&self.pool, attempt_id).await?)
    }

    async fn find_unsubmitted(
        &self,
        learner_id: &str,
        quiz_id: &str,
    ) -> Result<Option<Attempt>, StoreError> {
        Ok(repositories::attempts::find_in_progress(&self.pool, learner_id, quiz_id).await?)
    }

    async fn count_submitted(&self, learner_id: &str, quiz_id: &str) -> Result<i64, StoreError> {
        Ok(repositories::attempts::count_submitted(&self.pool, learner_id, quiz_id).await?)
    }

    async fn finish_if_unsubmitted(
        &self,
        attempt_id: &str,
        outcome: FinishAttempt<'_>,
    ) -> Result<bool, StoreError> {
        Ok(repositories::attempts::finish_if_in_progress(&self.pool, attempt_id, outcome).await?)
    }

    async fn expire_if_unsubmitted(
        &self,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<bool, StoreError> {
        Ok(repositories::attempts::expire_if_in_progress(&self.pool, attempt_id, now).await?)
    }

    async fn delete_attempt(&self, attempt_id: &str) -> Result<bool, StoreError> {
        Ok(repositories::attempts::delete_if_in_progress(&self.pool, attempt_id).await?)
    }

    async fn list_attempts(&self, filter: &AttemptFilter) -> Result<Vec<Attempt>, StoreError> {
        Ok(repositories::attempts::list(&self.pool, filter).await?)
    }

    async fn count_attempts(&self, filter: &AttemptFilter) -> Result<i64, StoreError> {
        Ok(repositories::attempts::count(&self.pool, filter).await?)
    }
}
