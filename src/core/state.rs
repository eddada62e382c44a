use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::services::attempts::AttemptEngine;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    engine: AttemptEngine,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, engine: AttemptEngine) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, engine }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn engine(&self) -> &AttemptEngine {
        &self.inner.engine
    }
}
