use std::sync::Arc;

use sqlx::PgPool;

use crate::core::config::Settings;
use crate::core::time::{Clock, SystemClock};
use crate::grading::GradingPolicy;
use crate::services::attempts::AttemptService;
use crate::services::catalog::PgQuizCatalog;
use crate::services::stats::PgStatsSink;
use crate::store::postgres::PgAttemptStore;
use crate::store::AttemptStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn AttemptStore>,
    clock: Arc<dyn Clock>,
    attempts: AttemptService,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool) -> Self {
        let store: Arc<dyn AttemptStore> = Arc::new(PgAttemptStore::new(db.clone()));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let policy = GradingPolicy {
            fuzzy_threshold: settings.grading().fuzzy_threshold,
            numeric_tolerance: settings.grading().numeric_tolerance,
        };
        let attempts = AttemptService::new(
            Arc::clone(&store),
            Arc::new(PgQuizCatalog::new(db.clone())),
            Arc::new(PgStatsSink::new(db)),
            Arc::clone(&clock),
            policy,
        );

        Self { inner: Arc::new(InnerState { settings, store, clock, attempts }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &Arc<dyn AttemptStore> {
        &self.inner.store
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    pub(crate) fn attempts(&self) -> &AttemptService {
        &self.inner.attempts
    }
}
