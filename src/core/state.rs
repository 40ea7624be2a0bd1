use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle};
use crate::repositories::attempt_store::PgAttemptStore;
use crate::services::attempts::AttemptManager;
use crate::services::grading::Grader;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    grader: Grader,
}

impl AppState {
    pub(crate) fn new(settings: Settings, db: PgPool, redis: RedisHandle, grader: Grader) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, grader }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn attempts(&self) -> AttemptManager<PgAttemptStore> {
        AttemptManager::new(PgAttemptStore::new(self.db().clone()), self.inner.grader.clone())
    }
}
