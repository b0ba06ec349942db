use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::Quiz;
use crate::repositories;
use crate::store::StoreError;

/// Read-only lookup into the quiz definitions the authoring system owns.
#[async_trait]
pub(crate) trait QuizCatalog: Send + Sync {
    async fn find_by_id(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError>;
}

#[derive(Clone)]
pub(crate) struct PgQuizCatalog {
    pool: PgPool,
}

impl PgQuizCatalog {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizCatalog for PgQuizCatalog {
    async fn find_by_id(&self, quiz_id: &str) -> Result<Option<Quiz>, StoreError> {
        Ok(repositories::quizzes::find_by_id(&self.pool, quiz_id).await?)
    }
}
