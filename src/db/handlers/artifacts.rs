//! Postgres implementation of the subordinate-resource counters.

use crate::db::errors::Result;
use crate::db::handlers::ArtifactCounter;
use crate::types::ProjectId;
use sqlx::PgPool;
use tracing::instrument;

pub struct PgArtifacts {
    pool: PgPool,
}

impl PgArtifacts {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ArtifactCounter for PgArtifacts {
    #[instrument(skip(self), err)]
    async fn repository_count(&self, project_ids: &[ProjectId]) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM repositories WHERE project_id = ANY($1)")
            .bind(project_ids)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    #[instrument(skip(self), err)]
    async fn chart_count(&self, project_name: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM charts WHERE project_name = $1")
            .bind(project_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
