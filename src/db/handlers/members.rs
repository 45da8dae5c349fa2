//! Postgres implementation of the member directory.

use crate::db::errors::Result;
use crate::db::handlers::MemberDirectory;
use crate::types::ProjectId;
use sqlx::PgPool;
use tracing::instrument;

pub struct PgMembers {
    pool: PgPool,
}

impl PgMembers {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MemberDirectory for PgMembers {
    #[instrument(skip(self), err)]
    async fn roles_of(&self, username: &str, project_id: ProjectId) -> Result<Vec<i32>> {
        let roles = sqlx::query_scalar::<_, i32>("SELECT role FROM project_members WHERE username = $1 AND project_id = $2")
            .bind(username)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(roles)
    }

    #[instrument(skip(self), err)]
    async fn count_with_role(&self, project_id: ProjectId, role: i32) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND role = $2")
            .bind(project_id)
            .bind(role)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
