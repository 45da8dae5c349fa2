//! Postgres-backed implementation of the quota engine boundary.
//!
//! Only the reference bookkeeping the lifecycle controller needs lives here;
//! usage accounting belongs to the quota engine proper.

use crate::errors::Result;
use crate::quota::{QuotaEngine, QuotaRecord, ResourceList, validate_hard_limits};
use crate::types::{ProjectId, QuotaId};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

#[derive(Debug, FromRow)]
struct QuotaRow {
    id: i64,
    hard: Json<ResourceList>,
    used: Json<ResourceList>,
}

pub struct PgQuotas {
    pool: PgPool,
}

impl PgQuotas {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QuotaEngine for PgQuotas {
    #[instrument(skip(self, hard), err)]
    async fn create(&self, reference: &str, reference_id: ProjectId, hard: ResourceList) -> Result<QuotaId> {
        let empty_used: ResourceList = hard.keys().map(|kind| (*kind, 0)).collect();

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO quotas (reference, reference_id, hard, used)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(reference)
        .bind(reference_id)
        .bind(Json(&hard))
        .bind(Json(&empty_used))
        .fetch_one(&self.pool)
        .await
        .map_err(crate::db::errors::DbError::from)?;

        Ok(id)
    }

    #[instrument(skip(self), err)]
    async fn get_by_ref(&self, reference: &str, reference_id: ProjectId) -> Result<Option<QuotaRecord>> {
        let row = sqlx::query_as::<_, QuotaRow>("SELECT id, hard, used FROM quotas WHERE reference = $1 AND reference_id = $2")
            .bind(reference)
            .bind(reference_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(crate::db::errors::DbError::from)?;

        Ok(row.map(|r| QuotaRecord {
            id: r.id,
            hard: r.hard.0,
            used: r.used.0,
        }))
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: QuotaId) -> Result<()> {
        sqlx::query("DELETE FROM quotas WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(crate::db::errors::DbError::from)?;

        Ok(())
    }

    async fn validate(&self, _reference: &str, hard: &ResourceList) -> Result<()> {
        validate_hard_limits(hard)
    }
}
