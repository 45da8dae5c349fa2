//! Postgres implementation of the project store.

use crate::db::errors::Result;
use crate::db::handlers::{ProjectChanges, ProjectCreate, ProjectFilter, ProjectRecord, ProjectStore};
use crate::project::CveAllowList;
use crate::types::ProjectId;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;

const SELECT_COLUMNS: &str = "project_id, name, owner_name, metadata, cve_allowlist, created_at, updated_at";

// Database row model
#[derive(Debug, Clone, FromRow)]
struct ProjectRow {
    project_id: i64,
    name: String,
    owner_name: String,
    metadata: Json<HashMap<String, String>>,
    cve_allowlist: Option<Json<CveAllowList>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for ProjectRecord {
    fn from(row: ProjectRow) -> Self {
        Self {
            project_id: row.project_id,
            name: row.name,
            owner_name: row.owner_name,
            metadata: row.metadata.0,
            cve_allowlist: row.cve_allowlist.map(|j| j.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct PgProjects {
    pool: PgPool,
}

impl PgProjects {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the filter's WHERE clauses to a query builder.
fn apply_filter<'a>(qb: &mut QueryBuilder<'a, Postgres>, filter: &'a ProjectFilter) {
    let mut first = true;
    let mut sep = |qb: &mut QueryBuilder<'a, Postgres>| {
        qb.push(if std::mem::take(&mut first) { " WHERE " } else { " AND " });
    };

    if let Some(name) = &filter.name {
        sep(qb);
        qb.push("name LIKE '%' || ").push_bind(name).push(" || '%'");
    }
    if let Some(owner) = &filter.owner {
        sep(qb);
        qb.push("owner_name = ").push_bind(owner);
    }
    if let Some(public) = filter.public {
        sep(qb);
        qb.push("metadata->>'public' = ").push_bind(if public { "true" } else { "false" });
    }
    if let Some(ids) = &filter.project_ids {
        sep(qb);
        qb.push("project_id = ANY(").push_bind(ids).push(")");
    }
}

#[async_trait::async_trait]
impl ProjectStore for PgProjects {
    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&self, request: &ProjectCreate) -> Result<ProjectRecord> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "INSERT INTO projects (name, owner_name, metadata, cve_allowlist)
             VALUES ($1, $2, $3, $4)
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(&request.name)
        .bind(&request.owner_name)
        .bind(Json(&request.metadata))
        .bind(request.cve_allowlist.as_ref().map(Json))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[instrument(skip(self), err)]
    async fn get(&self, id: ProjectId) -> Result<Option<ProjectRecord>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!("SELECT {SELECT_COLUMNS} FROM projects WHERE project_id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self), err)]
    async fn get_by_name(&self, name: &str) -> Result<Option<ProjectRecord>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!("SELECT {SELECT_COLUMNS} FROM projects WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self), err)]
    async fn exists(&self, name: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM projects WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    #[instrument(skip(self, changes), err)]
    async fn update(&self, id: ProjectId, changes: &ProjectChanges) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE projects
             SET metadata = $2, cve_allowlist = $3, updated_at = NOW()
             WHERE project_id = $1",
        )
        .bind(id)
        .bind(Json(&changes.metadata))
        .bind(changes.cve_allowlist.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, id: ProjectId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE project_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, filter), fields(page = filter.page, size = filter.size), err)]
    async fn list(&self, filter: &ProjectFilter) -> Result<(Vec<ProjectRecord>, i64)> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM projects");
        apply_filter(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {SELECT_COLUMNS} FROM projects"));
        apply_filter(&mut qb, filter);
        qb.push(" ORDER BY project_id DESC LIMIT ")
            .push_bind(filter.size)
            .push(" OFFSET ")
            .push_bind((filter.page - 1) * filter.size);

        let rows = qb.build_query_as::<ProjectRow>().fetch_all(&self.pool).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    #[instrument(skip(self), err)]
    async fn public_project_ids(&self) -> Result<Vec<ProjectId>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT project_id FROM projects WHERE metadata->>'public' = 'true'")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    #[instrument(skip(self), err)]
    async fn member_project_ids(&self, username: &str) -> Result<Vec<ProjectId>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT DISTINCT project_id FROM project_members WHERE username = $1")
            .bind(username)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }
}
