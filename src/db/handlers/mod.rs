//! Collaborator traits for the stores the lifecycle controller consumes,
//! their record types, and the Postgres implementations.
//!
//! Each trait is object-safe and held in the application state as an
//! `Arc<dyn _>`, so tests can substitute in-memory fakes without a database.

pub mod artifacts;
pub mod members;
pub mod projects;
pub mod quotas;

pub use artifacts::PgArtifacts;
pub use members::PgMembers;
pub use projects::PgProjects;
pub use quotas::PgQuotas;

use crate::db::errors::Result;
use crate::project::CveAllowList;
use crate::types::ProjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A project row as owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: ProjectId,
    pub name: String,
    pub owner_name: String,
    pub metadata: HashMap<String, String>,
    pub cve_allowlist: Option<CveAllowList>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    pub fn is_public(&self) -> bool {
        crate::project::is_public(&self.metadata)
    }
}

/// Request to create a project row.
#[derive(Debug, Clone)]
pub struct ProjectCreate {
    pub name: String,
    pub owner_name: String,
    pub metadata: HashMap<String, String>,
    pub cve_allowlist: Option<CveAllowList>,
}

/// Mutable fields of a project row. Name and owner are immutable by
/// omission.
#[derive(Debug, Clone)]
pub struct ProjectChanges {
    pub metadata: HashMap<String, String>,
    pub cve_allowlist: Option<CveAllowList>,
}

/// Filter for the paginated list query.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Case-sensitive substring match on the project name
    pub name: Option<String>,
    /// Exact match on the owner
    pub owner: Option<String>,
    /// Filter on the public flag
    pub public: Option<bool>,
    /// Restrict to these IDs (visibility set); `None` means unrestricted
    pub project_ids: Option<Vec<ProjectId>>,
    /// 1-based page number
    pub page: i64,
    /// Page size
    pub size: i64,
}

/// Project row persistence.
#[async_trait::async_trait]
pub trait ProjectStore: Send + Sync {
    /// Insert a project row; the store assigns the ID. A racing insert of
    /// the same name surfaces as a unique violation.
    async fn create(&self, request: &ProjectCreate) -> Result<ProjectRecord>;

    async fn get(&self, id: ProjectId) -> Result<Option<ProjectRecord>>;

    async fn get_by_name(&self, name: &str) -> Result<Option<ProjectRecord>>;

    async fn exists(&self, name: &str) -> Result<bool>;

    /// Update the mutable fields. Returns `false` when the row is gone.
    async fn update(&self, id: ProjectId, changes: &ProjectChanges) -> Result<bool>;

    /// Delete the row. Returns `false` when the row is gone.
    async fn delete(&self, id: ProjectId) -> Result<bool>;

    /// Paginated listing; returns the page plus the total match count.
    async fn list(&self, filter: &ProjectFilter) -> Result<(Vec<ProjectRecord>, i64)>;

    /// IDs of all public projects.
    async fn public_project_ids(&self) -> Result<Vec<ProjectId>>;

    /// IDs of projects where `username` holds an explicit membership.
    async fn member_project_ids(&self, username: &str) -> Result<Vec<ProjectId>>;
}

/// Project membership lookups.
#[async_trait::async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Role identifiers `username` holds in the project.
    async fn roles_of(&self, username: &str, project_id: ProjectId) -> Result<Vec<i32>>;

    /// Number of members holding exactly `role` in the project.
    async fn count_with_role(&self, project_id: ProjectId, role: i32) -> Result<i64>;
}

/// Subordinate-resource counters used for deletability and derived counts.
#[async_trait::async_trait]
pub trait ArtifactCounter: Send + Sync {
    /// Total repositories across the given projects.
    async fn repository_count(&self, project_ids: &[ProjectId]) -> Result<i64>;

    /// Helm charts stored under the project's namespace.
    async fn chart_count(&self, project_name: &str) -> Result<i64>;
}
