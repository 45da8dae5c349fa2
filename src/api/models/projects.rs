//! API request/response models for projects.

use super::pagination::Pagination;
use crate::db::handlers::ProjectRecord;
use crate::project::CveAllowList;
use crate::project::controller::ProjectView;
use crate::project::roles::NO_ROLE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

/// Request body for creating a new project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProjectRequest {
    /// Project name; lowercase alphanumerics with inner `.`, `_` or `-`
    #[schema(example = "library")]
    pub name: String,

    /// Free-form metadata; reserved keys are validated
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Legacy top-level public flag; used only when the metadata key is absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,

    /// Requested storage hard limit in bytes, -1 for unlimited.
    /// Honored for system administrators only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_limit: Option<i64>,

    /// Per-project CVE allow-list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cve_allowlist: Option<CveAllowList>,
}

/// Request body for updating a project. Name and owner are immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProjectUpdateRequest {
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cve_allowlist: Option<CveAllowList>,
}

/// Full project details returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    pub project_id: i64,
    pub name: String,
    pub owner_name: String,
    pub metadata: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cve_allowlist: Option<CveAllowList>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Highest role the requesting user holds; omitted when none
    #[serde(default, skip_serializing_if = "is_no_role")]
    pub current_user_role_id: i32,
    /// All roles the requesting user holds; omitted when empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub current_user_role_ids: Vec<i32>,
    pub repo_count: i64,
    /// Omitted when no chart storage subsystem is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_count: Option<i64>,
}

fn is_no_role(role: &i32) -> bool {
    *role == NO_ROLE
}

impl From<ProjectView> for ProjectResponse {
    fn from(view: ProjectView) -> Self {
        let ProjectRecord {
            project_id,
            name,
            owner_name,
            metadata,
            cve_allowlist,
            created_at,
            updated_at,
        } = view.record;
        Self {
            project_id,
            name,
            owner_name,
            metadata,
            cve_allowlist,
            created_at,
            updated_at,
            current_user_role_id: view.current_user_role_id,
            current_user_role_ids: view.current_user_role_ids,
            repo_count: view.repo_count,
            chart_count: view.chart_count,
        }
    }
}

/// Query parameters for listing projects.
///
/// `page` and `size` are declared inline rather than through a flattened
/// [`Pagination`]: serde's flatten buffers query-string values as strings,
/// which breaks numeric deserialization.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListProjectsQuery {
    /// 1-based page number (default: 1)
    #[param(default = 1, minimum = 1)]
    pub page: Option<i64>,

    /// Maximum number of items to return (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    pub size: Option<i64>,

    /// Substring match on the project name
    pub name: Option<String>,

    /// Exact match on the owner username
    pub owner: Option<String>,

    /// Filter on the public flag
    pub public: Option<bool>,
}

impl ListProjectsQuery {
    /// Clamped pagination parameters.
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            size: self.size,
        }
    }
}

/// Query parameters for the existence probe.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct HeadProjectQuery {
    /// Name of the project to probe for
    pub project_name: Option<String>,
}
