//! Lifecycle orchestration for projects.
//!
//! [`ProjectLifecycleController`] is the single entry point the HTTP layer
//! calls into. It is request-scoped and cheap to build: it clones the shared
//! collaborator handles out of the application state together with a snapshot
//! of the project configuration, then sequences authentication, policy
//! checks, validation, persistence, quota bookkeeping and event publication
//! per operation.

use crate::AppState;
use crate::auth::Principal;
use crate::auth::gate::AccessGate;
use crate::db::handlers::{
    ArtifactCounter, MemberDirectory, ProjectChanges, ProjectCreate, ProjectFilter, ProjectRecord, ProjectStore,
};
use crate::errors::{Error, Result};
use crate::events::{EventPublisher, ProjectEvent};
use crate::project::deletable::{Deletability, DeletabilityChecker};
use crate::project::roles::{NO_ROLE, highest_role};
use crate::project::summary::{ProjectSummary, SummaryAggregator};
use crate::project::{CveAllowList, metadata, normalize_severity, validate_metadata, validate_name};
use crate::quota::{PROJECT_REFERENCE, QuotaLimitResolver};
use crate::types::{Action, ProjectId, SubResource};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};

/// Intent to create a project, after wire-level deserialization.
#[derive(Debug, Clone, Default)]
pub struct CreateProject {
    pub name: String,
    pub metadata: HashMap<String, String>,
    /// Legacy top-level public flag; folded into metadata when set
    pub public: Option<bool>,
    /// Requested storage hard limit in bytes; honored for administrators only
    pub storage_limit: Option<i64>,
    pub cve_allowlist: Option<CveAllowList>,
}

/// Intent to update a project. Name and owner are immutable.
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub metadata: HashMap<String, String>,
    pub cve_allowlist: Option<CveAllowList>,
}

/// List filter as understood by the lifecycle layer. The visibility
/// restriction is derived from the principal, not from these fields.
#[derive(Debug, Clone)]
pub struct ListProjects {
    pub name: Option<String>,
    pub owner: Option<String>,
    pub public: Option<bool>,
    pub page: i64,
    pub size: i64,
}

/// A project enriched with the per-request derived fields reads report.
#[derive(Debug, Clone)]
pub struct ProjectView {
    pub record: ProjectRecord,
    /// Highest role the requesting user holds, [`NO_ROLE`] when none
    pub current_user_role_id: i32,
    /// All roles the requesting user holds
    pub current_user_role_ids: Vec<i32>,
    pub repo_count: i64,
    /// Populated only when a chart storage subsystem is configured
    pub chart_count: Option<i64>,
}

pub struct ProjectLifecycleController {
    projects: Arc<dyn ProjectStore>,
    members: Arc<dyn MemberDirectory>,
    artifacts: Arc<dyn ArtifactCounter>,
    quotas: Arc<dyn crate::quota::QuotaEngine>,
    events: Arc<dyn EventPublisher>,
    gate: AccessGate,
    project_config: crate::config::ProjectConfig,
    anonymous_access_enabled: bool,
}

impl ProjectLifecycleController {
    pub fn new(state: &AppState) -> Self {
        Self {
            projects: state.projects.clone(),
            members: state.members.clone(),
            artifacts: state.artifacts.clone(),
            quotas: state.quotas.clone(),
            events: state.events.clone(),
            gate: AccessGate::new(state.policy.clone()),
            project_config: state.config.project.clone(),
            anonymous_access_enabled: state.config.auth.anonymous_access_enabled,
        }
    }

    /// Create a project and its quota reference. Returns the new record.
    #[instrument(skip(self, principal, request), fields(name = %request.name, operator = principal.username()), err)]
    pub async fn create(&self, principal: &Principal, request: CreateProject) -> Result<ProjectRecord> {
        if !principal.is_authenticated() {
            return Err(Error::Unauthenticated { message: None });
        }
        if self.project_config.only_admin_creation && !(principal.is_sys_admin() || principal.is_solution()) {
            return Err(Error::Forbidden {
                action: Action::Create,
                resource: SubResource::Project,
            });
        }

        validate_name(&request.name)?;

        // The legacy top-level flag backfills the metadata key only when the
        // key is absent; projects are private unless stated otherwise.
        let mut meta = request.metadata;
        if let Some(public) = request.public {
            meta.entry(metadata::PUBLIC.to_string()).or_insert_with(|| public.to_string());
        }
        meta.entry(metadata::PUBLIC.to_string()).or_insert_with(|| "false".to_string());
        validate_metadata(&meta)?;

        // Resolve and validate the hard limits before any write happens.
        let hard = if self.project_config.quota_per_project_enabled {
            let resolver = QuotaLimitResolver::new(self.quotas.as_ref());
            // Only a system administrator's requested limit is honored; the
            // solution identity is not an administrator here.
            Some(
                resolver
                    .resolve(request.storage_limit, self.project_config.storage_per_project, principal.is_sys_admin())
                    .await?,
            )
        } else {
            None
        };

        if self.projects.exists(&request.name).await? {
            return Err(Error::Conflict {
                message: format!("project {} already exists", request.name),
            });
        }

        // The solution identity has no user of its own; the platform admin
        // account becomes the owner of record.
        let owner = match principal.username() {
            Some(username) => username.to_string(),
            None => self.project_config.admin_username.clone(),
        };

        // A racing create of the same name surfaces here as a unique
        // violation and maps to 409.
        let record = self
            .projects
            .create(&ProjectCreate {
                name: request.name.clone(),
                owner_name: owner.clone(),
                metadata: meta,
                cve_allowlist: request.cve_allowlist,
            })
            .await?;

        if let Some(hard) = hard {
            if let Err(e) = self.quotas.create(PROJECT_REFERENCE, record.project_id, hard).await {
                // The row is committed; there is no compensation path.
                warn!(project_id = record.project_id, "failed to create quota for project: {e}");
                return Err(Error::Internal {
                    operation: format!("create quota for project {}", record.name),
                });
            }
        }

        self.events
            .publish(ProjectEvent::Created {
                project_id: record.project_id,
                project: record.name.clone(),
                operator: owner,
            })
            .await;

        Ok(record)
    }

    /// Existence probe by name. Any authenticated principal may probe.
    #[instrument(skip(self, principal), err)]
    pub async fn head(&self, principal: &Principal, name: &str) -> Result<()> {
        if !principal.is_authenticated() {
            return Err(Error::Unauthenticated { message: None });
        }
        if self.projects.exists(name).await? {
            Ok(())
        } else {
            Err(Error::NotFound {
                resource: "project".to_string(),
                id: name.to_string(),
            })
        }
    }

    /// Read one project with derived fields.
    #[instrument(skip(self, principal), err)]
    pub async fn get(&self, principal: &Principal, id: ProjectId) -> Result<ProjectView> {
        let record = self.resolve(id).await?;
        self.gate.require(principal, &record, Action::Read, SubResource::Project).await?;
        self.populate(principal, record).await
    }

    /// Replace the mutable fields of a project.
    #[instrument(skip(self, principal, request), err)]
    pub async fn update(&self, principal: &Principal, id: ProjectId, request: UpdateProject) -> Result<()> {
        let record = self.resolve(id).await?;
        self.gate.require(principal, &record, Action::Update, SubResource::Project).await?;

        // A payload that omits the public key must not strip it; the stored
        // value carries over, so visibility never changes by omission.
        let mut meta = request.metadata;
        if !meta.contains_key(metadata::PUBLIC) {
            let public = record
                .metadata
                .get(metadata::PUBLIC)
                .cloned()
                .unwrap_or_else(|| "false".to_string());
            meta.insert(metadata::PUBLIC.to_string(), public);
        }
        validate_metadata(&meta)?;

        let updated = self
            .projects
            .update(
                id,
                &ProjectChanges {
                    metadata: meta,
                    cve_allowlist: request.cve_allowlist,
                },
            )
            .await?;
        if !updated {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Delete a project, its quota reference, and publish the event.
    #[instrument(skip(self, principal), err)]
    pub async fn delete(&self, principal: &Principal, id: ProjectId) -> Result<()> {
        let record = self.resolve(id).await?;
        self.gate.require(principal, &record, Action::Delete, SubResource::Project).await?;

        let deletability = self.deletability_checker().check(id, &record.name).await?;
        if !deletability.deletable {
            return Err(Error::PreconditionFailed {
                message: deletability.message,
            });
        }

        let deleted = self.projects.delete(id).await?;
        if !deleted {
            return Err(not_found(id));
        }

        // The lookup runs regardless of the quota flag so references created
        // under an earlier configuration still get released.
        self.release_quota(id).await?;

        let operator = principal
            .username()
            .map(str::to_string)
            .unwrap_or_else(|| self.project_config.admin_username.clone());
        self.events
            .publish(ProjectEvent::Deleted {
                project_id: id,
                project: record.name,
                operator,
            })
            .await;

        Ok(())
    }

    /// Report whether a project could currently be deleted, without deleting.
    #[instrument(skip(self, principal), err)]
    pub async fn deletable(&self, principal: &Principal, id: ProjectId) -> Result<Deletability> {
        let record = self.resolve(id).await?;
        self.gate.require(principal, &record, Action::Delete, SubResource::Project).await?;
        self.deletability_checker().check(id, &record.name).await
    }

    /// Paginated listing restricted to the principal's visibility set.
    /// Returns the page plus the total match count.
    #[instrument(skip(self, principal, query), fields(page = query.page, size = query.size), err)]
    pub async fn list(&self, principal: &Principal, query: ListProjects) -> Result<(Vec<ProjectView>, i64)> {
        let project_ids = self.visibility_set(principal).await?;

        let filter = ProjectFilter {
            name: query.name,
            owner: query.owner,
            public: query.public,
            project_ids,
            page: query.page,
            size: query.size,
        };
        let (records, total) = self.projects.list(&filter).await?;

        let mut views = Vec::with_capacity(records.len());
        for record in records {
            views.push(self.populate(principal, record).await?);
        }
        Ok((views, total))
    }

    /// Aggregate the summary facts the principal is entitled to see.
    #[instrument(skip(self, principal), err)]
    pub async fn summary(&self, principal: &Principal, id: ProjectId) -> Result<ProjectSummary> {
        let record = self.resolve(id).await?;
        self.gate.require(principal, &record, Action::Read, SubResource::Project).await?;

        // The fact set is fixed before any fetch is launched.
        let include_quota = self.gate.allowed(principal, &record, Action::Read, SubResource::Quota).await?;
        let include_members = self.gate.allowed(principal, &record, Action::List, SubResource::Member).await?;

        // Base counts degrade to zero on failure; once gated, a summary
        // request only reports less, it does not fail.
        let repo_count = match self.artifacts.repository_count(&[id]).await {
            Ok(count) => count,
            Err(e) => {
                warn!(project_id = id, "failed to count repositories for summary: {e}");
                0
            }
        };
        let chart_count = match self.chart_count(&record.name).await {
            Ok(count) => count,
            Err(e) => {
                warn!(project_id = id, "failed to count charts for summary: {e}");
                self.project_config.with_chart_service.then_some(0)
            }
        };
        let base = ProjectSummary {
            repo_count,
            chart_count,
            ..Default::default()
        };

        let aggregator = SummaryAggregator::new(
            self.quotas.clone(),
            self.members.clone(),
            self.project_config.quota_per_project_enabled,
        );
        Ok(aggregator.aggregate(id, include_quota, include_members, base).await)
    }

    /// The set of project IDs the principal may see in listings. `None`
    /// means unrestricted.
    async fn visibility_set(&self, principal: &Principal) -> Result<Option<Vec<ProjectId>>> {
        if principal.is_sys_admin() || principal.is_solution() {
            return Ok(None);
        }

        if !principal.is_authenticated() {
            if !self.anonymous_access_enabled {
                return Err(Error::Unauthenticated { message: None });
            }
            return Ok(Some(self.projects.public_project_ids().await?));
        }

        let mut ids = self.projects.public_project_ids().await?;
        if principal.enumerates_memberships() {
            if let Some(username) = principal.username() {
                ids.extend(self.projects.member_project_ids(username).await?);
            }
        }
        ids.sort_unstable();
        ids.dedup();
        Ok(Some(ids))
    }

    /// Fetch the record or fail with 404. Resolution happens before any
    /// policy check so a missing project never reveals permission state.
    async fn resolve(&self, id: ProjectId) -> Result<ProjectRecord> {
        self.projects.get(id).await?.ok_or_else(|| not_found(id))
    }

    /// Attach the derived read-side fields to a record.
    async fn populate(&self, principal: &Principal, mut record: ProjectRecord) -> Result<ProjectView> {
        if let Some(severity) = record.metadata.get(metadata::SEVERITY) {
            let normalized = normalize_severity(severity);
            record.metadata.insert(metadata::SEVERITY.to_string(), normalized.to_string());
        }

        let mut role_ids = Vec::new();
        if principal.enumerates_memberships() {
            if let Some(username) = principal.username() {
                role_ids = self.members.roles_of(username, record.project_id).await?;
            }
        }
        let current_role = if role_ids.is_empty() { NO_ROLE } else { highest_role(&role_ids) };

        let repo_count = self.artifacts.repository_count(&[record.project_id]).await?;
        let chart_count = self.chart_count(&record.name).await?;

        Ok(ProjectView {
            record,
            current_user_role_id: current_role,
            current_user_role_ids: role_ids,
            repo_count,
            chart_count,
        })
    }

    async fn chart_count(&self, project_name: &str) -> Result<Option<i64>> {
        if !self.project_config.with_chart_service {
            return Ok(None);
        }
        Ok(Some(self.artifacts.chart_count(project_name).await?))
    }

    fn deletability_checker(&self) -> DeletabilityChecker {
        DeletabilityChecker::new(self.artifacts.clone(), self.project_config.with_chart_service)
    }

    /// Drop the project's quota reference. A failed lookup is tolerated;
    /// a failed delete of a known reference is not.
    async fn release_quota(&self, id: ProjectId) -> Result<()> {
        let record = match self.quotas.get_by_ref(PROJECT_REFERENCE, id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(project_id = id, "no quota reference found for deleted project");
                return Ok(());
            }
            Err(e) => {
                warn!(project_id = id, "failed to look up quota for deleted project: {e}");
                return Ok(());
            }
        };
        if let Err(e) = self.quotas.delete(record.id).await {
            warn!(project_id = id, quota_id = record.id, "failed to delete quota: {e}");
            return Err(Error::Internal {
                operation: format!("delete quota of project {id}"),
            });
        }
        Ok(())
    }
}

fn not_found(id: ProjectId) -> Error {
    Error::NotFound {
        resource: "project".to_string(),
        id: id.to_string(),
    }
}
