//! Test utilities: in-memory collaborator fakes and server builders.

use crate::AppState;
use crate::auth::policy::RoleMatrixPolicy;
use crate::db::errors::{DbError, Result as DbResult};
use crate::db::handlers::{ArtifactCounter, MemberDirectory, ProjectChanges, ProjectCreate, ProjectFilter, ProjectRecord, ProjectStore};
use crate::errors::{Error, Result};
use crate::events::{EventPublisher, ProjectEvent};
use crate::quota::{QuotaEngine, QuotaRecord, ResourceList, validate_hard_limits};
use crate::types::{ProjectId, QuotaId};
use axum_test::TestServer;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// In-memory project store, membership directory and artifact counter.
///
/// One struct carries all three concerns so a test can seed projects,
/// members and counts against the same state.
#[derive(Default)]
pub struct MemoryRegistry {
    inner: Mutex<RegistryState>,
    /// When set, the artifact counters fail; models an unavailable catalog
    pub fail_artifact_counts: std::sync::atomic::AtomicBool,
}

#[derive(Default)]
struct RegistryState {
    projects: BTreeMap<ProjectId, ProjectRecord>,
    next_id: ProjectId,
    // (project_id, username) -> roles
    members: HashMap<(ProjectId, String), Vec<i32>>,
    repo_counts: HashMap<ProjectId, i64>,
    chart_counts: HashMap<String, i64>,
}

impl MemoryRegistry {
    pub fn add_member(&self, project_id: ProjectId, username: &str, role: i32) {
        let mut state = self.inner.lock().unwrap();
        state.members.entry((project_id, username.to_string())).or_default().push(role);
    }

    pub fn set_repo_count(&self, project_id: ProjectId, count: i64) {
        self.inner.lock().unwrap().repo_counts.insert(project_id, count);
    }

    pub fn set_chart_count(&self, project_name: &str, count: i64) {
        self.inner.lock().unwrap().chart_counts.insert(project_name.to_string(), count);
    }

    pub fn find_by_name(&self, name: &str) -> Option<ProjectRecord> {
        self.inner.lock().unwrap().projects.values().find(|p| p.name == name).cloned()
    }
}

#[async_trait::async_trait]
impl ProjectStore for MemoryRegistry {
    async fn create(&self, request: &ProjectCreate) -> DbResult<ProjectRecord> {
        let mut state = self.inner.lock().unwrap();
        if state.projects.values().any(|p| p.name == request.name) {
            return Err(DbError::UniqueViolation {
                constraint: Some("projects_name_key".to_string()),
                table: Some("projects".to_string()),
                message: format!("duplicate key value violates unique constraint on name {}", request.name),
            });
        }
        state.next_id += 1;
        let now = Utc::now();
        let record = ProjectRecord {
            project_id: state.next_id,
            name: request.name.clone(),
            owner_name: request.owner_name.clone(),
            metadata: request.metadata.clone(),
            cve_allowlist: request.cve_allowlist.clone(),
            created_at: now,
            updated_at: now,
        };
        state.projects.insert(record.project_id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: ProjectId) -> DbResult<Option<ProjectRecord>> {
        Ok(self.inner.lock().unwrap().projects.get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> DbResult<Option<ProjectRecord>> {
        Ok(self.inner.lock().unwrap().projects.values().find(|p| p.name == name).cloned())
    }

    async fn exists(&self, name: &str) -> DbResult<bool> {
        Ok(self.inner.lock().unwrap().projects.values().any(|p| p.name == name))
    }

    async fn update(&self, id: ProjectId, changes: &ProjectChanges) -> DbResult<bool> {
        let mut state = self.inner.lock().unwrap();
        match state.projects.get_mut(&id) {
            Some(record) => {
                record.metadata = changes.metadata.clone();
                record.cve_allowlist = changes.cve_allowlist.clone();
                record.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: ProjectId) -> DbResult<bool> {
        Ok(self.inner.lock().unwrap().projects.remove(&id).is_some())
    }

    async fn list(&self, filter: &ProjectFilter) -> DbResult<(Vec<ProjectRecord>, i64)> {
        let state = self.inner.lock().unwrap();
        let mut matches: Vec<ProjectRecord> = state
            .projects
            .values()
            .filter(|p| filter.name.as_deref().is_none_or(|n| p.name.contains(n)))
            .filter(|p| filter.owner.as_deref().is_none_or(|o| p.owner_name == o))
            .filter(|p| filter.public.is_none_or(|public| p.is_public() == public))
            .filter(|p| filter.project_ids.as_deref().is_none_or(|ids| ids.contains(&p.project_id)))
            .cloned()
            .collect();
        matches.sort_by_key(|p| std::cmp::Reverse(p.project_id));

        let total = matches.len() as i64;
        let offset = ((filter.page - 1) * filter.size).max(0) as usize;
        let page: Vec<ProjectRecord> = matches.into_iter().skip(offset).take(filter.size.max(0) as usize).collect();
        Ok((page, total))
    }

    async fn public_project_ids(&self) -> DbResult<Vec<ProjectId>> {
        let state = self.inner.lock().unwrap();
        Ok(state.projects.values().filter(|p| p.is_public()).map(|p| p.project_id).collect())
    }

    async fn member_project_ids(&self, username: &str) -> DbResult<Vec<ProjectId>> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .members
            .keys()
            .filter(|(_, member)| member == username)
            .map(|(project_id, _)| *project_id)
            .collect())
    }
}

#[async_trait::async_trait]
impl MemberDirectory for MemoryRegistry {
    async fn roles_of(&self, username: &str, project_id: ProjectId) -> DbResult<Vec<i32>> {
        let state = self.inner.lock().unwrap();
        Ok(state.members.get(&(project_id, username.to_string())).cloned().unwrap_or_default())
    }

    async fn count_with_role(&self, project_id: ProjectId, role: i32) -> DbResult<i64> {
        let state = self.inner.lock().unwrap();
        Ok(state
            .members
            .iter()
            .filter(|((id, _), roles)| *id == project_id && roles.contains(&role))
            .count() as i64)
    }
}

#[async_trait::async_trait]
impl ArtifactCounter for MemoryRegistry {
    async fn repository_count(&self, project_ids: &[ProjectId]) -> DbResult<i64> {
        if self.fail_artifact_counts.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(DbError::Other(anyhow::anyhow!("artifact catalog unavailable")));
        }
        let state = self.inner.lock().unwrap();
        Ok(project_ids.iter().map(|id| state.repo_counts.get(id).copied().unwrap_or(0)).sum())
    }

    async fn chart_count(&self, project_name: &str) -> DbResult<i64> {
        if self.fail_artifact_counts.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(DbError::Other(anyhow::anyhow!("artifact catalog unavailable")));
        }
        Ok(self.inner.lock().unwrap().chart_counts.get(project_name).copied().unwrap_or(0))
    }
}

/// In-memory quota engine keyed by reference ID.
#[derive(Default)]
pub struct MemoryQuota {
    records: Mutex<BTreeMap<ProjectId, QuotaRecord>>,
    next_id: Mutex<QuotaId>,
    /// When set, `create` fails; models an unavailable quota service
    pub fail_create: std::sync::atomic::AtomicBool,
    /// When set, `delete` fails
    pub fail_delete: std::sync::atomic::AtomicBool,
}

impl MemoryQuota {
    pub fn hard_limit_of(&self, reference_id: ProjectId) -> Option<ResourceList> {
        self.records.lock().unwrap().get(&reference_id).map(|r| r.hard.clone())
    }
}

#[async_trait::async_trait]
impl QuotaEngine for MemoryQuota {
    async fn create(&self, _reference: &str, reference_id: ProjectId, hard: ResourceList) -> Result<QuotaId> {
        if self.fail_create.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::Internal {
                operation: "create quota".to_string(),
            });
        }
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let id = *next;
        self.records.lock().unwrap().insert(
            reference_id,
            QuotaRecord {
                id,
                hard,
                used: ResourceList::new(),
            },
        );
        Ok(id)
    }

    async fn get_by_ref(&self, _reference: &str, reference_id: ProjectId) -> Result<Option<QuotaRecord>> {
        Ok(self.records.lock().unwrap().get(&reference_id).cloned())
    }

    async fn delete(&self, id: QuotaId) -> Result<()> {
        if self.fail_delete.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::Internal {
                operation: "delete quota".to_string(),
            });
        }
        self.records.lock().unwrap().retain(|_, record| record.id != id);
        Ok(())
    }

    async fn validate(&self, _reference: &str, hard: &ResourceList) -> Result<()> {
        validate_hard_limits(hard)
    }
}

/// Publisher that records events for assertions.
#[derive(Default)]
pub struct CapturingPublisher {
    events: Mutex<Vec<ProjectEvent>>,
}

impl CapturingPublisher {
    pub fn events(&self) -> Vec<ProjectEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl EventPublisher for CapturingPublisher {
    async fn publish(&self, event: ProjectEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub fn create_test_config() -> crate::Config {
    let mut config = crate::Config::default();
    config.auth.solution_secret = Some("test-solution-secret".to_string());
    config
}

/// Fake collaborators plus the state built over them.
pub struct TestHarness {
    pub registry: Arc<MemoryRegistry>,
    pub quota: Arc<MemoryQuota>,
    pub events: Arc<CapturingPublisher>,
    pub state: AppState,
}

pub fn create_test_harness(config: crate::Config) -> TestHarness {
    let registry = Arc::new(MemoryRegistry::default());
    let quota = Arc::new(MemoryQuota::default());
    let events = Arc::new(CapturingPublisher::default());

    let members: Arc<dyn MemberDirectory> = registry.clone();
    let state = AppState::builder()
        .config(config)
        .projects(registry.clone())
        .members(members.clone())
        .artifacts(registry.clone())
        .quotas(quota.clone())
        .events(events.clone())
        .policy(Arc::new(RoleMatrixPolicy::new(members)))
        .build();

    TestHarness {
        registry,
        quota,
        events,
        state,
    }
}

pub fn create_test_server(state: AppState) -> TestServer {
    TestServer::new(crate::build_router(state)).expect("Failed to create test server")
}

/// Identity headers for an ordinary local user.
pub fn user_headers(server_request: axum_test::TestRequest, username: &str) -> axum_test::TestRequest {
    server_request.add_header("x-regctl-user", username)
}

/// Identity headers for a system administrator.
pub fn admin_headers(server_request: axum_test::TestRequest, username: &str) -> axum_test::TestRequest {
    server_request.add_header("x-regctl-user", username).add_header("x-regctl-admin", "true")
}

/// Identity headers for a robot account.
pub fn robot_headers(server_request: axum_test::TestRequest, username: &str) -> axum_test::TestRequest {
    server_request
        .add_header("x-regctl-user", username)
        .add_header("x-regctl-principal-kind", "robot")
}

/// Identity headers for the solution principal.
pub fn solution_headers(server_request: axum_test::TestRequest) -> axum_test::TestRequest {
    server_request.add_header("x-regctl-solution-secret", "test-solution-secret")
}
