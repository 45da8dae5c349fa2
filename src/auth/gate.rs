//! Request-time authorization gate.

use crate::auth::Principal;
use crate::auth::policy::PolicyEvaluator;
use crate::db::handlers::ProjectRecord;
use crate::errors::{Error, Result};
use crate::types::{Action, SubResource};
use std::sync::Arc;
use tracing::instrument;

/// Decides whether the acting principal may perform an action on a project
/// or one of its subresources. Pure decision, no side effects; evaluated
/// before any mutating or disclosing work so requests fail fast.
#[derive(Clone)]
pub struct AccessGate {
    policy: Arc<dyn PolicyEvaluator>,
}

impl AccessGate {
    pub fn new(policy: Arc<dyn PolicyEvaluator>) -> Self {
        Self { policy }
    }

    /// Whether the principal holds `action` on `resource` within the project.
    #[instrument(skip(self, principal, project), fields(project_id = project.project_id), err)]
    pub async fn allowed(&self, principal: &Principal, project: &ProjectRecord, action: Action, resource: SubResource) -> Result<bool> {
        // Administrators and the solution identity bypass per-project policy.
        if principal.is_sys_admin() || principal.is_solution() {
            return Ok(true);
        }

        // Public projects are readable without membership, authenticated or not.
        if action == Action::Read && resource == SubResource::Project && project.is_public() {
            return Ok(true);
        }

        match principal.username() {
            Some(username) => self.policy.has_project_permission(username, project.project_id, action, resource).await,
            None => Ok(false),
        }
    }

    /// Like [`allowed`](Self::allowed) but short-circuits into the error
    /// taxonomy: anonymous callers get 401, authenticated ones 403.
    pub async fn require(&self, principal: &Principal, project: &ProjectRecord, action: Action, resource: SubResource) -> Result<()> {
        if self.allowed(principal, project, action, resource).await? {
            return Ok(());
        }
        if !principal.is_authenticated() {
            Err(Error::Unauthenticated { message: None })
        } else {
            Err(Error::Forbidden { action, resource })
        }
    }
}
