//! Policy evaluation boundary and the shipped role-matrix implementation.

use crate::db::handlers::MemberDirectory;
use crate::errors::Result;
use crate::project::roles::ProjectRole;
use crate::types::{Action, ProjectId, SubResource};
use std::sync::Arc;
use tracing::instrument;

/// Contract the access gate requires from the RBAC policy evaluator.
///
/// The evaluator answers one question: does `username` hold `action` on
/// `resource` within the project. How it arrives at the answer (role
/// matrices, compiled policies, an external PDP) is its own business.
#[async_trait::async_trait]
pub trait PolicyEvaluator: Send + Sync {
    async fn has_project_permission(&self, username: &str, project_id: ProjectId, action: Action, resource: SubResource) -> Result<bool>;
}

/// Permissions granted by one project role.
///
/// ProjectAdmin holds everything. Master manages the project short of
/// deleting it and sees quota. Developer and Guest read the project and its
/// member list. LimitedGuest sees only the project itself.
fn role_grants(role: ProjectRole, action: Action, resource: SubResource) -> bool {
    use Action::*;
    use SubResource::*;

    match role {
        ProjectRole::ProjectAdmin => true,
        ProjectRole::Master => matches!(
            (action, resource),
            (Read, Project) | (Update, Project) | (List, Member) | (Read, Quota)
        ),
        ProjectRole::Developer | ProjectRole::Guest => {
            matches!((action, resource), (Read, Project) | (List, Member))
        }
        ProjectRole::LimitedGuest => matches!((action, resource), (Read, Project)),
    }
}

/// Shipped evaluator: derives decisions from membership roles through the
/// fixed role→permission matrix above.
pub struct RoleMatrixPolicy {
    members: Arc<dyn MemberDirectory>,
}

impl RoleMatrixPolicy {
    pub fn new(members: Arc<dyn MemberDirectory>) -> Self {
        Self { members }
    }
}

#[async_trait::async_trait]
impl PolicyEvaluator for RoleMatrixPolicy {
    #[instrument(skip(self), err)]
    async fn has_project_permission(&self, username: &str, project_id: ProjectId, action: Action, resource: SubResource) -> Result<bool> {
        let roles = self.members.roles_of(username, project_id).await?;

        Ok(roles
            .iter()
            .filter_map(|id| ProjectRole::from_id(*id))
            .any(|role| role_grants(role, action, resource)))
    }
}
