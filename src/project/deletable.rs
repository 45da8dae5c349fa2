//! Deletion precondition check.

use crate::db::handlers::ArtifactCounter;
use crate::errors::Result;
use crate::types::ProjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

/// Outcome of a deletability check. `message` names the first blocking
/// subordinate resource when `deletable` is false.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Deletability {
    pub deletable: bool,
    pub message: String,
}

impl Deletability {
    fn blocked(message: &str) -> Self {
        Self {
            deletable: false,
            message: message.to_string(),
        }
    }

    fn ok() -> Self {
        Self {
            deletable: true,
            message: String::new(),
        }
    }
}

/// Determines whether a project may be deleted.
///
/// Checks run sequentially and short-circuit: the counters are cheap and
/// the first blocking reason is the one users should see. The chart check
/// only runs when a chart storage subsystem is configured.
pub struct DeletabilityChecker {
    artifacts: Arc<dyn ArtifactCounter>,
    with_chart_service: bool,
}

impl DeletabilityChecker {
    pub fn new(artifacts: Arc<dyn ArtifactCounter>, with_chart_service: bool) -> Self {
        Self {
            artifacts,
            with_chart_service,
        }
    }

    #[instrument(skip(self, project_name), err)]
    pub async fn check(&self, project_id: ProjectId, project_name: &str) -> Result<Deletability> {
        let repo_count = self.artifacts.repository_count(&[project_id]).await?;
        if repo_count > 0 {
            return Ok(Deletability::blocked("the project contains repositories, can not be deleted"));
        }

        if self.with_chart_service {
            let chart_count = self.artifacts.chart_count(project_name).await?;
            if chart_count > 0 {
                return Ok(Deletability::blocked("the project contains helm charts, can not be deleted"));
            }
        }

        Ok(Deletability::ok())
    }
}
