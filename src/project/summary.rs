//! Concurrent project summary aggregation.
//!
//! A summary is a transient aggregate assembled fresh per request: base
//! artifact counts, quota usage, and per-role member counts. The base counts
//! are computed synchronously by the controller before this aggregator runs;
//! the permissioned facts (quota, membership) are independent units of work
//! with no data dependencies, so they are launched concurrently and joined
//! before the response is produced. Each unit writes one disjoint portion of
//! the summary, so no locking is involved. Failures degrade that portion to
//! its zero value instead of failing the request.

use crate::db::handlers::MemberDirectory;
use crate::project::roles::ProjectRole;
use crate::quota::{PROJECT_REFERENCE, QuotaEngine, ResourceList};
use crate::types::ProjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

/// Quota portion of a summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QuotaSummary {
    pub hard: ResourceList,
    pub used: ResourceList,
}

/// Transient, request-scoped project summary. Never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ProjectSummary {
    pub repo_count: i64,
    /// Present only when a chart storage subsystem is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_count: Option<i64>,
    /// Present only when the principal may read the project's quota
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaSummary>,
    pub project_admin_count: i64,
    pub master_count: i64,
    pub developer_count: i64,
    pub guest_count: i64,
    pub limited_guest_count: i64,
}

/// One completed fact-fetch. Each variant maps onto a disjoint portion of
/// the summary.
enum Fact {
    Quota(Option<QuotaSummary>),
    Members([i64; 5]),
}

/// Gathers the permissioned summary facts for one project concurrently and
/// merges them. The fact set is selected by the caller based on the
/// principal's sub-permissions; once launched, every fact runs to completion
/// (full join barrier, no cancellation).
pub struct SummaryAggregator {
    quotas: Arc<dyn QuotaEngine>,
    members: Arc<dyn MemberDirectory>,
    quota_per_project_enabled: bool,
}

impl SummaryAggregator {
    pub fn new(quotas: Arc<dyn QuotaEngine>, members: Arc<dyn MemberDirectory>, quota_per_project_enabled: bool) -> Self {
        Self {
            quotas,
            members,
            quota_per_project_enabled,
        }
    }

    /// Run the selected fact-fetches and merge them into `summary`.
    pub async fn aggregate(&self, project_id: ProjectId, include_quota: bool, include_members: bool, mut summary: ProjectSummary) -> ProjectSummary {
        let mut facts: JoinSet<Fact> = JoinSet::new();

        if include_quota {
            let quotas = self.quotas.clone();
            let enabled = self.quota_per_project_enabled;
            facts.spawn(async move { Fact::Quota(fetch_quota(quotas, project_id, enabled).await) });
        }

        if include_members {
            let members = self.members.clone();
            facts.spawn(async move { Fact::Members(fetch_member_counts(members, project_id).await) });
        }

        // Join barrier: every launched fact finishes before the summary is
        // returned, successful or not.
        while let Some(joined) = facts.join_next().await {
            match joined {
                Ok(Fact::Quota(quota)) => summary.quota = quota,
                Ok(Fact::Members([admins, masters, developers, guests, limited])) => {
                    summary.project_admin_count = admins;
                    summary.master_count = masters;
                    summary.developer_count = developers;
                    summary.guest_count = guests;
                    summary.limited_guest_count = limited;
                }
                Err(e) => debug!("summary fact task failed: {e}"),
            }
        }

        summary
    }
}

async fn fetch_quota(quotas: Arc<dyn QuotaEngine>, project_id: ProjectId, enabled: bool) -> Option<QuotaSummary> {
    if !enabled {
        debug!("quota per project disabled");
        return None;
    }

    match quotas.get_by_ref(PROJECT_REFERENCE, project_id).await {
        Ok(Some(record)) => Some(QuotaSummary {
            hard: record.hard,
            used: record.used,
        }),
        Ok(None) => {
            debug!("no quota reference for project {project_id}");
            None
        }
        Err(e) => {
            debug!("failed to get quota for project {project_id}: {e}");
            None
        }
    }
}

/// Per-role member counts, one parallel fetch per role category, joined by
/// an inner barrier. A failed fetch leaves that role's count at zero.
async fn fetch_member_counts(members: Arc<dyn MemberDirectory>, project_id: ProjectId) -> [i64; 5] {
    let mut counts = [0i64; 5];
    let mut fetches: JoinSet<(usize, i64)> = JoinSet::new();

    for (slot, role) in ProjectRole::ALL.into_iter().enumerate() {
        let members = members.clone();
        fetches.spawn(async move {
            match members.count_with_role(project_id, role.id()).await {
                Ok(total) => (slot, total),
                Err(e) => {
                    debug!("failed to get total of project members of role {}: {e}", role.id());
                    (slot, 0)
                }
            }
        });
    }

    while let Some(joined) = fetches.join_next().await {
        match joined {
            Ok((slot, total)) => counts[slot] = total,
            Err(e) => debug!("member count task failed: {e}"),
        }
    }

    counts
}
