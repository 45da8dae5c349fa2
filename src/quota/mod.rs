//! Resource quota types, the quota engine boundary, and hard-limit resolution.
//!
//! The quota engine itself (usage accounting, refresh, enforcement during
//! pushes) lives outside this crate; regctl only creates, looks up and
//! deletes quota *references* for projects and validates hard-limit sets
//! before committing them. [`QuotaEngine`] is the contract it requires.

use crate::errors::{Error, Result};
use crate::types::{ProjectId, QuotaId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resource kinds a quota can bound. Currently only storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Storage,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Storage => f.write_str("storage"),
        }
    }
}

/// A mapping from resource kind to a hard-limit or usage value.
///
/// Values are raw byte counts for storage; `-1` means unlimited.
pub type ResourceList = BTreeMap<ResourceKind, i64>;

/// Reference kinds for quota records. Projects are the only reference kind
/// this crate manages.
pub const PROJECT_REFERENCE: &str = "project";

/// A quota record as reported by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub id: QuotaId,
    pub hard: ResourceList,
    pub used: ResourceList,
}

/// Contract the lifecycle controller requires from the quota engine.
#[async_trait::async_trait]
pub trait QuotaEngine: Send + Sync {
    /// Create a quota record bound to `reference_id` with the given hard limits.
    async fn create(&self, reference: &str, reference_id: ProjectId, hard: ResourceList) -> Result<QuotaId>;

    /// Look up the quota record bound to `reference_id`, if any.
    async fn get_by_ref(&self, reference: &str, reference_id: ProjectId) -> Result<Option<QuotaRecord>>;

    /// Delete a quota record by its ID.
    async fn delete(&self, id: QuotaId) -> Result<()>;

    /// Structural validation of a hard-limit set before commit.
    async fn validate(&self, reference: &str, hard: &ResourceList) -> Result<()>;
}

/// Shared structural validation of hard limits: every value must be `-1`
/// (unlimited) or positive, and the set must not be empty.
pub fn validate_hard_limits(hard: &ResourceList) -> Result<()> {
    if hard.is_empty() {
        return Err(Error::BadRequest {
            message: "quota hard limits must not be empty".to_string(),
        });
    }
    for (kind, value) in hard {
        if *value != -1 && *value <= 0 {
            return Err(Error::BadRequest {
                message: format!("invalid hard limit for {kind}: {value} (must be -1 or positive)"),
            });
        }
    }
    Ok(())
}

/// Computes the hard resource limits to assign a new project.
///
/// The caller-supplied storage limit is honored only for system
/// administrators; for anyone else the platform-wide per-project default
/// silently overrides it. The resulting set is validated by the quota engine
/// before it is committed.
pub struct QuotaLimitResolver<'a> {
    engine: &'a dyn QuotaEngine,
}

impl<'a> QuotaLimitResolver<'a> {
    pub fn new(engine: &'a dyn QuotaEngine) -> Self {
        Self { engine }
    }

    pub async fn resolve(&self, requested_storage: Option<i64>, default_storage: i64, is_admin: bool) -> Result<ResourceList> {
        let storage = if is_admin {
            requested_storage.unwrap_or(default_storage)
        } else {
            // caller intent is ignored, not rejected
            default_storage
        };

        let mut hard = ResourceList::new();
        hard.insert(ResourceKind::Storage, storage);

        self.engine.validate(PROJECT_REFERENCE, &hard).await?;
        Ok(hard)
    }
}
