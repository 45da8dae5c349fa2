//! Common type definitions shared across the crate.
//!
//! This module defines:
//! - Type aliases for entity IDs (ProjectId, QuotaId)
//! - The [`Action`] / [`SubResource`] pair used by authorization checks
//!
//! # Authorization vocabulary
//!
//! Every gated operation is described by an ([`Action`], [`SubResource`])
//! pair scoped to one project. `SubResource::Project` is the project row
//! itself; the others are subordinate surfaces that carry narrower
//! permissions (e.g. quota visibility inside the summary endpoint).

use std::fmt;

/// Numeric project identifier, assigned by the store on creation.
pub type ProjectId = i64;

/// Identifier of a quota record inside the quota engine.
pub type QuotaId = i64;

/// Actions a principal can perform on a project or one of its subresources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::List => "list",
        };
        f.write_str(s)
    }
}

/// Project-scoped resources that authorization decisions are made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubResource {
    /// The project itself.
    Project,
    /// Project membership records.
    Member,
    /// The project's resource quota.
    Quota,
}

impl fmt::Display for SubResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubResource::Project => "project",
            SubResource::Member => "member",
            SubResource::Quota => "quota",
        };
        f.write_str(s)
    }
}
