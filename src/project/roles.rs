//! Project role precedence.
//!
//! A user can hold several roles in one project (direct membership plus group
//! grants), and the API still exposes a single `current_user_role_id`. This
//! module reduces a role set to its highest-precedence member using a fixed
//! total order.

use serde::{Deserialize, Serialize};

/// Sentinel meaning "no recognized role held".
pub const NO_ROLE: i32 = 0;

/// Roles a user can hold within a project, ordered by precedence.
///
/// The discriminants are the wire-level role identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ProjectRole {
    ProjectAdmin = 50,
    Master = 40,
    Developer = 30,
    Guest = 20,
    LimitedGuest = 10,
}

impl ProjectRole {
    /// All roles, highest precedence first.
    pub const ALL: [ProjectRole; 5] = [
        ProjectRole::ProjectAdmin,
        ProjectRole::Master,
        ProjectRole::Developer,
        ProjectRole::Guest,
        ProjectRole::LimitedGuest,
    ];

    pub fn from_id(id: i32) -> Option<ProjectRole> {
        match id {
            50 => Some(ProjectRole::ProjectAdmin),
            40 => Some(ProjectRole::Master),
            30 => Some(ProjectRole::Developer),
            20 => Some(ProjectRole::Guest),
            10 => Some(ProjectRole::LimitedGuest),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        self as i32
    }
}

/// Returns the highest-precedence role identifier in `roles`.
///
/// Unrecognized identifiers are ignored; an empty or unrecognized-only input
/// yields [`NO_ROLE`]. Never fails.
pub fn highest_role(roles: &[i32]) -> i32 {
    roles
        .iter()
        .filter_map(|id| ProjectRole::from_id(*id))
        .max_by_key(|role| role.id())
        .map(ProjectRole::id)
        .unwrap_or(NO_ROLE)
}
