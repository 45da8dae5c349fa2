//! Principal model and request-time authorization.
//!
//! regctl runs behind an authenticating proxy: credentials are resolved
//! upstream and the principal's identity arrives in trusted headers. This
//! module turns those headers into a [`Principal`] and gates every operation
//! through the [`gate::AccessGate`] before any work happens.
//!
//! # Principal kinds
//!
//! - `Anonymous`: no identity headers. Permitted only read access to public
//!   projects, and listing when anonymous access is enabled.
//! - `Solution`: the system-integration identity (replication and friends),
//!   authenticated by a shared secret header. Treated like an administrator.
//! - `User`: a named principal, `Local` or `Robot`. Only `Local` principals
//!   have enumerable project memberships; robot accounts authenticate per
//!   scope and carry no membership rows, so role population and the
//!   membership union in listing are skipped for them. That capability is an
//!   explicit flag on the type ([`Principal::enumerates_memberships`]), not a
//!   downcast.

pub mod gate;
pub mod policy;

use crate::errors::{Error, Result};
use crate::AppState;
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::trace;

/// How a named principal authenticates, and what that implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    /// Platform account with enumerable project memberships
    Local,
    /// Robot account; no membership rows
    Robot,
}

/// A named, authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrincipal {
    pub username: String,
    pub is_admin: bool,
    pub kind: PrincipalKind,
}

/// The acting principal of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Anonymous,
    Solution,
    User(UserPrincipal),
}

impl Principal {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Principal::Anonymous)
    }

    pub fn is_sys_admin(&self) -> bool {
        match self {
            Principal::User(user) => user.is_admin,
            Principal::Solution => false,
            Principal::Anonymous => false,
        }
    }

    pub fn is_solution(&self) -> bool {
        matches!(self, Principal::Solution)
    }

    /// Whether this principal type supports enumerable role membership.
    pub fn enumerates_memberships(&self) -> bool {
        matches!(
            self,
            Principal::User(UserPrincipal {
                kind: PrincipalKind::Local,
                ..
            })
        )
    }

    /// Username for audit/ownership purposes, if the principal has one.
    pub fn username(&self) -> Option<&str> {
        match self {
            Principal::User(user) => Some(&user.username),
            Principal::Solution | Principal::Anonymous => None,
        }
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let auth = &state.config.auth;

        // The solution identity authenticates with a shared secret; a wrong
        // secret is a credential failure, not anonymity.
        if let Some(presented) = parts.headers.get(&auth.solution_header).and_then(|h| h.to_str().ok()) {
            return match &auth.solution_secret {
                Some(secret) if presented == secret => Ok(Principal::Solution),
                _ => Err(Error::Unauthenticated {
                    message: Some("invalid solution secret".to_string()),
                }),
            };
        }

        let Some(username) = parts.headers.get(&auth.user_header).and_then(|h| h.to_str().ok()) else {
            trace!("no identity headers present; treating request as anonymous");
            return Ok(Principal::Anonymous);
        };
        if username.is_empty() {
            return Err(Error::Unauthenticated {
                message: Some("empty username header".to_string()),
            });
        }

        let is_admin = parts
            .headers
            .get(&auth.admin_header)
            .and_then(|h| h.to_str().ok())
            .map(|v| v == "true")
            .unwrap_or(false);

        let kind = match parts.headers.get(&auth.kind_header).and_then(|h| h.to_str().ok()) {
            Some("robot") => PrincipalKind::Robot,
            _ => PrincipalKind::Local,
        };

        Ok(Principal::User(UserPrincipal {
            username: username.to_string(),
            is_admin,
            kind,
        }))
    }
}
