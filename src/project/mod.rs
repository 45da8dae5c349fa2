//! Project domain model and validation rules.
//!
//! A project is a tenant-scoped namespace owning repositories and quota. Its
//! identity is a numeric ID assigned by the store plus an immutable, unique
//! name. Free-form string metadata hangs off each project; a handful of keys
//! are reserved and validated here. The modules below hold the lifecycle
//! components:
//!
//! - [`controller`]: orchestrates create/read/update/delete/list/summary
//! - [`deletable`]: the deletion precondition check
//! - [`roles`]: role precedence reduction
//! - [`summary`]: concurrent summary aggregation

pub mod controller;
pub mod deletable;
pub mod roles;
pub mod summary;

use crate::errors::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PROJECT_NAME_MIN_LEN: usize = 1;
pub const PROJECT_NAME_MAX_LEN: usize = 255;

/// Reserved metadata keys.
pub mod metadata {
    /// "true"/"false": whether the project is readable without membership
    pub const PUBLIC: &str = "public";
    /// "true"/"false": content trust enforcement
    pub const ENABLE_CONTENT_TRUST: &str = "enable_content_trust";
    /// "true"/"false": scan images on push
    pub const AUTO_SCAN: &str = "auto_scan";
    /// "true"/"false": block pulls of vulnerable images
    pub const PREVENT_VUL: &str = "prevent_vul";
    /// Vulnerability severity threshold (none/low/medium/high/critical)
    pub const SEVERITY: &str = "severity";
    /// "true"/"false": reuse the system-level CVE allow-list
    pub const REUSE_SYS_CVE_WHITELIST: &str = "reuse_sys_cve_whitelist";
}

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$").expect("valid name pattern"));

const SEVERITY_RATINGS: [&str; 5] = ["none", "low", "medium", "high", "critical"];

/// One entry of a project's CVE allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CveItem {
    pub cve_id: String,
}

/// Per-project CVE allow-list: scans ignore the listed CVE IDs until the
/// optional expiry (seconds since epoch).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CveAllowList {
    #[serde(default)]
    pub items: Vec<CveItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

/// Validate a project name against the restricted pattern and length bounds.
pub fn validate_name(name: &str) -> Result<()> {
    if name.len() < PROJECT_NAME_MIN_LEN || name.len() > PROJECT_NAME_MAX_LEN {
        return Err(Error::BadRequest {
            message: format!(
                "project name {name} is illegal in length (must be between {PROJECT_NAME_MIN_LEN} and {PROJECT_NAME_MAX_LEN})"
            ),
        });
    }
    if !NAME_PATTERN.is_match(name) {
        return Err(Error::BadRequest {
            message: "project name is not in lower case or contains illegal characters".to_string(),
        });
    }
    Ok(())
}

/// Validate reserved metadata keys: boolean-valued keys must parse as bool,
/// severity must name a known rating. Unknown keys pass through untouched.
pub fn validate_metadata(metadata: &HashMap<String, String>) -> Result<()> {
    for key in [
        metadata::PUBLIC,
        metadata::ENABLE_CONTENT_TRUST,
        metadata::AUTO_SCAN,
        metadata::PREVENT_VUL,
        metadata::REUSE_SYS_CVE_WHITELIST,
    ] {
        if let Some(value) = metadata.get(key) {
            if value.parse::<bool>().is_err() {
                return Err(Error::BadRequest {
                    message: format!("invalid value for metadata {key}: {value} (must be \"true\" or \"false\")"),
                });
            }
        }
    }

    if let Some(severity) = metadata.get(metadata::SEVERITY) {
        if !SEVERITY_RATINGS.contains(&severity.to_lowercase().as_str()) {
            return Err(Error::BadRequest {
                message: format!("invalid value for metadata severity: {severity}"),
            });
        }
    }

    Ok(())
}

/// Normalize a severity threshold to its lowercase CVSS v3 rating name.
///
/// Legacy projects may carry pre-v3 severity names; reads report the v3
/// rating instead of the stored value.
pub fn normalize_severity(severity: &str) -> &'static str {
    match severity.to_lowercase().as_str() {
        "negligible" | "none" => "none",
        "low" => "low",
        "medium" => "medium",
        "high" => "high",
        "critical" => "critical",
        _ => "unknown",
    }
}

/// Whether the metadata map marks the project public.
pub fn is_public(metadata: &HashMap<String, String>) -> bool {
    metadata.get(metadata::PUBLIC).map(|v| v == "true").unwrap_or(false)
}
