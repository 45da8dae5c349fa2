//! Persistence layer behind the collaborator traits.
//!
//! The lifecycle controller never talks to PostgreSQL directly: it consumes
//! the object-safe traits defined in [`handlers`] (`ProjectStore`,
//! `MemberDirectory`, `ArtifactCounter`) and the quota engine boundary in
//! [`crate::quota`]. This module provides the Postgres implementations of
//! those traits plus the error categorization that turns constraint
//! violations into application-level outcomes (a racing duplicate insert
//! surfaces as a unique violation, which the API layer reports as 409).
//!
//! # Modules
//!
//! - [`handlers`]: collaborator traits, record types, and the Pg
//!   implementations
//! - [`errors`]: store-specific error types

pub mod errors;
pub mod handlers;
