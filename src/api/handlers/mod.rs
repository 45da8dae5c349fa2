//! HTTP request handlers for the project endpoints.
//!
//! Handlers stay thin: they deserialize the request, extract the
//! [`crate::auth::Principal`], delegate to the
//! [`crate::project::controller::ProjectLifecycleController`], and
//! serialize the result. All authorization and sequencing decisions live
//! in the controller.

pub mod projects;
