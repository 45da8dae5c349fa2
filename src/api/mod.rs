//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for the project endpoints
//! - **[`models`]**: Request/response data structures
//!
//! All endpoints are documented with OpenAPI annotations using `utoipa`;
//! the generated document is served at `/api/openapi.json`.

pub mod handlers;
pub mod models;
