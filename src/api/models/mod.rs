//! Request/response data structures for API communication.

pub mod pagination;
pub mod projects;
