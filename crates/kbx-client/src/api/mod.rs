//! Thin typed wrappers over the HTTP client, one module per backend
//! resource.

pub mod auth;
pub mod types;
pub mod users;
