//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated user from a JWT Bearer token.
//! - [`rbac::RequireWorker`] -- requires the `worker` role.

pub mod auth;
pub mod rbac;
