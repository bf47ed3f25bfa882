//! Role names carried in access tokens.

pub const ROLE_WORKER: &str = "worker";
