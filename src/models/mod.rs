//! Data models representing database entities and wire types.

/// Admin surface request/response types
pub mod admin;
/// Audit event types
pub mod audit;
/// Key entity and key endpoint wire types
pub mod key;
/// Step-progress entity, gate decisions, step endpoint wire types
pub mod step_progress;
