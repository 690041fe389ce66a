//! Business logic services.
//!
//! Services contain the store-facing logic separated from HTTP handlers:
//! key lifecycle, step tracking, and audit appends.

pub mod audit_service;
pub mod key_service;
pub mod step_service;
