//! Audit event types.
//!
//! The audit log is write-only from the service's perspective: events are
//! appended on every access, assignment, step completion and key creation,
//! and never read back by core logic. The admin stats endpoint only counts
//! rows.

/// Kinds of audit events the service records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// A get-or-bind lookup happened (whether or not the key was found)
    Access,
    /// A key was bound to a hardware id
    Assign,
    Step1Complete,
    Step2Complete,
    /// A key record was created (admin, named, or self-service)
    KeyCreated,
}

impl EventType {
    /// Stable string stored in the `event_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Access => "access",
            EventType::Assign => "assign",
            EventType::Step1Complete => "step1_complete",
            EventType::Step2Complete => "step2_complete",
            EventType::KeyCreated => "key_created",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_are_stable() {
        assert_eq!(EventType::Access.as_str(), "access");
        assert_eq!(EventType::Assign.as_str(), "assign");
        assert_eq!(EventType::Step1Complete.as_str(), "step1_complete");
        assert_eq!(EventType::Step2Complete.as_str(), "step2_complete");
        assert_eq!(EventType::KeyCreated.as_str(), "key_created");
    }
}
