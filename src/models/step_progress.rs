//! Step progress data model and gate decisions.
//!
//! One `StepProgress` row exists per hardware id once step 1 has been hit.
//! The gate decisions (`gate_step2` / `gate_step3`) are pure reads over the
//! current row: they decide whether a step may proceed but never mutate
//! progress themselves. In particular a rejected step 3 attempt reports
//! bypass detection without resetting any flags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// The step-2 hash must be longer than this many characters.
///
/// This is a placeholder strength check standing in for verified
/// server-to-server confirmation from the external task provider.
pub const MIN_STEP2_HASH_LEN: usize = 10;

/// Represents a step-progress record from the database.
///
/// # Database Table
///
/// Maps to the `step_progress` table, keyed by `hardware_id`. Flags are set
/// monotonically by upserts and never reset by the normal flow.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StepProgress {
    /// Hardware id this progress belongs to
    pub hardware_id: String,

    pub step1_completed: bool,
    pub step2_completed: bool,
    pub step3_completed: bool,

    /// Opaque token captured at step 2, compared byte-for-byte at step 3
    pub step2_hash: Option<String>,

    /// Name of the key issued at step 3, if any
    pub key_name: Option<String>,

    pub step1_at: Option<DateTime<Utc>>,
    pub step2_at: Option<DateTime<Utc>>,
    pub step3_at: Option<DateTime<Utc>>,

    pub last_update: DateTime<Utc>,
}

impl StepProgress {
    /// The all-false default a missing record behaves as.
    pub fn empty(hardware_id: &str) -> Self {
        Self {
            hardware_id: hardware_id.to_string(),
            step1_completed: false,
            step2_completed: false,
            step3_completed: false,
            step2_hash: None,
            key_name: None,
            step1_at: None,
            step2_at: None,
            step3_at: None,
            last_update: Utc::now(),
        }
    }

    /// Decide whether step 2 may proceed with the supplied hash.
    ///
    /// # Rules
    ///
    /// 1. Step 1 must already be completed (`step1_not_done` otherwise)
    /// 2. The hash must be non-empty and longer than 10 characters
    ///    (`invalid_hash` otherwise)
    pub fn gate_step2(&self, hash: &str) -> Result<(), AppError> {
        if !self.step1_completed {
            return Err(AppError::Step1NotDone);
        }
        if hash.len() <= MIN_STEP2_HASH_LEN {
            return Err(AppError::InvalidHash);
        }
        Ok(())
    }

    /// Decide whether step 3 may proceed with the supplied hash.
    ///
    /// # Rules
    ///
    /// 1. Steps 1 and 2 must both be completed (`bypass_detected` otherwise;
    ///    this is a detection only, flags are left as they are)
    /// 2. The hash must exactly equal the one stored at step 2
    ///    (`invalid_hash` otherwise)
    pub fn gate_step3(&self, hash: &str) -> Result<(), AppError> {
        if !(self.step1_completed && self.step2_completed) {
            return Err(AppError::BypassDetected);
        }
        match self.step2_hash.as_deref() {
            Some(stored) if stored == hash => Ok(()),
            _ => Err(AppError::InvalidHash),
        }
    }
}

/// Request body for step 1.
#[derive(Debug, Deserialize)]
pub struct Step1Request {
    pub hwid: Option<String>,
}

/// Request body for steps 2 and 3.
#[derive(Debug, Deserialize)]
pub struct HashStepRequest {
    pub hwid: Option<String>,
    pub hash: Option<String>,
}

/// Acknowledgement returned by steps 1 and 2.
#[derive(Debug, Serialize)]
pub struct StepAck {
    pub success: bool,
    pub message: String,
}

/// The three step flags as reported by the user-status endpoint.
#[derive(Debug, Serialize)]
pub struct StepFlags {
    pub step1: bool,
    pub step2: bool,
    pub step3: bool,
}

impl From<&StepProgress> for StepFlags {
    fn from(progress: &StepProgress) -> Self {
        Self {
            step1: progress.step1_completed,
            step2: progress.step2_completed,
            step3: progress.step3_completed,
        }
    }
}

/// Bound-key details inside a user-status response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundKeyInfo {
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// Response body for the user-status endpoint. Read-only, no side effects.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusResponse {
    pub success: bool,
    pub steps: StepFlags,
    pub has_valid_key: bool,
    pub key_info: Option<BoundKeyInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(step1: bool, step2: bool, hash: Option<&str>) -> StepProgress {
        StepProgress {
            step1_completed: step1,
            step2_completed: step2,
            step2_hash: hash.map(str::to_string),
            ..StepProgress::empty("HWID-TEST-0001")
        }
    }

    #[test]
    fn step2_requires_step1_first() {
        let err = progress(false, false, None)
            .gate_step2("longenoughhash")
            .unwrap_err();
        assert!(matches!(err, AppError::Step1NotDone));

        assert!(progress(true, false, None).gate_step2("longenoughhash").is_ok());
    }

    #[test]
    fn step2_rejects_short_hashes() {
        let p = progress(true, false, None);
        assert!(matches!(p.gate_step2(""), Err(AppError::InvalidHash)));
        assert!(matches!(p.gate_step2("short"), Err(AppError::InvalidHash)));
        // Exactly 10 characters is still too short
        assert!(matches!(p.gate_step2("0123456789"), Err(AppError::InvalidHash)));
        assert!(p.gate_step2("01234567890").is_ok());
    }

    #[test]
    fn step3_detects_bypass_when_earlier_steps_missing() {
        for (s1, s2) in [(false, false), (true, false), (false, true)] {
            let err = progress(s1, s2, None).gate_step3("abc").unwrap_err();
            assert!(matches!(err, AppError::BypassDetected));
        }
    }

    #[test]
    fn bypass_detection_does_not_reset_flags() {
        // Observed behavior: detection is a report, not a reset.
        let p = progress(true, false, Some("longenoughhash"));
        let before = (p.step1_completed, p.step2_completed, p.step2_hash.clone());
        assert!(p.gate_step3("longenoughhash").is_err());
        assert_eq!(
            before,
            (p.step1_completed, p.step2_completed, p.step2_hash.clone())
        );
    }

    #[test]
    fn step3_compares_hash_with_stored_value() {
        let p = progress(true, true, Some("longenoughhash"));
        assert!(p.gate_step3("longenoughhash").is_ok());
        assert!(matches!(p.gate_step3("different"), Err(AppError::InvalidHash)));

        // Completed steps but no stored hash still rejects
        let missing = progress(true, true, None);
        assert!(matches!(missing.gate_step3("anything"), Err(AppError::InvalidHash)));
    }

    #[test]
    fn missing_record_default_is_all_false() {
        let p = StepProgress::empty("HWID-TEST-0001");
        let flags = StepFlags::from(&p);
        assert!(!flags.step1 && !flags.step2 && !flags.step3);
        assert!(p.step2_hash.is_none());
    }
}
