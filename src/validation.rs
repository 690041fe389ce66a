//! Identifier validation.
//!
//! Pure predicates over the two identifier kinds accepted on the wire:
//! hardware ids (client-supplied, opaque) and key names. No I/O, no state.

/// Check a client-supplied hardware id.
///
/// Valid iff the string is 8 to 50 characters drawn from `[A-Za-z0-9_-]`.
/// The service never generates hardware ids; it only refuses malformed ones.
pub fn valid_hardware_id(s: &str) -> bool {
    (8..=50).contains(&s.len())
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Check a human-chosen key name.
///
/// Valid iff non-empty and drawn from `[A-Za-z0-9-]`. Length is otherwise
/// unconstrained; uniqueness is the store's concern, not the validator's.
pub fn valid_key_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_id_length_bounds() {
        assert!(!valid_hardware_id("short")); // 5 chars
        assert!(!valid_hardware_id("1234567")); // 7 chars
        assert!(valid_hardware_id("12345678")); // 8 chars, lower bound
        assert!(valid_hardware_id(&"a".repeat(50))); // upper bound
        assert!(!valid_hardware_id(&"a".repeat(51)));
        assert!(!valid_hardware_id(""));
    }

    #[test]
    fn hardware_id_charset() {
        assert!(valid_hardware_id("HWID_1234-abc"));
        assert!(!valid_hardware_id("hwid with space"));
        assert!(!valid_hardware_id("hwid.dotted1"));
        assert!(!valid_hardware_id("hwid!bang99"));
    }

    #[test]
    fn key_name_accepts_alphanumeric_and_dash() {
        assert!(valid_key_name("drakness"));
        assert!(valid_key_name("key-2024-A"));
        assert!(valid_key_name("x"));
    }

    #[test]
    fn key_name_rejects_empty_and_other_chars() {
        assert!(!valid_key_name(""));
        assert!(!valid_key_name("under_score"));
        assert!(!valid_key_name("has space"));
        assert!(!valid_key_name("dot.name"));
    }
}
