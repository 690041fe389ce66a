//! Opaque key value generation.
//!
//! Key values carry a fixed recognizable prefix followed by 32 uppercase hex
//! characters from 16 random bytes. The generator does no collision checking;
//! with 128 bits of entropy per value, collisions are not a practical concern.

/// Fixed prefix on every generated key value.
pub const KEY_PREFIX: &str = "DRK-";

/// Generate a fresh opaque key value.
///
/// # Output
///
/// `DRK-` followed by 32 uppercase hex characters, e.g.
/// `DRK-9F2C41A807BD63E58A11F0C2D4B97E06`.
pub fn generate() -> String {
    let bytes: [u8; 16] = rand::random();
    format!("{KEY_PREFIX}{}", hex::encode_upper(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_prefix_and_expected_length() {
        let value = generate();
        assert!(value.starts_with(KEY_PREFIX));
        assert_eq!(value.len(), KEY_PREFIX.len() + 32);
    }

    #[test]
    fn suffix_is_uppercase_hex() {
        let value = generate();
        let suffix = &value[KEY_PREFIX.len()..];
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }

    #[test]
    fn consecutive_values_differ() {
        assert_ne!(generate(), generate());
    }
}
