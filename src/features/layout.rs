//! Feature Layout - Centralized Feature Definition
//!
//! The statistical engine standardizes and compares vectors batch-wide, so
//! the feature order must be identical for every record in a batch. This
//! file is the single source of truth for that order.
//!
//! Rules:
//! 1. Add feature -> increment FEATURE_VERSION
//! 2. Change order -> increment FEATURE_VERSION
//! 3. Remove feature -> increment FEATURE_VERSION

use crc32fast::Hasher;

/// Current feature layout version.
pub const FEATURE_VERSION: u8 = 1;

/// Feature names in the exact order they appear in the vector.
pub const FEATURE_LAYOUT: &[&str] = &[
    "status_code",       // 0: HTTP status code, 0 if unparsable
    "bytes_sent",        // 1: request bytes sent
    "bytes_received",    // 2: response bytes received
    "domain_length",     // 3: length of the domain string
    "user_agent_length", // 4: length of the user-agent string
    "is_blocked",        // 5: 1.0 if the action was Blocked
    "is_post",           // 6: 1.0 if the method was POST
];

/// Total number of features. Must match `FEATURE_LAYOUT.len()`.
pub const FEATURE_COUNT: usize = 7;

/// CRC32 hash over version + feature names, used to detect layout mismatches
/// between a stored flag/importance vector and the running engine.
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

/// Check that incoming data matches the current layout.
pub fn is_layout_compatible(version: u8, hash: u32) -> bool {
    version == FEATURE_VERSION && hash == layout_hash()
}

/// Get feature index by name.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index.
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_count_matches_layout() {
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_layout_hash_consistency() {
        assert_eq!(layout_hash(), layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_layout_compatibility() {
        assert!(is_layout_compatible(FEATURE_VERSION, layout_hash()));
        assert!(!is_layout_compatible(FEATURE_VERSION + 1, layout_hash()));
        assert!(!is_layout_compatible(FEATURE_VERSION, layout_hash() ^ 1));
    }

    #[test]
    fn test_feature_lookup() {
        assert_eq!(feature_index("status_code"), Some(0));
        assert_eq!(feature_index("is_post"), Some(6));
        assert_eq!(feature_index("nonexistent"), None);
        assert_eq!(feature_name(1), Some("bytes_sent"));
        assert_eq!(feature_name(100), None);
    }
}
