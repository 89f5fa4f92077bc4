//! Content hashing utilities
//!
//! Used to derive stable synthetic identifiers from record content, so that
//! re-running the pipeline on unchanged input produces identical ids.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest over the concatenation of the given parts.
///
/// Parts are hashed in order with no separator, matching how the upstream
/// pipeline concatenates subject and date before hashing.
pub fn content_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash(&["Voto de pesar", "2025-03-10"]);
        let b = content_hash(&["Voto de pesar", "2025-03-10"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_content_hash_known_value() {
        // sha256("hello world")
        assert_eq!(
            content_hash(&["hello", " ", "world"]),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_content_hash_differs_on_content() {
        assert_ne!(content_hash(&["a", "b"]), content_hash(&["b", "a"]));
    }
}
