//! Identifier generation and validation
//!
//! Letters, documents, categories and reminders are keyed by opaque random
//! strings that are never reused.

use crate::config::MAX_ID_LENGTH;
use crate::error::{AppError, Result};
use uuid::Uuid;

/// Generate a fresh identifier
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Check that a caller-supplied identifier is safe to store and to use as a
/// blob file name.
pub fn validate_id(id: &str) -> Result<()> {
    let well_formed = !id.is_empty()
        && id.len() <= MAX_ID_LENGTH
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if !well_formed {
        return Err(AppError::InvalidIdentifier(id.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_valid_and_unique() {
        let a = new_id();
        let b = new_id();

        assert_ne!(a, b);
        validate_id(&a).unwrap();
        validate_id(&b).unwrap();
    }

    #[test]
    fn test_rejects_path_like_ids() {
        assert!(validate_id("../etc/passwd").is_err());
        assert!(validate_id("a/b").is_err());
        assert!(validate_id("a\\b").is_err());
        assert!(validate_id("").is_err());
        assert!(validate_id(&"x".repeat(MAX_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_accepts_simple_ids() {
        validate_id("doc_1").unwrap();
        validate_id("Letter-42").unwrap();
    }
}
