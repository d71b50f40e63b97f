//! Task domain (board cards and their workflow stages).

pub mod model;

use crate::error::{BoardError, BoardResult};

/// Maximum length of a task title.
pub const MAX_TITLE_LEN: usize = 100;

/// Maximum length of a task description.
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Validate a title against the board rules.
pub fn validate_title(title: &str) -> BoardResult<()> {
    if title.trim().is_empty() {
        return Err(BoardError::validation("Title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(BoardError::validation(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(())
}

/// Validate an optional description against the board rules.
pub fn validate_description(description: Option<&str>) -> BoardResult<()> {
    if let Some(desc) = description {
        if desc.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(BoardError::validation(format!(
                "Description must be at most {} characters",
                MAX_DESCRIPTION_LEN
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_required() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title("Fix login").is_ok());
    }

    #[test]
    fn test_title_length_limit() {
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(validate_title(&long).is_err());
        let max = "x".repeat(MAX_TITLE_LEN);
        assert!(validate_title(&max).is_ok());
    }

    #[test]
    fn test_description_length_limit() {
        let long = "d".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(validate_description(Some(&long)).is_err());
        assert!(validate_description(Some("short")).is_ok());
        assert!(validate_description(None).is_ok());
    }
}
