//! Error types for the store model.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown block kind: {0}")]
    UnknownBlockKind(String),

    #[error("Block '{kind}' is missing fields: {}", .fields.join(", "))]
    MissingField { kind: String, fields: Vec<String> },

    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    #[error("Invalid script '{0}': expected a list of blocks")]
    InvalidScript(String),

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Timestamp parse error: {0}")]
    TimestampParse(String),

    #[error("No canonical timezone abbreviation for offset {0}")]
    NoCanonicalZone(chrono::FixedOffset),

    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    #[error("Entry info is missing field '{0}'")]
    MissingInfoField(String),

    #[error("Invalid entry info: {0}")]
    InvalidEntryInfo(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Checks `index < len`, the bound for element access and removal.
    pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
        if index < len {
            Ok(())
        } else {
            Err(StoreError::IndexOutOfRange { index, len })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_lists_every_field() {
        let err = StoreError::MissingField {
            kind: "move".to_string(),
            fields: vec!["old".to_string(), "new".to_string()],
        };
        assert_eq!(err.to_string(), "Block 'move' is missing fields: old, new");
    }

    #[test]
    fn test_check_index_bounds() {
        assert!(StoreError::check_index(0, 1).is_ok());
        assert!(matches!(
            StoreError::check_index(1, 1),
            Err(StoreError::IndexOutOfRange { index: 1, len: 1 })
        ));
    }
}
