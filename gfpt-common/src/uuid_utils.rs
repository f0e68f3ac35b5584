//! UUID utilities
//!
//! Identifiers are stored as TEXT columns; these helpers keep the
//! string <-> Uuid conversion in one place.

use uuid::Uuid;

use crate::{Error, Result};

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> std::result::Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Parse a UUID read back from a database column
pub fn parse_stored(column: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Corrupt {} '{}': {}", column, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stored_roundtrip() {
        let id = generate();
        assert_eq!(parse_stored("guid", &id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_parse_stored_reports_column() {
        let err = parse_stored("record_id", "not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("record_id"));
    }
}
