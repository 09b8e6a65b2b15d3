//! Common type definitions.
//!
//! All entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`]: owner of every row, taken from the verified token subject
//! - [`MachineId`], [`ToolId`], [`CuttingParameterId`]: shop inventory records
//! - [`AnalysisId`], [`DrawingId`]: drawing analyses and the uploaded drawings behind them
//! - [`PresetId`]: named analysis presets (the "models" table)

use uuid::Uuid;

pub type UserId = Uuid;
pub type MachineId = Uuid;
pub type ToolId = Uuid;
pub type CuttingParameterId = Uuid;
pub type AnalysisId = Uuid;
pub type DrawingId = Uuid;
pub type PresetId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Trim a required text field, returning `None` when nothing is left.
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trim an optional text field; blank values collapse to `None`.
pub fn trimmed_opt(value: Option<&str>) -> Option<String> {
    value.and_then(non_empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbrev_uuid() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }

    #[test]
    fn test_trimming_helpers() {
        assert_eq!(non_empty("  Foo "), Some("Foo".to_string()));
        assert_eq!(non_empty("   "), None);
        assert_eq!(trimmed_opt(Some("")), None);
        assert_eq!(trimmed_opt(Some(" bar ")), Some("bar".to_string()));
        assert_eq!(trimmed_opt(None), None);
    }
}
