//! Column converters for values SQLite has no native type for

use crate::Result;

/// Encode an ordered list of strings as a JSON array for a TEXT column
pub fn string_list_to_column(list: &[String]) -> Result<String> {
    Ok(serde_json::to_string(list)?)
}

/// Decode a TEXT column written by [`string_list_to_column`].
///
/// An empty column is read as an empty list.
pub fn string_list_from_column(value: &str) -> Result<Vec<String>> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(value)?)
}
