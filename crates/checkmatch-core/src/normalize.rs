//! String canonicalization for header matching and join keys

use crate::table::CellValue;

/// Canonical form of a cell for header matching: trimmed, every
/// non-alphanumeric character removed, lowercased.
///
/// Total over all inputs; an empty cell normalizes to `""`.
pub fn normalize(value: &CellValue) -> String {
    normalize_str(&value.to_string_value())
}

/// [`normalize`] for text that is already a string
pub fn normalize_str(s: &str) -> String {
    s.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Remove leading `'0'` characters only; `"0"` and `"000"` become `""`
pub fn strip_leading_zeros(s: &str) -> &str {
    s.trim_start_matches('0')
}

/// Join-key view of a cell: stringified, then leading zeros stripped.
///
/// Only ever compared for equality; display keeps the original cell.
pub fn join_key(value: &CellValue) -> String {
    strip_leading_zeros(&value.to_string_value()).to_string()
}

/// Key used to match column names: spaces removed, uppercased
pub fn column_key(name: &str) -> String {
    name.replace(' ', "").to_uppercase()
}

/// Loader clean-up for header names: embedded spaces removed
pub fn strip_spaces(name: &str) -> String {
    name.replace(' ', "")
}
