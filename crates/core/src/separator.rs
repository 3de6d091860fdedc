//! Codec for `|`-joined multi-value columns.
//!
//! Legacy tables store role lists, permission lists and filter patterns as a
//! single text column joined by [`SEPARATOR`]. Values are decoded here, at the
//! storage boundary, and stay proper sequences everywhere else.

/// Separator character for multi-value text columns.
pub const SEPARATOR: char = '|';

/// Decode a joined column into its values.
///
/// A missing or empty column decodes to an empty sequence.
pub fn split_values(raw: Option<&str>) -> Vec<String> {
    match raw {
        None | Some("") => Vec::new(),
        Some(raw) => raw.split(SEPARATOR).map(str::to_string).collect(),
    }
}

/// Encode values into a joined column.
pub fn join_values<S: AsRef<str>>(values: &[S]) -> String {
    let mut out = String::new();
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            out.push(SEPARATOR);
        }
        out.push_str(value.as_ref());
    }
    out
}
