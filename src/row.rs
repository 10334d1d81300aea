// src/row.rs
use indexmap::IndexMap;

/// One result line: column name → cell text, in header order.
///
/// Every row produced for a single table shares the same keys in the same
/// order; the statistics engine preserves that when it appends its columns.
pub type ResultRow = IndexMap<String, String>;

/// Trim and collapse every run of whitespace (including `\n` and NBSP) to a
/// single space.
pub fn clean_cell(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch);
        }
    }
    out
}

/// Column names of a row set, taken from the first row.
pub fn header_names(rows: &[ResultRow]) -> Vec<String> {
    rows.first()
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default()
}

/// Look up `col` in `row`, returning the trimmed value or `""`.
pub fn cell<'a>(row: &'a ResultRow, col: Option<&str>) -> &'a str {
    col.and_then(|c| row.get(c)).map(|v| v.trim()).unwrap_or("")
}
