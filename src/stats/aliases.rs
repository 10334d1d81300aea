// src/stats/aliases.rs
//! Spreadsheet-style exports name the key columns differently (`rating`,
//! `elapsed_time`, `class_name`, ...). Fill the canonical column from the
//! first non-empty alias before column discovery runs.

use tracing::debug;

use crate::row::{header_names, ResultRow};

/// Canonical column → aliases, in lookup order.
const ALIASES: [(&str, &[&str]); 4] = [
    ("GL", &["rating", "PY"]),
    ("Elapsed", &["elapsed_time", "elapsed"]),
    ("Laps", &["laps", "laps_norm"]),
    ("Class", &["class_name", "class"]),
];

/// Fill canonical columns in place. A canonical column is added to every row
/// as soon as one of its aliases exists in the header set.
pub fn normalize_field_aliases(rows: &mut [ResultRow]) {
    let headers = header_names(rows);
    for (canonical, aliases) in ALIASES {
        let present: Vec<&str> = aliases
            .iter()
            .copied()
            .filter(|a| headers.iter().any(|h| h == a))
            .collect();
        if present.is_empty() {
            continue;
        }

        let mut filled = 0usize;
        for row in rows.iter_mut() {
            let current = row.get(canonical).map(|v| v.trim().is_empty()).unwrap_or(true);
            if !current {
                continue;
            }
            let value = present
                .iter()
                .filter_map(|a| row.get(*a))
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or_default();
            if !value.is_empty() {
                filled += 1;
            }
            row.insert(canonical.to_string(), value);
        }
        debug!(canonical, filled, "alias column normalized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> ResultRow {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn fills_from_first_non_empty_alias() {
        let mut rows = vec![
            row(&[("class_name", "Laser"), ("rating", ""), ("PY", "1100"), ("elapsed_time", "0:40:00")]),
            row(&[("class_name", "Solo"), ("rating", "1142"), ("PY", "1000"), ("elapsed_time", "")]),
        ];
        normalize_field_aliases(&mut rows);

        assert_eq!(rows[0]["GL"], "1100");
        assert_eq!(rows[1]["GL"], "1142");
        assert_eq!(rows[0]["Class"], "Laser");
        assert_eq!(rows[0]["Elapsed"], "0:40:00");
        assert_eq!(rows[1]["Elapsed"], "");
        assert!(!rows[0].contains_key("Laps"));
    }

    #[test]
    fn existing_canonical_value_is_kept() {
        let mut rows = vec![row(&[("GL", "1050"), ("rating", "1100")])];
        normalize_field_aliases(&mut rows);
        assert_eq!(rows[0]["GL"], "1050");
    }

    #[test]
    fn rows_keep_one_key_order() {
        let mut rows = vec![
            row(&[("laps", "2"), ("Time", "40:00")]),
            row(&[("laps", ""), ("Time", "41:00")]),
        ];
        normalize_field_aliases(&mut rows);
        let first: Vec<&String> = rows[0].keys().collect();
        assert_eq!(rows[1].keys().collect::<Vec<_>>(), first);
        assert_eq!(rows[1]["Laps"], "");
    }
}
