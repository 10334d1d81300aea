// src/stats/annotate.rs
use crate::row::ResultRow;

pub const DERIVED: &str = "Derived PY/GL";
pub const DERIVED_ALL: &str = "Derived PY/GL (All)";
pub const DERIVED_BEST: &str = "Derived PY/GL (Best)";
pub const EXCLUDED: &str = "Excluded";
pub const EXCLUDED_ALL: &str = "Excluded (All)";
pub const EXCLUDED_BEST: &str = "Excluded (Best)";
pub const REASON_ALL: &str = "Excluded Reason (All)";
pub const REASON_BEST: &str = "Excluded Reason (Best)";

pub const MANUAL_REASON: &str = "Manual exclusion";
pub const OUTLIER_REASON: &str = "Outlier (boat avg corrected/lap outside mean±kσ)";

/// Every column the engine writes, in the order they are appended.
pub const STAT_COLUMNS: [&str; 8] = [
    DERIVED,
    DERIVED_ALL,
    DERIVED_BEST,
    EXCLUDED,
    EXCLUDED_ALL,
    EXCLUDED_BEST,
    REASON_ALL,
    REASON_BEST,
];

pub fn is_annotation_column(name: &str) -> bool {
    STAT_COLUMNS.contains(&name)
}

/// Which mode's columns a writer fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    All,
    Best,
}

impl Mode {
    fn derived(self) -> &'static str {
        match self {
            Mode::All => DERIVED_ALL,
            Mode::Best => DERIVED_BEST,
        }
    }

    fn excluded(self) -> &'static str {
        match self {
            Mode::All => EXCLUDED_ALL,
            Mode::Best => EXCLUDED_BEST,
        }
    }

    fn reason(self) -> &'static str {
        match self {
            Mode::All => REASON_ALL,
            Mode::Best => REASON_BEST,
        }
    }

    /// Columns owned by this mode, in append order.
    pub fn columns(self) -> [&'static str; 5] {
        [self.derived(), DERIVED, self.excluded(), EXCLUDED, self.reason()]
    }
}

/// Append this mode's columns to every row (empty), keeping existing values
/// and positions, so the row set stays uniformly keyed.
pub fn reserve_columns(rows: &mut [ResultRow], mode: Mode) {
    for row in rows.iter_mut() {
        for col in mode.columns() {
            row.entry(col.to_string()).or_default();
        }
    }
}

/// Outcome written onto one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<'a> {
    Included { derived: Option<i64> },
    /// Statistically rejected; never carries a rating.
    Excluded { reason: &'a str },
    Manual,
    /// Took no part in this run; any earlier values are cleared.
    Skipped,
}

pub fn write_verdict(row: &mut ResultRow, mode: Mode, verdict: Verdict<'_>) {
    let (derived, excluded, reason) = match verdict {
        Verdict::Included { derived } => (derived, "No", ""),
        Verdict::Excluded { reason } => (None, "Yes", reason),
        Verdict::Manual => (None, "Yes", MANUAL_REASON),
        Verdict::Skipped => (None, "", ""),
    };
    let derived = derived.map(|d| d.to_string()).unwrap_or_default();

    row.insert(mode.derived().to_string(), derived.clone());
    row.insert(DERIVED.to_string(), derived);
    row.insert(mode.excluded().to_string(), excluded.to_string());
    row.insert(EXCLUDED.to_string(), excluded.to_string());
    row.insert(mode.reason().to_string(), reason.to_string());
}

/// Add any missing engine column as an empty string.
pub fn ensure_stat_columns(rows: &mut [ResultRow]) {
    for row in rows.iter_mut() {
        for col in STAT_COLUMNS {
            row.entry(col.to_string()).or_default();
        }
    }
}
