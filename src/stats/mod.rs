//! Standard Correction Time (SCT) and derived PY/GL ratings.
//!
//! Two independent estimators run over the same rows:
//! - [`all_boats`]: mean of every boat's corrected time per lap, with
//!   outlier boats rejected at `mean ± kσ`;
//! - [`best_of_class`]: mean of each class's fastest boat.
//!
//! Each returns an annotated copy of the rows; the input is never touched.

pub mod aliases;
pub mod all_boats;
pub mod annotate;
pub mod best_of_class;
pub mod columns;
pub mod entry;
pub mod math;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

use crate::row::{header_names, ResultRow};
use columns::{ColumnMap, RequiredColumns};
use entry::{score_rows, RowStatus};

pub use all_boats::compute_all_boats;
pub use annotate::ensure_stat_columns;
pub use best_of_class::compute_best_of_class;
pub use entry::BoatId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("Missing required columns.")]
    MissingColumns,
    #[error("Not enough boats.")]
    NotEnoughBoats,
    #[error("All boats excluded.")]
    AllBoatsExcluded,
    #[error("Not enough classes with data.")]
    NotEnoughClasses,
}

impl Serialize for StatsError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    AllBoats,
    BestOfClass,
}

/// Run details for logs and reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsDebug {
    pub method: Method,
    pub k: Option<f64>,
    pub sct: Option<f64>,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub boats_n: Option<usize>,
    pub boats_excluded: Option<usize>,
    pub classes_n: Option<usize>,
    pub rows_scored: usize,
    pub rows_manual: usize,
    pub rows_skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StatsError>,
}

impl StatsDebug {
    pub fn new(method: Method, k: Option<f64>) -> Self {
        Self {
            method,
            k,
            sct: None,
            mean: None,
            stddev: None,
            low: None,
            high: None,
            boats_n: None,
            boats_excluded: None,
            classes_n: None,
            rows_scored: 0,
            rows_manual: 0,
            rows_skipped: 0,
            error: None,
        }
    }
}

/// How a class's SCT reference was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SctBasis {
    AllBoats {
        mean: f64,
        stddev: f64,
        low: Option<f64>,
        high: Option<f64>,
        k: f64,
    },
    BestOfClass {
        best_corrected_lap_s: f64,
        best_boat_id: BoatId,
    },
}

/// Per-class aggregate of derived ratings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStat {
    pub class: String,
    /// Mean derived PY/GL (unrounded).
    pub derived_py: f64,
    pub n: usize,
    pub sct: f64,
    #[serde(flatten)]
    pub basis: SctBasis,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeResult {
    pub rows: Vec<ResultRow>,
    pub class_stats: IndexMap<String, ClassStat>,
    pub debug: StatsDebug,
}

impl ModeResult {
    fn unchanged(rows: &[ResultRow], dbg: StatsDebug) -> Self {
        Self {
            rows: rows.to_vec(),
            class_stats: IndexMap::new(),
            debug: dbg,
        }
    }

    fn failed(rows: &[ResultRow], mut dbg: StatsDebug, err: StatsError) -> Self {
        warn!(method = ?dbg.method, error = %err, "statistics failed");
        dbg.error = Some(err);
        Self::unchanged(rows, dbg)
    }

    /// The failure, if any; rows are then returned unannotated.
    pub fn error(&self) -> Option<&StatsError> {
        self.debug.error.as_ref()
    }
}

enum Prepared {
    Empty,
    Failed(StatsError),
    Ready(RequiredColumns, Vec<RowStatus>),
}

/// Shared first stage of both modes: resolve columns and classify rows.
fn prepare(rows: &[ResultRow], dbg: &mut StatsDebug) -> Prepared {
    if rows.is_empty() {
        return Prepared::Empty;
    }
    let Some(cols) = ColumnMap::resolve(&header_names(rows)).required() else {
        return Prepared::Failed(StatsError::MissingColumns);
    };

    let statuses = score_rows(rows, &cols);
    for s in &statuses {
        match s {
            RowStatus::Scored(_) => dbg.rows_scored += 1,
            RowStatus::Manual => dbg.rows_manual += 1,
            RowStatus::Skipped => dbg.rows_skipped += 1,
        }
    }
    Prepared::Ready(cols, statuses)
}

/// Both estimators over the same rows.
#[derive(Debug, Clone, Serialize)]
pub struct DualResult {
    pub all: ModeResult,
    pub best: ModeResult,
}

impl DualResult {
    /// All-boats rows with the best-of-class `(Best)` columns copied in and
    /// every engine column present: the set callers persist.
    pub fn merged_rows(&self) -> Vec<ResultRow> {
        let mut rows = self.all.rows.clone();
        for (row, best) in rows.iter_mut().zip(&self.best.rows) {
            for col in [annotate::DERIVED_BEST, annotate::EXCLUDED_BEST, annotate::REASON_BEST] {
                if let Some(v) = best.get(col) {
                    row.insert(col.to_string(), v.clone());
                }
            }
        }
        ensure_stat_columns(&mut rows);
        rows
    }
}

/// Run both modes; they share nothing, so they run side by side.
pub fn compute_dual(rows: &[ResultRow], k: f64) -> DualResult {
    let (all, best) = rayon::join(|| compute_all_boats(rows, k), || compute_best_of_class(rows));
    DualResult { all, best }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::stats::annotate::{DERIVED_ALL, DERIVED_BEST, EXCLUDED_ALL, STAT_COLUMNS};
    use approx::assert_relative_eq;

    /// `(Class, Sail No, PY, Elapsed, Laps)` as one row.
    pub(crate) fn race_row(class: &str, sail: &str, py: &str, elapsed: &str, laps: &str) -> ResultRow {
        [("Class", class), ("Sail No", sail), ("PY", py), ("Elapsed", elapsed), ("Laps", laps)]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn fleet() -> Vec<ResultRow> {
        vec![
            race_row("Laser", "1", "1100", "0:44:00", "2"),
            race_row("Laser", "2", "1100", "0:46:12", "2"),
            race_row("Solo", "3", "1142", "0:23:30", "1"),
            race_row("Solo", "4", "1142", "0:24:10", "1"),
            race_row("Topper", "5", "1365", "DNF", "1"),
        ]
    }

    #[test]
    fn missing_columns_fail_both_modes() {
        let rows: Vec<ResultRow> = vec![[("Helm", "Ann"), ("Points", "3")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()];
        let dual = compute_dual(&rows, 2.0);
        assert_eq!(dual.all.error(), Some(&StatsError::MissingColumns));
        assert_eq!(dual.best.error(), Some(&StatsError::MissingColumns));
        assert_eq!(dual.all.rows, rows);
        assert!(dual.best.class_stats.is_empty());
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let dual = compute_dual(&[], 2.0);
        assert!(dual.all.error().is_none());
        assert!(dual.best.error().is_none());
        assert!(dual.all.rows.is_empty());
    }

    #[test]
    fn input_rows_are_left_untouched() {
        let rows = fleet();
        let before = rows.clone();
        let dual = compute_dual(&rows, 2.0);
        assert_eq!(rows, before);
        assert!(dual.all.rows[0].contains_key(DERIVED_ALL));
        assert!(!dual.all.rows[0].contains_key(DERIVED_BEST));
    }

    #[test]
    fn annotated_rows_share_one_key_order() {
        let dual = compute_dual(&fleet(), 2.0);
        for mode in [&dual.all, &dual.best] {
            let first: Vec<&String> = mode.rows[0].keys().collect();
            for row in &mode.rows {
                assert_eq!(row.keys().collect::<Vec<_>>(), first);
            }
        }
        // DNF row takes no part but still carries the columns
        assert_eq!(dual.all.rows[4][DERIVED_ALL], "");
        assert_eq!(dual.all.rows[4][EXCLUDED_ALL], "");
        assert_eq!(dual.all.debug.rows_skipped, 1);
    }

    #[test]
    fn rerun_on_annotated_rows_is_stable() {
        let first = compute_dual(&fleet(), 2.0);
        let second = compute_dual(&first.merged_rows(), 2.0);

        assert_relative_eq!(first.all.debug.sct.unwrap(), second.all.debug.sct.unwrap());
        assert_relative_eq!(first.best.debug.sct.unwrap(), second.best.debug.sct.unwrap());
        assert_eq!(first.all.class_stats, second.all.class_stats);
        assert_eq!(first.best.class_stats, second.best.class_stats);
        for (a, b) in first.all.rows.iter().zip(&second.all.rows) {
            assert_eq!(a[DERIVED_ALL], b[DERIVED_ALL]);
        }
    }

    #[test]
    fn edited_row_is_cleared_in_both_modes_on_rerun() {
        let mut rows = compute_dual(&fleet(), 2.0).merged_rows();
        assert_ne!(rows[0][DERIVED_BEST], "");
        rows[0]["Elapsed"] = "DNF".into();

        let dual = compute_dual(&rows, 2.0);
        assert!(dual.all.error().is_none());
        assert!(dual.best.error().is_none());
        let merged = dual.merged_rows();
        for col in STAT_COLUMNS {
            assert_eq!(merged[0][col], "", "{} kept a stale value", col);
        }
    }

    #[test]
    fn manual_exclusion_applies_to_both_modes() {
        let mut rows = fleet();
        for r in rows.iter_mut() {
            r.insert("Excluded manual".into(), "No".into());
        }
        rows[0]["Excluded manual"] = "Yes".into();
        let dual = compute_dual(&rows, 2.0);
        assert_eq!(dual.all.rows[0][DERIVED_ALL], "");
        assert_eq!(dual.best.rows[0][DERIVED_BEST], "");
        assert_eq!(dual.all.debug.rows_manual, 1);
        assert_eq!(dual.best.debug.rows_manual, 1);
        assert_eq!(dual.all.class_stats["Laser"].n, 1);
    }

    #[test]
    fn merged_rows_carry_every_column() {
        let dual = compute_dual(&fleet(), 2.0);
        let merged = dual.merged_rows();
        for col in STAT_COLUMNS {
            assert!(merged[0].contains_key(col), "missing {}", col);
        }
        assert_eq!(merged[0][DERIVED_ALL], dual.all.rows[0][DERIVED_ALL]);
        assert_eq!(merged[0][DERIVED_BEST], dual.best.rows[0][DERIVED_BEST]);
    }
}
