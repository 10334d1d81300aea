// src/qa.rs
//! Flags rows whose elapsed time looks like a typo: far slower per lap than
//! the race median, or simply implausibly long.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::row::{cell, header_names, ResultRow};
use crate::stats::columns::ColumnMap;
use crate::stats::entry::parse_laps;
use crate::stats::math::{median, round_rating};
use crate::time_parser::time_to_seconds;

/// Below this many usable rows the median is not trusted.
pub const MIN_SAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaThresholds {
    /// Flag when per-lap elapsed ≥ median × this.
    pub per_lap_median_multiple: f64,
    /// Flag when total elapsed ≥ this many seconds.
    pub max_elapsed_secs: f64,
}

impl Default for QaThresholds {
    fn default() -> Self {
        Self {
            per_lap_median_multiple: 3.0,
            max_elapsed_secs: 8.0 * 3600.0,
        }
    }
}

impl QaThresholds {
    /// Apply the floors: a multiple of at least 2 and at least one hour.
    pub fn clamped(self) -> Self {
        let default = Self::default();
        let multiple = if self.per_lap_median_multiple.is_finite() {
            self.per_lap_median_multiple.max(2.0)
        } else {
            default.per_lap_median_multiple
        };
        let max_elapsed = if self.max_elapsed_secs.is_finite() {
            self.max_elapsed_secs.max(3600.0)
        } else {
            default.max_elapsed_secs
        };
        Self {
            per_lap_median_multiple: multiple,
            max_elapsed_secs: max_elapsed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaFlag {
    pub row_index: usize,
    pub sail: String,
    pub helm: String,
    pub class: String,
    pub laps: u32,
    pub elapsed_s: f64,
    pub per_lap_s: f64,
    pub reason: String,
}

struct Timed {
    index: usize,
    laps: u32,
    elapsed: f64,
    per_lap: f64,
}

#[tracing::instrument(level = "debug", skip(rows, thresholds), fields(rows = rows.len()))]
pub fn flag_suspicious_rows(rows: &[ResultRow], thresholds: &QaThresholds) -> Vec<QaFlag> {
    let cols = ColumnMap::resolve(&header_names(rows));
    let Some(elapsed_col) = cols.elapsed.as_deref() else {
        debug!("no elapsed column; nothing to check");
        return Vec::new();
    };

    let timed: Vec<Timed> = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| {
            let elapsed = time_to_seconds(cell(row, Some(elapsed_col)))?;
            if elapsed <= 0.0 {
                return None;
            }
            let laps = match cols.laps.as_deref() {
                Some(col) => parse_laps(cell(row, Some(col))),
                None => 1,
            };
            Some(Timed {
                index,
                laps,
                elapsed,
                per_lap: elapsed / f64::from(laps),
            })
        })
        .collect();

    if timed.len() < MIN_SAMPLES {
        debug!(usable = timed.len(), "too few timed rows for a median");
        return Vec::new();
    }
    let per_laps: Vec<f64> = timed.iter().map(|t| t.per_lap).collect();
    let Some(med) = median(&per_laps).filter(|m| *m > 0.0) else {
        return Vec::new();
    };

    let m = thresholds.per_lap_median_multiple;
    let flags: Vec<QaFlag> = timed
        .iter()
        .filter_map(|t| {
            let reason = if t.elapsed >= thresholds.max_elapsed_secs {
                format!("Elapsed very large ({}s)", t.elapsed.trunc() as i64)
            } else if t.per_lap >= med * m {
                format!(
                    "Per-lap elapsed {}s is > median {}s × {}",
                    round_rating(t.per_lap),
                    round_rating(med),
                    m
                )
            } else {
                return None;
            };
            let row = &rows[t.index];
            Some(QaFlag {
                row_index: t.index,
                sail: cell(row, cols.sail_no.as_deref()).to_string(),
                helm: cell(row, cols.helm.as_deref()).to_string(),
                class: cell(row, cols.class.as_deref()).to_string(),
                laps: t.laps,
                elapsed_s: t.elapsed,
                per_lap_s: t.per_lap,
                reason,
            })
        })
        .collect();

    info!(median = med, flagged = flags.len(), "data QA done");
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(class: &str, sail: &str, elapsed: &str, laps: &str) -> ResultRow {
        [("Class", class), ("Sail No", sail), ("Helm", "Jo"), ("Laps", laps), ("Elapsed", elapsed)]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn race() -> Vec<ResultRow> {
        vec![
            row("Laser", "1", "0:40:00", "2"),
            row("Laser", "2", "0:42:00", "2"),
            row("Solo", "3", "0:21:00", "1"),
            row("Solo", "4", "0:20:00", "1"),
            row("Topper", "5", "0:22:00", "1"),
        ]
    }

    #[test]
    fn clean_race_has_no_flags() {
        assert!(flag_suspicious_rows(&race(), &QaThresholds::default()).is_empty());
    }

    #[test]
    fn typo_elapsed_is_flagged_against_median() {
        let mut rows = race();
        // 2:10:00 typed instead of 0:21:00
        rows[2]["Elapsed"] = "2:10:00".into();
        let flags = flag_suspicious_rows(&rows, &QaThresholds::default());
        assert_eq!(flags.len(), 1);
        let f = &flags[0];
        assert_eq!(f.row_index, 2);
        assert_eq!(f.sail, "3");
        assert_eq!(f.class, "Solo");
        assert_eq!(f.reason, "Per-lap elapsed 7800s is > median 1260s × 3");
    }

    #[test]
    fn absolute_limit_takes_precedence() {
        let mut rows = race();
        rows[0]["Elapsed"] = "9:00:00".into();
        let flags = flag_suspicious_rows(&rows, &QaThresholds::default());
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].reason, "Elapsed very large (32400s)");
        assert_eq!(flags[0].laps, 2);
    }

    #[test]
    fn too_few_rows_or_no_elapsed_column() {
        let rows = race()[..4].to_vec();
        assert!(flag_suspicious_rows(&rows, &QaThresholds::default()).is_empty());

        let no_time: Vec<ResultRow> = race()
            .into_iter()
            .map(|mut r| {
                r.shift_remove("Elapsed");
                r
            })
            .collect();
        assert!(flag_suspicious_rows(&no_time, &QaThresholds::default()).is_empty());
    }

    #[test]
    fn thresholds_are_clamped() {
        let t = QaThresholds {
            per_lap_median_multiple: 1.2,
            max_elapsed_secs: 60.0,
        }
        .clamped();
        assert_eq!(t.per_lap_median_multiple, 2.0);
        assert_eq!(t.max_elapsed_secs, 3600.0);
    }
}
