// src/stats/all_boats.rs
//! SCT from every boat's average corrected time per lap, with boats outside
//! `mean ± kσ` rejected as outliers.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::annotate::{reserve_columns, write_verdict, Mode, Verdict, OUTLIER_REASON};
use super::entry::{entries, BoatId, RowStatus};
use super::math::{derive_rating, mean, round_rating, stddev_sample};
use super::{prepare, ClassStat, Method, ModeResult, Prepared, SctBasis, StatsDebug, StatsError};
use crate::row::ResultRow;

/// Below this many boats the spread is not trusted for outlier rejection.
const MIN_BOATS_FOR_OUTLIERS: usize = 3;

#[tracing::instrument(level = "debug", skip(rows), fields(rows = rows.len()))]
pub fn compute_all_boats(rows: &[ResultRow], k: f64) -> ModeResult {
    let mut dbg = StatsDebug::new(Method::AllBoats, Some(k));
    let (cols, statuses) = match prepare(rows, &mut dbg) {
        Prepared::Empty => return ModeResult::unchanged(rows, dbg),
        Prepared::Failed(err) => return ModeResult::failed(rows, dbg, err),
        Prepared::Ready(cols, statuses) => (cols, statuses),
    };
    debug!(class = %cols.class, elapsed = %cols.elapsed, rating = %cols.rating, "columns");

    // ─── 1) boat averages of corrected time per lap ────────────────
    let mut groups: IndexMap<&BoatId, Vec<f64>> = IndexMap::new();
    for e in entries(&statuses) {
        groups.entry(&e.boat).or_default().push(e.corrected_per_lap);
    }
    let averages: Vec<(&BoatId, f64)> = groups
        .iter()
        .filter_map(|(boat, vals)| mean(vals).map(|m| (*boat, m)))
        .collect();
    dbg.boats_n = Some(averages.len());

    if averages.len() < 2 {
        return ModeResult::failed(rows, dbg, StatsError::NotEnoughBoats);
    }

    // ─── 2) outlier bounds ─────────────────────────────────────────
    let values: Vec<f64> = averages.iter().map(|(_, v)| *v).collect();
    let avg_mean = mean(&values).unwrap_or_default();
    let sd = stddev_sample(&values);
    dbg.mean = Some(avg_mean);
    dbg.stddev = Some(sd);

    let mut excluded: HashSet<&BoatId> = HashSet::new();
    if values.len() >= MIN_BOATS_FOR_OUTLIERS && sd > 0.0 {
        let (low, high) = (avg_mean - k * sd, avg_mean + k * sd);
        dbg.low = Some(low);
        dbg.high = Some(high);
        for (boat, avg) in &averages {
            if *avg < low || *avg > high {
                debug!(boat = %boat, avg, low, high, "outlier boat");
                excluded.insert(*boat);
            }
        }
    }
    dbg.boats_excluded = Some(excluded.len());

    // ─── 3) SCT over the kept boats ────────────────────────────────
    let kept: Vec<f64> = averages
        .iter()
        .filter(|(boat, _)| !excluded.contains(boat))
        .map(|(_, v)| *v)
        .collect();
    let Some(sct) = mean(&kept) else {
        return ModeResult::failed(rows, dbg, StatsError::AllBoatsExcluded);
    };
    dbg.sct = Some(sct);
    info!(sct, boats = averages.len(), excluded = excluded.len(), "all-boats SCT");

    // ─── 4) annotate rows and gather per-class derived values ─────
    let mut out = rows.to_vec();
    reserve_columns(&mut out, Mode::All);
    let mut by_class: IndexMap<&str, Vec<f64>> = IndexMap::new();

    for (idx, status) in statuses.iter().enumerate() {
        match status {
            RowStatus::Skipped => write_verdict(&mut out[idx], Mode::All, Verdict::Skipped),
            RowStatus::Manual => write_verdict(&mut out[idx], Mode::All, Verdict::Manual),
            RowStatus::Scored(e) => {
                let verdict = if excluded.contains(&e.boat) {
                    Verdict::Excluded {
                        reason: OUTLIER_REASON,
                    }
                } else {
                    let derived = derive_rating(e.elapsed_per_lap, sct);
                    if let Some(d) = derived {
                        by_class.entry(e.class.as_str()).or_default().push(d);
                    }
                    Verdict::Included {
                        derived: derived.map(round_rating),
                    }
                };
                write_verdict(&mut out[idx], Mode::All, verdict);
            }
        }
    }
    if by_class.is_empty() {
        warn!("no class received a derived rating");
    }

    let class_stats = by_class
        .into_iter()
        .filter_map(|(class, vals)| {
            let derived_py = mean(&vals)?;
            Some((
                class.to_string(),
                ClassStat {
                    class: class.to_string(),
                    derived_py,
                    n: vals.len(),
                    sct,
                    basis: SctBasis::AllBoats {
                        mean: avg_mean,
                        stddev: sd,
                        low: dbg.low,
                        high: dbg.high,
                        k,
                    },
                },
            ))
        })
        .collect();

    ModeResult {
        rows: out,
        class_stats,
        debug: dbg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::annotate::{DERIVED, DERIVED_ALL, EXCLUDED, EXCLUDED_ALL, MANUAL_REASON, REASON_ALL};
    use crate::stats::tests::race_row;
    use approx::assert_relative_eq;

    /// Four boats on GL 1000 over one lap: corrected/lap equals elapsed.
    fn four_boats() -> Vec<ResultRow> {
        vec![
            race_row("Laser", "1", "1000", "100", ""),
            race_row("Laser", "2", "1000", "102", ""),
            race_row("Solo", "3", "1000", "98", ""),
            race_row("Solo", "4", "1000", "500", ""),
        ]
    }

    #[test]
    fn far_boat_is_excluded_as_outlier() {
        // with only four boats a single outlier can sit at most 1.5σ out
        let out = compute_all_boats(&four_boats(), 1.4);
        assert!(out.error().is_none());
        assert_eq!(out.debug.boats_n, Some(4));
        assert_eq!(out.debug.boats_excluded, Some(1));
        assert_relative_eq!(out.debug.sct.unwrap(), 100.0);

        let far = &out.rows[3];
        assert_eq!(far[EXCLUDED_ALL], "Yes");
        assert_eq!(far[EXCLUDED], "Yes");
        assert_eq!(far[REASON_ALL], OUTLIER_REASON);
        assert_eq!(far[DERIVED_ALL], "");
        assert_eq!(far[DERIVED], "");

        assert_eq!(out.rows[0][DERIVED_ALL], "1000");
        assert_eq!(out.rows[1][DERIVED], "1020");
        assert_eq!(out.rows[2][EXCLUDED_ALL], "No");

        let solo = &out.class_stats["Solo"];
        assert_eq!(solo.n, 1);
        assert_relative_eq!(solo.derived_py, 980.0);
        assert_eq!(out.class_stats["Laser"].n, 2);
    }

    #[test]
    fn default_k_keeps_every_boat_of_four() {
        let out = compute_all_boats(&four_boats(), 2.0);
        assert_eq!(out.debug.boats_excluded, Some(0));
        assert_relative_eq!(out.debug.sct.unwrap(), 200.0);
    }

    #[test]
    fn outlier_rejected_in_larger_fleet() {
        let mut specs = vec![];
        for (i, t) in ["100", "102", "98", "101", "99", "100"].iter().enumerate() {
            specs.push(race_row("Laser", &format!("{}", i + 1), "1000", t, ""));
        }
        specs.push(race_row("Solo", "99", "1000", "500", ""));
        let out = compute_all_boats(&specs, 2.0);
        assert_eq!(out.debug.boats_excluded, Some(1));
        assert_relative_eq!(out.debug.sct.unwrap(), 100.0);
        let far = &out.rows[6];
        assert_eq!(far[EXCLUDED_ALL], "Yes");
        assert_eq!(far[DERIVED_ALL], "");
        assert_eq!(far[DERIVED], "");
        assert_eq!(out.rows[0][DERIVED_ALL], "1000");
        assert!(!out.class_stats.contains_key("Solo"));
    }

    #[test]
    fn two_boats_are_never_thresholded() {
        let rows = vec![
            race_row("Laser", "1", "1000", "100", ""),
            race_row("Solo", "2", "1000", "900", ""),
        ];
        let out = compute_all_boats(&rows, 0.1);
        assert_eq!(out.debug.boats_excluded, Some(0));
        assert_eq!(out.debug.low, None);
        assert_relative_eq!(out.debug.sct.unwrap(), 500.0);
    }

    #[test]
    fn repeated_boat_is_averaged_once() {
        let rows = vec![
            race_row("Laser", "1", "1000", "100", ""),
            race_row("Laser", "1", "1000", "120", ""),
            race_row("Solo", "2", "1000", "90", ""),
        ];
        let out = compute_all_boats(&rows, 2.0);
        assert_eq!(out.debug.boats_n, Some(2));
        assert_relative_eq!(out.debug.sct.unwrap(), 100.0);
    }

    #[test]
    fn single_boat_is_not_enough() {
        let rows = vec![
            race_row("Laser", "1", "1000", "100", ""),
            race_row("Laser", "1", "1000", "101", ""),
        ];
        let out = compute_all_boats(&rows, 2.0);
        assert_eq!(out.error(), Some(&StatsError::NotEnoughBoats));
        assert_eq!(out.rows, rows);
        assert!(out.class_stats.is_empty());
    }

    #[test]
    fn all_excluded_when_k_is_negative() {
        let out = compute_all_boats(&four_boats(), -1.0);
        assert_eq!(out.error(), Some(&StatsError::AllBoatsExcluded));
        assert!(out.debug.mean.is_some());
    }

    #[test]
    fn row_turned_unusable_loses_old_annotation() {
        let first = compute_all_boats(&four_boats(), 2.0);
        assert_eq!(first.rows[0][DERIVED_ALL], "500");

        let mut edited = first.rows.clone();
        edited[0]["Elapsed"] = "DNF".into();
        let out = compute_all_boats(&edited, 2.0);
        assert_eq!(out.debug.rows_skipped, 1);
        let row = &out.rows[0];
        assert_eq!(row[DERIVED_ALL], "");
        assert_eq!(row[DERIVED], "");
        assert_eq!(row[EXCLUDED_ALL], "");
        assert_eq!(row[EXCLUDED], "");
        assert_eq!(row[REASON_ALL], "");
        assert_eq!(out.rows.len(), edited.len());
    }

    #[test]
    fn manual_rows_are_annotated_but_ignored() {
        let mut rows = four_boats();
        for r in rows.iter_mut() {
            r.insert("Excluded manual".into(), "No".into());
        }
        rows[3]["Excluded manual"] = "yes".into();
        let out = compute_all_boats(&rows, 2.0);
        assert_eq!(out.debug.boats_n, Some(3));
        assert_relative_eq!(out.debug.sct.unwrap(), 100.0);
        let manual = &out.rows[3];
        assert_eq!(manual[EXCLUDED_ALL], "Yes");
        assert_eq!(manual[REASON_ALL], MANUAL_REASON);
        assert_eq!(manual[DERIVED_ALL], "");
        assert_eq!(manual[DERIVED], "");
    }
}
