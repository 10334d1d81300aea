// src/stats/best_of_class.rs
//! SCT from the best boat of each class: the lowest average corrected time
//! per lap within the class. Only manual exclusion applies here.

use indexmap::IndexMap;
use tracing::{debug, info};

use super::annotate::{reserve_columns, write_verdict, Mode, Verdict};
use super::entry::{entries, BoatId, RowStatus};
use super::math::{derive_rating, mean, round_rating};
use super::{prepare, ClassStat, Method, ModeResult, Prepared, SctBasis, StatsDebug, StatsError};
use crate::row::ResultRow;

#[derive(Debug, Clone)]
struct Best<'a> {
    boat: &'a BoatId,
    corrected: f64,
}

#[tracing::instrument(level = "debug", skip(rows), fields(rows = rows.len()))]
pub fn compute_best_of_class(rows: &[ResultRow]) -> ModeResult {
    let mut dbg = StatsDebug::new(Method::BestOfClass, None);
    let statuses = match prepare(rows, &mut dbg) {
        Prepared::Empty => return ModeResult::unchanged(rows, dbg),
        Prepared::Failed(err) => return ModeResult::failed(rows, dbg, err),
        Prepared::Ready(_, statuses) => statuses,
    };

    // ─── 1) class → boat → corrected times per lap ────────────────
    let mut groups: IndexMap<&str, IndexMap<&BoatId, Vec<f64>>> = IndexMap::new();
    for e in entries(&statuses) {
        groups
            .entry(e.class.as_str())
            .or_default()
            .entry(&e.boat)
            .or_default()
            .push(e.corrected_per_lap);
    }

    // ─── 2) fastest boat average per class, first wins on ties ────
    let mut bests: IndexMap<&str, Best<'_>> = IndexMap::new();
    for (class, boats) in &groups {
        let best = boats
            .iter()
            .filter_map(|(boat, vals)| mean(vals).map(|avg| (*boat, avg)))
            .fold(None, |best: Option<Best<'_>>, (boat, avg)| match best {
                Some(b) if avg >= b.corrected => Some(b),
                _ => Some(Best { boat, corrected: avg }),
            });
        if let Some(best) = best {
            debug!(class, boat = %best.boat, corrected = best.corrected, "class best");
            bests.insert(*class, best);
        }
    }
    dbg.classes_n = Some(bests.len());

    if bests.len() < 2 {
        return ModeResult::failed(rows, dbg, StatsError::NotEnoughClasses);
    }

    let best_values: Vec<f64> = bests.values().map(|b| b.corrected).collect();
    let Some(sct) = mean(&best_values) else {
        return ModeResult::failed(rows, dbg, StatsError::NotEnoughClasses);
    };
    dbg.sct = Some(sct);
    info!(sct, classes = bests.len(), "best-of-class SCT");

    // ─── 3) annotate every scored row ─────────────────────────────
    let mut out = rows.to_vec();
    reserve_columns(&mut out, Mode::Best);
    let mut by_class: IndexMap<&str, Vec<f64>> = IndexMap::new();

    for (idx, status) in statuses.iter().enumerate() {
        match status {
            RowStatus::Skipped => write_verdict(&mut out[idx], Mode::Best, Verdict::Skipped),
            RowStatus::Manual => write_verdict(&mut out[idx], Mode::Best, Verdict::Manual),
            RowStatus::Scored(e) => {
                let derived = derive_rating(e.elapsed_per_lap, sct);
                if let Some(d) = derived {
                    by_class.entry(e.class.as_str()).or_default().push(d);
                }
                write_verdict(
                    &mut out[idx],
                    Mode::Best,
                    Verdict::Included {
                        derived: derived.map(round_rating),
                    },
                );
            }
        }
    }

    let class_stats = by_class
        .into_iter()
        .filter_map(|(class, vals)| {
            let best = bests.get(class)?;
            Some((
                class.to_string(),
                ClassStat {
                    class: class.to_string(),
                    derived_py: mean(&vals)?,
                    n: vals.len(),
                    sct,
                    basis: SctBasis::BestOfClass {
                        best_corrected_lap_s: best.corrected,
                        best_boat_id: best.boat.clone(),
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
