// src/stats/entry.rs
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::columns::RequiredColumns;
use crate::row::{cell, ResultRow};
use crate::time_parser::time_to_seconds;

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d*(?:\.\d*)?").expect("leading number regex"));

/// Grouping key for one competing entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BoatId(String);

impl BoatId {
    /// Sail number if present, else lower-cased `helm|boat name`, else a
    /// key unique to the row.
    fn for_row(row: &ResultRow, index: usize, cols: &RequiredColumns) -> Self {
        let sail = cell(row, cols.optional.sail_no.as_deref());
        if !sail.is_empty() {
            return Self(sail.to_string());
        }
        let helm = cell(row, cols.optional.helm.as_deref());
        let boat = cell(row, cols.optional.boat_name.as_deref());
        if helm.is_empty() && boat.is_empty() {
            return Self(format!("row:{}", index));
        }
        Self(format!("{}|{}", helm, boat).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A row that contributes to the statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub index: usize,
    pub class: String,
    pub boat: BoatId,
    pub elapsed_per_lap: f64,
    pub corrected_per_lap: f64,
}

/// How a row takes part in a statistics run.
#[derive(Debug, Clone, PartialEq)]
pub enum RowStatus {
    /// Forced out by the caller; annotated but never aggregated.
    Manual,
    /// Unusable class, time or rating; left alone.
    Skipped,
    Scored(Entry),
}

/// Whether a manual-exclusion cell says "exclude".
pub fn is_manual_flag(value: &str) -> bool {
    let v = value.trim();
    v.eq_ignore_ascii_case("yes") || v == "1" || v == "true"
}

/// Digits only, at least one lap.
pub fn parse_laps(raw: &str) -> u32 {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<u32>().unwrap_or(0).max(1)
}

/// Keep digits and dots, then read the leading number; `0.0` if none.
pub fn parse_rating(raw: &str) -> f64 {
    let kept: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    LEADING_NUMBER
        .find(&kept)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

fn score_row(index: usize, row: &ResultRow, cols: &RequiredColumns) -> RowStatus {
    if let Some(flag_col) = cols.optional.manual_exclusion.as_deref() {
        if is_manual_flag(cell(row, Some(flag_col))) {
            return RowStatus::Manual;
        }
    }

    let class = cell(row, Some(&cols.class));
    if class.is_empty() {
        return RowStatus::Skipped;
    }
    let Some(elapsed) = time_to_seconds(cell(row, Some(&cols.elapsed))) else {
        return RowStatus::Skipped;
    };
    let laps = match cols.optional.laps.as_deref() {
        Some(col) => parse_laps(row.get(col).map(String::as_str).unwrap_or("1")),
        None => 1,
    };
    let rating = parse_rating(cell(row, Some(&cols.rating)));
    if rating <= 0.0 {
        return RowStatus::Skipped;
    }

    let laps = f64::from(laps);
    RowStatus::Scored(Entry {
        index,
        class: class.to_string(),
        boat: BoatId::for_row(row, index, cols),
        elapsed_per_lap: elapsed / laps,
        corrected_per_lap: (elapsed * 1000.0 / rating) / laps,
    })
}

/// Classify every row of the set, in order.
pub fn score_rows(rows: &[ResultRow], cols: &RequiredColumns) -> Vec<RowStatus> {
    rows.iter()
        .enumerate()
        .map(|(i, r)| score_row(i, r, cols))
        .collect()
}

/// The scored entries of `statuses`, in row order.
pub fn entries(statuses: &[RowStatus]) -> impl Iterator<Item = &Entry> {
    statuses.iter().filter_map(|s| match s {
        RowStatus::Scored(e) => Some(e),
        _ => None,
    })
}
