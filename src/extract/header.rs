// src/extract/header.rs
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::row::clean_cell;

/// Sailing-results vocabulary used both to score tables and to spot headers.
pub const KEYWORDS: &[&str] = &[
    "helm", "skipper", "sail", "sail no", "sailno", "class", "club", "rank", "place", "total",
    "points", "nett", "time", "elapsed",
];

/// Rows further down than this are never considered as a header.
const HEADER_SCAN_ROWS: usize = 8;
const MIN_HEADER_SCORE: i64 = 4;

static NUMERIC_OR_SYMBOLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\W]+$").expect("numeric cell regex"));

/// Number of distinct keywords occurring in `lowered`.
pub fn keyword_hits(lowered: &str) -> usize {
    KEYWORDS.iter().filter(|k| lowered.contains(*k)).count()
}

fn header_score(row: &[String]) -> i64 {
    let text = row.join(" ").to_lowercase();
    let keywords = 5 * keyword_hits(&text) as i64;

    let numeric = row
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty() && NUMERIC_OR_SYMBOLS.is_match(c))
        .count() as i64;

    let non_empty = row.iter().filter(|c| !c.trim().is_empty()).count().min(5) as i64;

    keywords - numeric + non_empty
}

/// Index of the row that looks most like a header, if any scores high enough.
///
/// Only the first few rows with at least two cells are candidates; on equal
/// scores the earliest row wins.
pub fn detect_header_row(matrix: &[Vec<String>]) -> Option<usize> {
    let (idx, score) = matrix
        .iter()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .filter(|(_, row)| row.len() >= 2)
        .map(|(i, row)| (i, header_score(row)))
        .fold(None, |best: Option<(usize, i64)>, (i, score)| match best {
            Some((_, top)) if score <= top => best,
            _ => Some((i, score)),
        })?;

    (score >= MIN_HEADER_SCORE).then_some(idx)
}

fn canonical_name(name: &str) -> Option<&'static str> {
    let canonical = match name.trim().to_lowercase().as_str() {
        "sailno" | "sail no" | "sail number" => "Sail No",
        "helm" | "skipper" => "Helm",
        "class" => "Class",
        "club" => "Club",
        "rank" | "place" => "Rank",
        "total" => "Total",
        "points" => "Points",
        "nett" => "Nett",
        "time" => "Time",
        "elapsed" => "Elapsed",
        _ => return None,
    };
    Some(canonical)
}

/// Turn a raw header row into unique column names.
///
/// Blank cells become `Col N`, common synonyms map to a canonical spelling,
/// and repeats (compared case-insensitively) get ` 2`, ` 3`, … appended.
pub fn normalize_headers(header_row: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    header_row
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let mut name = clean_cell(raw);
            if name.is_empty() {
                name = format!("Col {}", i + 1);
            }
            if let Some(canonical) = canonical_name(&name) {
                name = canonical.to_string();
            }

            let base = name.clone();
            let mut n = 2;
            while seen.contains(&name.to_lowercase()) {
                name = format!("{} {}", base, n);
                n += 1;
            }
            seen.insert(name.to_lowercase());
            name
        })
        .collect()
}

/// `Col 1` … `Col N` for a table without a usable header.
pub fn synthetic_headers(width: usize) -> Vec<String> {
    (1..=width).map(|c| format!("Col {}", c)).collect()
}

/// Whether a data row is really a repeated header or section banner: it
/// mentions at least `max(3, headers / 2)` of the column names.
pub fn looks_like_header_repeat(values: &[String], headers: &[String]) -> bool {
    let joined = values.join(" ").to_lowercase();
    let hits = headers
        .iter()
        .map(|h| clean_cell(h).to_lowercase())
        .filter(|h| !h.is_empty() && joined.contains(h.as_str()))
        .count();
    hits >= 3.max(headers.len() / 2)
}
