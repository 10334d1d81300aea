//! Pasted HTML results → clean, uniformly keyed result rows.
//!
//! The pipeline is: wrap fragments, parse, turn every `<table>` into a
//! matrix, choose the most results-like table, find its header row, then
//! emit one [`ResultRow`] per data row.

pub mod header;
pub mod matrix;
pub mod select;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::row::{clean_cell, ResultRow};
use crate::time_parser::normalize_time_string;

pub use matrix::TableMatrix;

/// Emitted rows are capped here; anything further is dropped silently.
pub const MAX_ROWS: usize = 500;

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("selector should parse"));
static TIME_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\btime\b|\belapsed\b").expect("time column regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Could not parse HTML.")]
    ParseHtml,
    #[error("No <table> elements found in the pasted HTML.")]
    NoTables,
}

impl Serialize for ExtractError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What the extractor saw, for callers reviewing a paste.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub tables_found: usize,
    pub chosen_table_index: Option<usize>,
    pub chosen_table_score: Option<i64>,
    pub header_row_index: Option<usize>,
    pub raw_matrix: TableMatrix,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Extraction {
    pub rows: Vec<ResultRow>,
    pub diagnostics: Diagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExtractError>,
}

impl Extraction {
    fn failed(error: ExtractError, diagnostics: Diagnostics) -> Self {
        warn!(%error, "extraction failed");
        Self {
            rows: Vec::new(),
            diagnostics,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn wrap_fragment(html: &str) -> String {
    if html.to_lowercase().contains("<html") {
        html.to_string()
    } else {
        format!(
            "<!doctype html><html><head><meta charset=\"utf-8\"></head><body>{}</body></html>",
            html
        )
    }
}

/// Extract the results table from `html`.
///
/// Failures come back in [`Extraction::error`] with whatever diagnostics were
/// gathered up to that point; rows are empty in that case.
#[tracing::instrument(level = "debug", skip(html), fields(len = html.len()))]
pub fn extract(html: &str) -> Extraction {
    let mut diagnostics = Diagnostics::default();

    // html5ever recovers from any markup; only a blank paste is unusable
    if html.trim().is_empty() {
        return Extraction::failed(ExtractError::ParseHtml, diagnostics);
    }
    let doc = Html::parse_document(&wrap_fragment(html));

    // ─── 1) every table as a matrix ─────────────────────────────────
    let mut matrices: Vec<TableMatrix> = doc
        .select(&TABLE_SELECTOR)
        .map(matrix::table_to_matrix)
        .collect();
    diagnostics.tables_found = matrices.len();
    debug!(tables = matrices.len(), "tables found");

    // ─── 2) choose the results table ────────────────────────────────
    let Some(chosen) = select::choose_table(&matrices) else {
        return Extraction::failed(ExtractError::NoTables, diagnostics);
    };
    info!(index = chosen.index, score = chosen.score, "chose table");
    diagnostics.chosen_table_index = Some(chosen.index);
    diagnostics.chosen_table_score = Some(chosen.score);
    let matrix = matrices.swap_remove(chosen.index);

    // ─── 3) header row ──────────────────────────────────────────────
    let header_idx = header::detect_header_row(&matrix);
    diagnostics.header_row_index = header_idx;
    let (headers, data_start) = match header_idx {
        Some(i) => (header::normalize_headers(&matrix[i]), i + 1),
        None => {
            debug!("no confident header row; using generic column names");
            let (_, width) = matrix::dimensions(&matrix);
            (header::synthetic_headers(width), 0)
        }
    };

    // ─── 4) data rows ───────────────────────────────────────────────
    let mut rows = build_rows(&matrix[data_start.min(matrix.len())..], &headers);
    normalize_time_columns(&mut rows, &headers);
    info!(rows = rows.len(), columns = headers.len(), "extracted rows");

    diagnostics.raw_matrix = matrix;
    Extraction {
        rows,
        diagnostics,
        error: None,
    }
}

fn build_rows(data: &[Vec<String>], headers: &[String]) -> Vec<ResultRow> {
    let mut rows = Vec::new();
    for cells in data {
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let values: Vec<String> = (0..headers.len())
            .map(|c| cells.get(c).map(|v| clean_cell(v)).unwrap_or_default())
            .collect();
        if header::looks_like_header_repeat(&values, headers) {
            debug!(?values, "skipping repeated header row");
            continue;
        }

        rows.push(headers.iter().cloned().zip(values).collect::<ResultRow>());
        if rows.len() >= MAX_ROWS {
            warn!(cap = MAX_ROWS, "row cap reached; truncating table");
            break;
        }
    }
    rows
}

fn normalize_time_columns(rows: &mut [ResultRow], headers: &[String]) {
    let time_cols: Vec<&String> = headers.iter().filter(|h| TIME_COLUMN.is_match(h)).collect();
    if time_cols.is_empty() {
        return;
    }
    for row in rows.iter_mut() {
        for col in &time_cols {
            if let Some(v) = row.get_mut(col.as_str()) {
                if !v.is_empty() {
                    *v = normalize_time_string(v);
                }
            }
        }
    }
}
