// src/extract/select.rs
use tracing::debug;

use super::header::keyword_hits;
use super::matrix::{dimensions, TableMatrix};

const MIN_ROWS: usize = 2;
const MIN_COLS: usize = 4;
/// Rows sampled when looking for header vocabulary.
const SAMPLE_ROWS: usize = 5;
const KEYWORD_BONUS: i64 = 50;

/// The table picked as the results table.
#[derive(Debug, Clone, PartialEq)]
pub struct Chosen {
    pub index: usize,
    pub score: i64,
}

/// Area plus a bonus per results keyword in the first rows, or `None` when
/// the table is too small to hold results.
pub fn score_table(matrix: &TableMatrix) -> Option<i64> {
    let (rows, cols) = dimensions(matrix);
    if rows < MIN_ROWS || cols < MIN_COLS {
        return None;
    }

    let sample = matrix
        .iter()
        .take(SAMPLE_ROWS)
        .map(|r| r.join(" "))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    Some((rows * cols) as i64 + KEYWORD_BONUS * keyword_hits(&sample) as i64)
}

/// Highest score wins, earliest table on ties.
fn best_of(scores: impl Iterator<Item = (usize, i64)>) -> Option<Chosen> {
    scores.fold(None, |best: Option<Chosen>, (index, score)| match best {
        Some(top) if score <= top.score => Some(top),
        _ => Some(Chosen { index, score }),
    })
}

/// Pick the results table among `matrices`.
///
/// Tables under the minimum size are disqualified; when none qualifies the
/// largest table by raw area is used instead.
pub fn choose_table(matrices: &[TableMatrix]) -> Option<Chosen> {
    let scored = best_of(
        matrices
            .iter()
            .enumerate()
            .filter_map(|(i, m)| score_table(m).map(|s| (i, s))),
    );
    if scored.is_some() {
        return scored;
    }

    debug!("no table meets the minimum size; falling back to largest area");
    best_of(matrices.iter().enumerate().map(|(i, m)| {
        let (rows, cols) = dimensions(m);
        (i, (rows * cols) as i64)
    }))
}
