// src/report.rs
//! Flat per-class records for whatever stores class-statistics history.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::stats::{ModeResult, SctBasis};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStatRecord {
    pub class_name: String,
    pub derived_py: f64,
    /// Same value as `derived_py`; storage keeps both names.
    pub derived_gl: f64,
    pub sct: f64,
    pub sample_n: usize,
    /// `None` for best-of-class runs.
    pub outlier_k: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// One record per class of a successful run; a failed run yields none.
pub fn class_stat_records(result: &ModeResult, generated_at: DateTime<Utc>) -> Vec<ClassStatRecord> {
    if result.error().is_some() {
        return Vec::new();
    }
    result
        .class_stats
        .values()
        .map(|cs| ClassStatRecord {
            class_name: cs.class.clone(),
            derived_py: cs.derived_py,
            derived_gl: cs.derived_py,
            sct: cs.sct,
            sample_n: cs.n,
            outlier_k: match cs.basis {
                SctBasis::AllBoats { k, .. } => Some(k),
                SctBasis::BestOfClass { .. } => None,
            },
            updated_at: generated_at,
        })
        .collect()
}
