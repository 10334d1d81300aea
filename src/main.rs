use anyhow::{bail, Context, Result};
use chrono::Utc;
use glob::glob;
use rayon::prelude::*;
use sailrating::{
    config::Settings,
    extract::{self, Diagnostics, ExtractError},
    report::{class_stat_records, ClassStatRecord},
    stats::{compute_dual, DualResult},
    ResultRow,
};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Everything produced for one HTML file.
#[derive(Serialize)]
struct FileReport {
    file: String,
    diagnostics: Diagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    extract_error: Option<ExtractError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<DualResult>,
    merged_rows: Vec<ResultRow>,
    class_stats_all: Vec<ClassStatRecord>,
    class_stats_best: Vec<ClassStatRecord>,
}

fn process_file(path: &Path, settings: &Settings) -> Result<FileReport> {
    let html = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let start = Instant::now();

    let extraction = extract::extract(&html);
    let file = path.display().to_string();
    if let Some(err) = extraction.error {
        warn!(file = %file, error = %err, "extraction failed");
        return Ok(FileReport {
            file,
            diagnostics: extraction.diagnostics,
            extract_error: Some(err),
            stats: None,
            merged_rows: Vec::new(),
            class_stats_all: Vec::new(),
            class_stats_best: Vec::new(),
        });
    }

    let dual = compute_dual(&extraction.rows, settings.outlier_k);
    let now = Utc::now();
    let report = FileReport {
        file,
        diagnostics: extraction.diagnostics,
        extract_error: None,
        merged_rows: dual.merged_rows(),
        class_stats_all: class_stat_records(&dual.all, now),
        class_stats_best: class_stat_records(&dual.best, now),
        stats: Some(dual),
    };
    info!(
        file = %report.file,
        rows = report.merged_rows.len(),
        elapsed = ?start.elapsed(),
        "processed"
    );
    Ok(report)
}

fn main() -> Result<()> {
    // ─── 1) init logging (stderr, stdout stays JSON) ─────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) args & settings ──────────────────────────────────────────
    let mut args = std::env::args().skip(1);
    let Some(pattern) = args.next() else {
        bail!("usage: sailrating <HTML_GLOB> [SETTINGS_YAML]");
    };
    let settings_path = args.next().map(PathBuf::from);
    let settings = Settings::resolve(settings_path.as_deref())?;
    info!(outlier_k = settings.outlier_k, "startup");

    // ─── 3) discover files ───────────────────────────────────────────
    let paths: Vec<PathBuf> = glob(&pattern)
        .with_context(|| format!("bad glob pattern: {}", pattern))?
        .filter_map(|p| p.ok())
        .collect();
    if paths.is_empty() {
        warn!(pattern = %pattern, "no files matched");
        return Ok(());
    }
    info!("{} HTML files to process", paths.len());

    // ─── 4) extract + statistics, one file per worker ────────────────
    let reports: Vec<FileReport> = paths
        .par_iter()
        .filter_map(|p| match process_file(p, &settings) {
            Ok(r) => Some(r),
            Err(e) => {
                error!(file = %p.display(), "skipping: {:#}", e);
                None
            }
        })
        .collect();

    // ─── 5) emit ─────────────────────────────────────────────────────
    println!("{}", serde_json::to_string_pretty(&reports)?);
    info!(files = reports.len(), "done");
    Ok(())
}
