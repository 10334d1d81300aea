// src/bin/data_qa.rs
use anyhow::{bail, Context, Result};
use sailrating::{config::Settings, qa::flag_suspicious_rows, stats::aliases::normalize_field_aliases, ResultRow};
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(rows_path) = args.next().map(PathBuf::from) else {
        bail!("usage: data_qa <ROWS_JSON> [SETTINGS_YAML]");
    };
    let settings_path = args.next().map(PathBuf::from);
    let settings = Settings::resolve(settings_path.as_deref())?;

    let text = fs::read_to_string(&rows_path)
        .with_context(|| format!("reading {}", rows_path.display()))?;
    let mut rows: Vec<ResultRow> = serde_json::from_str(&text)
        .with_context(|| format!("parsing rows from {}", rows_path.display()))?;
    normalize_field_aliases(&mut rows);
    info!(rows = rows.len(), "loaded rows");

    let flags = flag_suspicious_rows(&rows, &settings.qa);
    info!(flagged = flags.len(), "QA complete");
    println!("{}", serde_json::to_string_pretty(&flags)?);
    Ok(())
}
