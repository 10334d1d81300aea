// src/config.rs
use std::{env, fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::qa::QaThresholds;

pub const DEFAULT_OUTLIER_K: f64 = 2.0;
pub const OUTLIER_K_ENV: &str = "SRP_OUTLIER_K";

/// Caller-owned settings; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Outlier multiplier for the all-boats mode.
    pub outlier_k: f64,
    pub qa: QaThresholds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            outlier_k: DEFAULT_OUTLIER_K,
            qa: QaThresholds::default(),
        }
    }
}

impl Settings {
    /// Read a YAML settings file and sanitize it.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let raw: Settings = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        info!(path = %path.display(), "settings loaded");
        Ok(raw.sanitized())
    }

    /// Defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// What every binary runs with: the file (or defaults), then the
    /// environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        Ok(Self::load_or_default(path)?.with_env_overrides())
    }

    /// `SRP_OUTLIER_K` wins over the file when it parses.
    pub fn with_env_overrides(self) -> Self {
        match env::var(OUTLIER_K_ENV) {
            Ok(raw) => self.with_outlier_k_override(&raw),
            Err(_) => self,
        }
    }

    fn with_outlier_k_override(mut self, raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(k) => {
                self.outlier_k = k;
                self.sanitized()
            }
            Err(e) => {
                warn!(value = raw, error = %e, "ignoring {}", OUTLIER_K_ENV);
                self
            }
        }
    }

    fn sanitized(mut self) -> Self {
        if !self.outlier_k.is_finite() || self.outlier_k < 0.0 {
            warn!(outlier_k = self.outlier_k, "invalid outlier_k, using {}", DEFAULT_OUTLIER_K);
            self.outlier_k = DEFAULT_OUTLIER_K;
        }
        self.qa = self.qa.clamped();
        self
    }
}
