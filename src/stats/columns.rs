// src/stats/columns.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::annotate::is_annotation_column;

fn ci(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).expect("column pattern should compile")
}

static CLASS: Lazy<Regex> = Lazy::new(|| ci(r"\bclass\b"));
static CLASS_FALLBACK: Lazy<Regex> = Lazy::new(|| ci(r"boat\s*name|boatname|type|design"));
static ELAPSED: Lazy<Regex> = Lazy::new(|| ci(r"\btime\b|\belapsed\b"));
static LAPS: Lazy<Regex> = Lazy::new(|| ci(r"\blap"));
static RATING: Lazy<Regex> = Lazy::new(|| ci(r"\bgl\b|\bpy\b|handicap"));
static SAIL_NO: Lazy<Regex> = Lazy::new(|| ci(r"sail\s*no|sailno|sailnos"));
static HELM: Lazy<Regex> = Lazy::new(|| ci(r"\bhelm\b"));
static BOAT_NAME: Lazy<Regex> = Lazy::new(|| ci(r"boat\s*name|boatname"));

/// Names under which callers can force a row out of the statistics.
pub const MANUAL_EXCLUSION_ALIASES: [&str; 2] = ["Excluded manual", "Manual Excluded"];

/// Which header plays which role, resolved once per row set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnMap {
    pub class: Option<String>,
    pub elapsed: Option<String>,
    pub laps: Option<String>,
    pub rating: Option<String>,
    pub sail_no: Option<String>,
    pub helm: Option<String>,
    pub boat_name: Option<String>,
    pub manual_exclusion: Option<String>,
}

/// A [`ColumnMap`] that has every column the statistics need.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredColumns {
    pub class: String,
    pub elapsed: String,
    pub rating: String,
    pub optional: ColumnMap,
}

fn first_match(headers: &[&String], re: &Regex) -> Option<String> {
    headers.iter().find(|h| re.is_match(h)).map(|h| h.to_string())
}

impl ColumnMap {
    /// Resolve roles from header names; the first matching header wins.
    /// The engine's own output columns never take part.
    pub fn resolve(headers: &[String]) -> Self {
        let usable: Vec<&String> = headers.iter().filter(|h| !is_annotation_column(h)).collect();

        let class = first_match(&usable, &CLASS).or_else(|| first_match(&usable, &CLASS_FALLBACK));
        let manual_exclusion = MANUAL_EXCLUSION_ALIASES
            .iter()
            .find(|alias| headers.iter().any(|h| h == *alias))
            .map(|alias| alias.to_string());

        let map = Self {
            class,
            elapsed: first_match(&usable, &ELAPSED),
            laps: first_match(&usable, &LAPS),
            rating: first_match(&usable, &RATING),
            sail_no: first_match(&usable, &SAIL_NO),
            helm: first_match(&usable, &HELM),
            boat_name: first_match(&usable, &BOAT_NAME),
            manual_exclusion,
        };
        debug!(columns = ?map, "resolved columns");
        map
    }

    /// `None` unless class, elapsed and rating all resolved.
    pub fn required(&self) -> Option<RequiredColumns> {
        Some(RequiredColumns {
            class: self.class.clone()?,
            elapsed: self.elapsed.clone()?,
            rating: self.rating.clone()?,
            optional: self.clone(),
        })
    }
}
