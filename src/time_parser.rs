// src/time_parser.rs
use once_cell::sync::Lazy;
use regex::Regex;

static DOTTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)+$").expect("dotted time regex"));
static CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+:\d+(?::\d+)?(?:\.\d+)?$").expect("clock time regex"));
static PLAIN_SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?$").expect("plain seconds regex"));
// first H:MM:SS or M:SS token not followed by another digit
static TIME_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,3}:\d{2}:\d{2}|\d{1,3}:\d{2})(?:\D|$)").expect("time token regex")
});

/// Parse a free-form elapsed time into seconds.
///
/// Accepts `H:MM:SS`, `M:SS`, either with fractional seconds, dotted
/// variants without colons (`0.28.20`, `28.20`) and plain seconds (`90`).
/// Anything else yields `None`.
pub fn time_to_seconds(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }

    let t = if !t.contains(':') && DOTTED.is_match(t) {
        t.replace('.', ":")
    } else {
        t.to_string()
    };

    if CLOCK.is_match(&t) {
        let parts: Vec<f64> = t
            .split(':')
            .map(|p| p.parse::<f64>().ok())
            .collect::<Option<_>>()?;
        return match parts.as_slice() {
            [m, s] => Some(m.trunc() * 60.0 + s),
            [h, m, s] => Some(h.trunc() * 3600.0 + m.trunc() * 60.0 + s),
            _ => None,
        };
    }

    if PLAIN_SECONDS.is_match(&t) {
        return t.parse().ok();
    }

    None
}

/// Re-render a time-like cell as `H:MM:SS`.
///
/// The first `H:MM:SS` / `M:SS` token is pulled out of surrounding text.
/// `M:SS` carries whole hours out of the minutes. A token with minutes or
/// seconds ≥ 60 is returned as-is, as is anything that is not two or three
/// numeric components.
pub fn normalize_time_string(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return String::new();
    }

    let token = TIME_TOKEN
        .captures(s)
        .and_then(|c| c.get(1))
        .map_or(s, |m| m.as_str());

    let nums: Option<Vec<u64>> = token.split(':').map(|p| p.parse().ok()).collect();
    match nums.as_deref() {
        Some(&[mm, ss]) => {
            if ss >= 60 {
                return token.to_string();
            }
            format!("{}:{:02}:{:02}", mm / 60, mm % 60, ss)
        }
        Some(&[hh, mm, ss]) => {
            if mm >= 60 || ss >= 60 {
                return token.to_string();
            }
            format!("{}:{:02}:{:02}", hh, mm, ss)
        }
        _ => token.to_string(),
    }
}
