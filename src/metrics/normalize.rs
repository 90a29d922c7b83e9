//! Conversion of raw report text into plain numeric sample values.
//!
//! All functions here are total: anything they cannot interpret becomes `"0"`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentinel the tool prints for unsupported or unavailable readings.
pub const NOT_AVAILABLE: &str = "N/A";

static VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+)").expect("version pattern is valid"));

static UNIT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<value>[\d.]+)\s*(?P<prefix>[KMGT]?i?)(?P<unit>.*)")
        .expect("unit pattern is valid")
});

static NON_NUMERIC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9.]").expect("digit filter pattern is valid"));

/// Extract the leading `<major>.<minor>` of a version string.
///
/// `"450.80.02"` becomes `"450.80"`; anything without such a pair becomes `"0"`.
pub fn version(raw: &str) -> String {
    VERSION_REGEX
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "0".to_string())
}

/// Scale a `<number> <prefix><unit>` reading to its base unit.
///
/// Decimal prefixes `K`, `M`, `G`, `T` multiply by powers of 1000 and binary
/// prefixes `Ki`, `Mi`, `Gi`, `Ti` by powers of 1024. The unit itself is
/// dropped, so `"16128 MiB"` becomes `"16911433728"` and `"250.00 W"`
/// becomes `"250"`.
pub fn unit_value(raw: &str) -> String {
    if raw == NOT_AVAILABLE {
        return "0".to_string();
    }

    let Some(caps) = UNIT_REGEX.captures(raw) else {
        return "0".to_string();
    };

    let Ok(value) = caps["value"].parse::<f64>() else {
        return "0".to_string();
    };

    let scaled = value * prefix_multiplier(&caps["prefix"]);
    format_number(scaled)
}

/// Keep only digits and decimal points, e.g. `"P0"` becomes `"0"` and
/// `"16x"` becomes `"16"`.
pub fn digits(raw: &str) -> String {
    if raw == NOT_AVAILABLE {
        return "0".to_string();
    }

    let stripped = NON_NUMERIC_REGEX.replace_all(raw, "");
    if stripped.is_empty() {
        "0".to_string()
    } else {
        stripped.into_owned()
    }
}

/// Values the tool already prints as bare numbers.
///
/// The text is kept as is; only the sentinel and missing fields become `"0"`.
pub fn passthrough(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn prefix_multiplier(prefix: &str) -> f64 {
    match prefix {
        "K" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "Ki" => 1024.0,
        "Mi" => 1024.0 * 1024.0,
        "Gi" => 1024.0 * 1024.0 * 1024.0,
        "Ti" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => 1.0,
    }
}

/// Shortest plain decimal rendering, without exponent or trailing `.0`.
fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    format!("{}", value)
}
