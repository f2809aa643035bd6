//! Sector name normalization
//!
//! Upstream providers disagree on sector taxonomy; map the common variants
//! onto one canonical set. Unrecognized names pass through unchanged.

/// Placeholder sector callers attach to symbols whose upstream fetch failed.
/// Rows carrying it are counted but never aggregated.
pub const DATA_UNAVAILABLE: &str = "Data Unavailable";

/// Map a raw provider sector name to its canonical form
pub fn normalize_sector(raw: &str) -> String {
    match raw.trim() {
        "" | "Other" => "Miscellaneous".to_string(),
        "Financial Services" => "Financials".to_string(),
        "Consumer Cyclical" => "Consumer Discretionary".to_string(),
        "Consumer Defensive" => "Consumer Staples".to_string(),
        "Basic Materials" => "Materials".to_string(),
        "Technology" => "Information Technology".to_string(),
        other => other.to_string(),
    }
}
