// Shared formatting and numeric helpers.
//
// Everything "presentational" about numbers lives here so the analytics
// code can keep full precision and the renderers agree on display rules.
use chrono::Local;
use num_format::{Locale, ToFormattedString};

pub fn average(v: &[f64]) -> f64 {
    // Arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Percentage of `part` over `whole`, with the zero-denominator case
/// reported as 0 rather than NaN.
pub fn pct(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    part / whole * 100.0
}

/// Display rounding for distances (2 decimals). Underlying values keep
/// full precision; only rendered output goes through this.
pub fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

/// Display rounding for speeds (1 decimal).
pub fn round1(n: f64) -> f64 {
    (n * 10.0).round() / 10.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus locale-aware thousands separators
    // (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Export filename: `Rapport_<page>_<timestamp>.<ext>`, spaces and
/// slashes in the page name replaced so the name stays filesystem-safe.
pub fn export_filename(page_name: &str, extension: &str) -> String {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let clean = page_name.replace(' ', "_").replace('/', "_");
    format!("Rapport_{}_{}.{}", clean, stamp, extension)
}
