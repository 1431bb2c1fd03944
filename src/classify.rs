// Row classification rules shared by every page.
//
// The workbook mixes three kinds of rows under the same grouping column:
// real vehicles, point-of-interest zones, and metadata/summary rows whose
// identifier starts with a year token (e.g. "2025-08-25 au 2025-08-31").
// The predicates below are the single source of truth; pages must never
// re-derive them inline or vehicle counts drift between pages.
use crate::types::{Datasets, SheetKey};

/// Sentinel the telemetry provider writes into filler rows.
pub const PLACEHOLDER: &str = "-----";

/// Known prefix of point-of-interest names in this fleet's workbook.
const POI_NAME_PREFIX: &str = "BP";

/// True when the identifier denotes a real vehicle: non-empty, not the
/// placeholder sentinel, and not a metadata row (first four characters
/// are ASCII digits, the workbook's year-prefix convention).
pub fn is_vehicle_row(identifier: Option<&str>) -> bool {
    let id = match identifier {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => return false,
    };
    if id == PLACEHOLDER {
        return false;
    }
    !has_year_prefix(id)
}

fn has_year_prefix(id: &str) -> bool {
    let digits: Vec<char> = id.chars().take(4).collect();
    digits.len() == 4 && digits.iter().all(|c| c.is_ascii_digit())
}

/// Canonical vehicle roster: unique identifiers from the duration-distance
/// dataset passing `is_vehicle_row`, in first-seen order.
pub fn vehicle_roster(data: &Datasets) -> Vec<String> {
    let ds = data.get(SheetKey::DurationDistance);
    let mut seen = Vec::new();
    for row in &ds.rows {
        let id = ds.identifier(row);
        if is_vehicle_row(id) {
            let id = id.unwrap_or_default();
            if !seen.iter().any(|s: &String| s == id) {
                seen.push(id.to_string());
            }
        }
    }
    seen
}

// Two POI heuristics coexist on purpose. The POI-time page treats any
// non-roster row as a POI; the POI-visits page matches the known name
// prefix instead. They can disagree on rows, and which rows land on
// which page depends on that disagreement, so they stay separate.

/// POI-time page heuristic: a row is a POI iff its identifier is not in
/// the vehicle roster (metadata rows excluded separately).
pub fn is_poi_by_roster(identifier: &str, roster: &[String]) -> bool {
    !roster.iter().any(|v| v == identifier)
}

/// POI-visits page heuristic: a row is a POI iff its identifier carries
/// the fleet's POI name prefix.
pub fn is_poi_by_prefix(identifier: &str) -> bool {
    identifier.starts_with(POI_NAME_PREFIX)
}

/// Parse the workbook's duration convention into minutes.
///
/// Accepts `hh:mm:ss` and `N jours hh:mm` (also the singular "jour").
/// Anything unparseable counts as 0, like blank cells.
pub fn parse_duration_minutes(raw: &str) -> f64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0.0;
    }
    if raw.contains("jour") {
        let parts: Vec<&str> = raw.split(' ').collect();
        if parts.len() >= 3 {
            if let Ok(days) = parts[0].parse::<f64>() {
                let time: Vec<&str> = parts[2].split(':').collect();
                if time.len() >= 2 {
                    if let (Ok(h), Ok(m)) = (time[0].parse::<f64>(), time[1].parse::<f64>()) {
                        return days * 24.0 * 60.0 + h * 60.0 + m;
                    }
                }
            }
        }
        return 0.0;
    }
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() == 3 {
        if let (Ok(h), Ok(m), Ok(s)) = (
            parts[0].parse::<f64>(),
            parts[1].parse::<f64>(),
            parts[2].parse::<f64>(),
        ) {
            return h * 60.0 + m + s / 60.0;
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::sample_datasets;

    #[test]
    fn vehicle_predicate_truth_table() {
        assert!(!is_vehicle_row(None));
        assert!(!is_vehicle_row(Some("")));
        assert!(!is_vehicle_row(Some("   ")));
        assert!(!is_vehicle_row(Some(PLACEHOLDER)));
        assert!(!is_vehicle_row(Some("2025-08-25 au 2025-08-31")));
        assert!(!is_vehicle_row(Some("1999 summary")));
        assert!(is_vehicle_row(Some("V1")));
        assert!(is_vehicle_row(Some("BP Station Nord")));
        // Fewer than four leading digits is not a metadata row.
        assert!(is_vehicle_row(Some("208D-AB")));
    }

    #[test]
    fn roster_is_unique_and_ordered() {
        let data = sample_datasets();
        assert_eq!(vehicle_roster(&data), vec!["V1", "V2"]);
    }

    #[test]
    fn poi_heuristics_stay_distinct() {
        let roster = vec!["V1".to_string(), "V2".to_string()];
        // "Depot Central" is a POI for the roster heuristic only.
        assert!(is_poi_by_roster("Depot Central", &roster));
        assert!(!is_poi_by_prefix("Depot Central"));
        // Both agree on the prefixed station.
        assert!(is_poi_by_roster("BP Station Nord", &roster));
        assert!(is_poi_by_prefix("BP Station Nord"));
        assert!(!is_poi_by_roster("V1", &roster));
    }

    #[test]
    fn duration_parsing() {
        assert_eq!(parse_duration_minutes("01:30:00"), 90.0);
        assert_eq!(parse_duration_minutes("2 jours 03:15"), 2.0 * 1440.0 + 195.0);
        assert_eq!(parse_duration_minutes("1 jour 00:10"), 1450.0);
        assert_eq!(parse_duration_minutes("garbage"), 0.0);
        assert_eq!(parse_duration_minutes(""), 0.0);
    }
}
