// Grouped aggregation primitives shared by all analysis pages.
//
// Every page does the same shape of work: filter rows through the
// classifier, group by identifier, aggregate, sort, cap to top-N. The
// helpers here keep full precision; display rounding happens in the
// page generators.
use crate::classify::is_vehicle_row;
use crate::types::{Cell, Dataset};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Rows of `ds` whose identifier passes the vehicle predicate.
pub fn vehicle_rows(ds: &Dataset) -> Vec<&Vec<Cell>> {
    ds.rows
        .iter()
        .filter(|row| is_vehicle_row(ds.identifier(row)))
        .collect()
}

/// First-seen-order grouping of `measure` by identifier, fold applied
/// per group. Rows without an identifier or a numeric value contribute
/// nothing.
fn group_fold<F>(ds: &Dataset, rows: &[&Vec<Cell>], measure: &str, fold: F) -> Vec<(String, f64)>
where
    F: Fn(&[f64]) -> f64,
{
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<f64>> = HashMap::new();
    for row in rows {
        let id = match ds.identifier(row) {
            Some(id) => id.to_string(),
            None => continue,
        };
        let value = match ds.number(row, measure) {
            Some(v) => v,
            None => continue,
        };
        if !groups.contains_key(&id) {
            order.push(id.clone());
        }
        groups.entry(id).or_default().push(value);
    }
    order
        .into_iter()
        .map(|id| {
            let vals = &groups[&id];
            let agg = fold(vals);
            (id, agg)
        })
        .collect()
}

pub fn group_sum(ds: &Dataset, rows: &[&Vec<Cell>], measure: &str) -> Vec<(String, f64)> {
    group_fold(ds, rows, measure, |v| v.iter().sum())
}

pub fn group_mean(ds: &Dataset, rows: &[&Vec<Cell>], measure: &str) -> Vec<(String, f64)> {
    group_fold(ds, rows, measure, crate::util::average)
}

pub fn group_max(ds: &Dataset, rows: &[&Vec<Cell>], measure: &str) -> Vec<(String, f64)> {
    group_fold(ds, rows, measure, |v| {
        v.iter().copied().fold(f64::MIN, f64::max)
    })
}

/// Row count per identifier (no measure column needed).
pub fn group_count(ds: &Dataset, rows: &[&Vec<Cell>]) -> Vec<(String, f64)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, f64> = HashMap::new();
    for row in rows {
        if let Some(id) = ds.identifier(row) {
            if !counts.contains_key(id) {
                order.push(id.to_string());
            }
            *counts.entry(id.to_string()).or_insert(0.0) += 1.0;
        }
    }
    order
        .into_iter()
        .map(|id| {
            let n = counts[&id];
            (id, n)
        })
        .collect()
}

/// Count per value of an arbitrary text column (notification types).
pub fn value_counts(ds: &Dataset, rows: &[&Vec<Cell>], column: &str) -> Vec<(String, f64)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, f64> = HashMap::new();
    for row in rows {
        let value = match ds.column(column).and_then(|i| row.get(i)) {
            Some(c) => match c.as_text() {
                Some(t) => t.to_string(),
                None => continue,
            },
            None => continue,
        };
        if !counts.contains_key(&value) {
            order.push(value.clone());
        }
        *counts.entry(value).or_insert(0.0) += 1.0;
    }
    order
        .into_iter()
        .map(|v| {
            let n = counts[&v];
            (v, n)
        })
        .collect()
}

/// Outer join of two grouped tables on identifier; a side missing an
/// identifier contributes 0. Left-table order first, then unmatched
/// right keys in their own order.
pub fn outer_join_zero(
    left: &[(String, f64)],
    right: &[(String, f64)],
) -> Vec<(String, f64, f64)> {
    let right_map: HashMap<&str, f64> = right.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    let left_keys: HashMap<&str, ()> = left.iter().map(|(k, _)| (k.as_str(), ())).collect();
    let mut out: Vec<(String, f64, f64)> = left
        .iter()
        .map(|(k, lv)| (k.clone(), *lv, right_map.get(k.as_str()).copied().unwrap_or(0.0)))
        .collect();
    for (k, rv) in right {
        if !left_keys.contains_key(k.as_str()) {
            out.push((k.clone(), 0.0, *rv));
        }
    }
    out
}

/// Sort descending by value and keep the first `n` rows.
pub fn sort_desc_top(mut rows: Vec<(String, f64)>, n: usize) -> Vec<(String, f64)> {
    rows.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    rows.truncate(n);
    rows
}

pub fn sort_asc(mut rows: Vec<(String, f64)>) -> Vec<(String, f64)> {
    rows.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    rows
}

/// Per-vehicle distance summary used by the duration page.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceStats {
    pub vehicle: String,
    pub total: f64,
    pub mean: f64,
    pub trips: usize,
}

/// Sum/mean/count of `measure` per vehicle, descending by total.
pub fn distance_stats(ds: &Dataset, measure: &str) -> Vec<DistanceStats> {
    let rows = vehicle_rows(ds);
    let sums = group_sum(ds, &rows, measure);
    let means: HashMap<String, f64> = group_mean(ds, &rows, measure).into_iter().collect();
    let counts: HashMap<String, f64> = group_count(ds, &rows).into_iter().collect();
    let mut out: Vec<DistanceStats> = sums
        .into_iter()
        .map(|(vehicle, total)| {
            let mean = means.get(&vehicle).copied().unwrap_or(0.0);
            let trips = counts.get(&vehicle).copied().unwrap_or(0.0) as usize;
            DistanceStats {
                vehicle,
                total,
                mean,
                trips,
            }
        })
        .collect();
    out.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(Ordering::Equal));
    out
}

/// The five ordered speed-violation tiers. Boundaries are inclusive on
/// the lower tier; evaluation is in ascending threshold order, first
/// match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeverityTier {
    Conforme,
    Legere,
    Moderee,
    Grave,
    TresGrave,
}

impl SeverityTier {
    pub const ALL: [SeverityTier; 5] = [
        SeverityTier::Conforme,
        SeverityTier::Legere,
        SeverityTier::Moderee,
        SeverityTier::Grave,
        SeverityTier::TresGrave,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SeverityTier::Conforme => "Conforme",
            SeverityTier::Legere => "Légère (51-60)",
            SeverityTier::Moderee => "Modérée (61-80)",
            SeverityTier::Grave => "Grave (81-100)",
            SeverityTier::TresGrave => "Très Grave (>100)",
        }
    }

    /// Recommended sanction, shown on the speed-limits page.
    pub fn sanction(self) -> &'static str {
        match self {
            SeverityTier::Conforme => "Aucune",
            SeverityTier::Legere => "Avertissement verbal",
            SeverityTier::Moderee => "Avertissement écrit",
            SeverityTier::Grave => "Suspension 1 semaine",
            SeverityTier::TresGrave => "Suspension 1 mois",
        }
    }
}

/// Classify a maximum-speed value into its severity tier.
pub fn classify_severity(max_speed: f64) -> SeverityTier {
    if max_speed <= 50.0 {
        SeverityTier::Conforme
    } else if max_speed <= 60.0 {
        SeverityTier::Legere
    } else if max_speed <= 80.0 {
        SeverityTier::Moderee
    } else if max_speed <= 100.0 {
        SeverityTier::Grave
    } else {
        SeverityTier::TresGrave
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::dataset;
    use crate::types::COL_DISTANCE;
    use pretty_assertions::assert_eq;

    #[test]
    fn sum_per_vehicle_and_top_one() {
        let ds = dataset("t", COL_DISTANCE, &[("V1", 10.0), ("V1", 20.0), ("V2", 5.0)]);
        let rows = vehicle_rows(&ds);
        let sums = group_sum(&ds, &rows, COL_DISTANCE);
        assert_eq!(
            sums,
            vec![("V1".to_string(), 30.0), ("V2".to_string(), 5.0)]
        );
        let top = sort_desc_top(sums, 1);
        assert_eq!(top, vec![("V1".to_string(), 30.0)]);
    }

    #[test]
    fn metadata_and_placeholder_rows_are_filtered() {
        let ds = dataset(
            "t",
            COL_DISTANCE,
            &[("2025-08-25", 99.0), ("-----", 99.0), ("V1", 1.0)],
        );
        let rows = vehicle_rows(&ds);
        assert_eq!(group_sum(&ds, &rows, COL_DISTANCE), vec![("V1".to_string(), 1.0)]);
    }

    #[test]
    fn reaggregation_is_idempotent() {
        let ds = dataset("t", COL_DISTANCE, &[("V1", 10.0), ("V1", 20.0), ("V2", 5.0)]);
        let rows = vehicle_rows(&ds);
        let once = group_sum(&ds, &rows, COL_DISTANCE);
        // Feed the aggregate back through the same grouping.
        let agg_ds = dataset(
            "agg",
            COL_DISTANCE,
            &once
                .iter()
                .map(|(k, v)| (k.as_str(), *v))
                .collect::<Vec<_>>(),
        );
        let agg_rows = vehicle_rows(&agg_ds);
        let twice = group_sum(&agg_ds, &agg_rows, COL_DISTANCE);
        assert_eq!(once, twice);
    }

    #[test]
    fn mean_max_count() {
        let ds = dataset("t", COL_DISTANCE, &[("V1", 10.0), ("V1", 20.0), ("V2", 5.0)]);
        let rows = vehicle_rows(&ds);
        assert_eq!(
            group_mean(&ds, &rows, COL_DISTANCE),
            vec![("V1".to_string(), 15.0), ("V2".to_string(), 5.0)]
        );
        assert_eq!(
            group_max(&ds, &rows, COL_DISTANCE),
            vec![("V1".to_string(), 20.0), ("V2".to_string(), 5.0)]
        );
        assert_eq!(
            group_count(&ds, &rows),
            vec![("V1".to_string(), 2.0), ("V2".to_string(), 1.0)]
        );
    }

    #[test]
    fn outer_join_fills_missing_side_with_zero() {
        let day = vec![("V1".to_string(), 70.0), ("V2".to_string(), 10.0)];
        let night = vec![("V2".to_string(), 25.0), ("V3".to_string(), 5.0)];
        assert_eq!(
            outer_join_zero(&day, &night),
            vec![
                ("V1".to_string(), 70.0, 0.0),
                ("V2".to_string(), 10.0, 25.0),
                ("V3".to_string(), 0.0, 5.0),
            ]
        );
    }

    #[test]
    fn severity_boundaries() {
        assert_eq!(classify_severity(50.0), SeverityTier::Conforme);
        assert_eq!(classify_severity(50.1), SeverityTier::Legere);
        assert_eq!(classify_severity(60.0), SeverityTier::Legere);
        assert_eq!(classify_severity(60.1), SeverityTier::Moderee);
        assert_eq!(classify_severity(80.0), SeverityTier::Moderee);
        assert_eq!(classify_severity(80.1), SeverityTier::Grave);
        assert_eq!(classify_severity(100.0), SeverityTier::Grave);
        assert_eq!(classify_severity(100.1), SeverityTier::TresGrave);
    }

    #[test]
    fn severity_labels() {
        assert_eq!(classify_severity(95.0).label(), "Grave (81-100)");
        assert_eq!(classify_severity(30.0).label(), "Conforme");
    }

    #[test]
    fn distance_stats_ordering() {
        let ds = dataset("t", COL_DISTANCE, &[("V2", 5.0), ("V1", 10.0), ("V1", 20.0)]);
        let stats = distance_stats(&ds, COL_DISTANCE);
        assert_eq!(stats[0].vehicle, "V1");
        assert_eq!(stats[0].total, 30.0);
        assert_eq!(stats[0].mean, 15.0);
        assert_eq!(stats[0].trips, 2);
        assert_eq!(stats[1].vehicle, "V2");
    }
}
