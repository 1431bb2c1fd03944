use serde::Serialize;
use std::collections::BTreeMap;

/// The eight telemetry categories of the weekly workbook, in the order
/// the source file lays them out. Sheet names are exact: a workbook
/// missing any of them fails the whole load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SheetKey {
    DurationDistance,
    Unauthorized,
    Daytime,
    Nighttime,
    Notifications,
    PoiTime,
    PoiVisits,
    Speed,
}

impl SheetKey {
    pub const ALL: [SheetKey; 8] = [
        SheetKey::DurationDistance,
        SheetKey::Unauthorized,
        SheetKey::Daytime,
        SheetKey::Nighttime,
        SheetKey::Notifications,
        SheetKey::PoiTime,
        SheetKey::PoiVisits,
        SheetKey::Speed,
    ];

    /// Exact sheet name in the source workbook.
    pub fn sheet_name(self) -> &'static str {
        match self {
            SheetKey::DurationDistance => "Durée - Distance - Conso",
            SheetKey::Unauthorized => "Trajets Non Autorisé",
            SheetKey::Daytime => "Conduite en Journée",
            SheetKey::Nighttime => "Conduite nocturne",
            SheetKey::Notifications => "Notifications",
            SheetKey::PoiTime => "Temps passé dans POI et ...",
            SheetKey::PoiVisits => "Visites POI",
            SheetKey::Speed => "Vitesse de conduite",
        }
    }
}

/// One parsed worksheet cell. Numbers keep their float form; anything
/// textual is trimmed; blanks stay distinguishable from zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Lenient numeric view: numbers pass through, numeric-looking text
    /// is parsed (thousands separators stripped), everything else is None.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => {
                let s = s.trim().replace(',', "");
                if s.is_empty() || s.chars().any(|c| c.is_ascii_alphabetic()) {
                    return None;
                }
                s.parse::<f64>().ok()
            }
            Cell::Empty => None,
        }
    }

    /// Stringified form used for column sizing and raw-data sheets.
    pub fn display(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Cell::Empty => String::new(),
        }
    }
}

/// A named table loaded from one worksheet: a header row plus data rows.
/// Immutable after load.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Dataset {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: &[Cell], column: &str) -> Cell {
        match self.column(column) {
            Some(i) => row.get(i).cloned().unwrap_or(Cell::Empty),
            None => Cell::Empty,
        }
    }

    /// Text value of the grouping/identifier column for one row.
    pub fn identifier<'a>(&self, row: &'a [Cell]) -> Option<&'a str> {
        let i = self.column(IDENTIFIER_COLUMN)?;
        row.get(i)?.as_text()
    }

    /// Numeric value of `column` for one row, None when absent/blank.
    pub fn number(&self, row: &[Cell], column: &str) -> Option<f64> {
        let i = self.column(column)?;
        row.get(i)?.as_number()
    }
}

/// The vehicle/zone grouping column shared by all eight sheets.
pub const IDENTIFIER_COLUMN: &str = "Regroupement";

// Measure columns referenced by the analytics pages.
pub const COL_DISTANCE: &str = "Distance Parcourue";
pub const COL_KILOMETRAGE: &str = "Kilométrage";
pub const COL_MAX_SPEED: &str = "Vitesse maxi";
pub const COL_VISITS: &str = "Visites";
pub const COL_NOTIFICATION: &str = "Nom de notification";
pub const COL_START_PLACE: &str = "Emplacement initial";
pub const COL_END_PLACE: &str = "Lieu d'arrivée";

/// All eight datasets of one loaded workbook, keyed by category.
/// Loaded once per uploaded file and reused read-only.
#[derive(Debug, Clone, Serialize)]
pub struct Datasets {
    sheets: BTreeMap<SheetKey, Dataset>,
}

impl Datasets {
    pub fn new(sheets: BTreeMap<SheetKey, Dataset>) -> Self {
        Datasets { sheets }
    }

    pub fn get(&self, key: SheetKey) -> &Dataset {
        // Construction guarantees all eight keys are present.
        &self.sheets[&key]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SheetKey, &Dataset)> {
        self.sheets.iter().map(|(k, v)| (*k, v))
    }
}

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// Build a one-measure dataset with the standard identifier column.
    pub fn dataset(name: &str, measure: &str, rows: &[(&str, f64)]) -> Dataset {
        Dataset::new(
            name,
            vec![IDENTIFIER_COLUMN.to_string(), measure.to_string()],
            rows.iter()
                .map(|(id, v)| vec![Cell::Text(id.to_string()), Cell::Number(*v)])
                .collect(),
        )
    }

    /// A full eight-sheet fixture with a handful of vehicles, two POI
    /// rows and the metadata rows real workbooks carry.
    pub fn sample_datasets() -> Datasets {
        Datasets::new(sample_sheets())
    }

    /// The raw sheet map behind `sample_datasets`, for tests that need
    /// to swap one sheet out.
    pub fn sample_sheets() -> BTreeMap<SheetKey, Dataset> {
        let mut sheets = BTreeMap::new();
        sheets.insert(
            SheetKey::DurationDistance,
            dataset(
                SheetKey::DurationDistance.sheet_name(),
                COL_DISTANCE,
                &[
                    ("2025-08-25 au 2025-08-31", 0.0),
                    ("V1", 10.0),
                    ("V1", 20.0),
                    ("V2", 5.0),
                    ("-----", 0.0),
                ],
            ),
        );
        sheets.insert(
            SheetKey::Unauthorized,
            {
                let mut d = dataset(
                    SheetKey::Unauthorized.sheet_name(),
                    COL_KILOMETRAGE,
                    &[("V1", 12.0), ("V2", 3.0)],
                );
                d.columns.push(COL_MAX_SPEED.to_string());
                for row in &mut d.rows {
                    row.push(Cell::Number(72.0));
                }
                d
            },
        );
        sheets.insert(
            SheetKey::Daytime,
            {
                let mut d = dataset(
                    SheetKey::Daytime.sheet_name(),
                    COL_KILOMETRAGE,
                    &[("V1", 40.0), ("V1", 30.0), ("V2", 10.0)],
                );
                d.columns.push(COL_MAX_SPEED.to_string());
                for (i, row) in d.rows.iter_mut().enumerate() {
                    row.push(Cell::Number(45.0 + 10.0 * i as f64));
                }
                d
            },
        );
        sheets.insert(
            SheetKey::Nighttime,
            {
                let mut d = dataset(
                    SheetKey::Nighttime.sheet_name(),
                    COL_KILOMETRAGE,
                    &[("V2", 25.0)],
                );
                d.columns.push(COL_MAX_SPEED.to_string());
                for row in &mut d.rows {
                    row.push(Cell::Number(62.0));
                }
                d
            },
        );
        sheets.insert(SheetKey::Notifications, {
            Dataset::new(
                SheetKey::Notifications.sheet_name(),
                vec![
                    IDENTIFIER_COLUMN.to_string(),
                    COL_NOTIFICATION.to_string(),
                ],
                vec![
                    vec![
                        Cell::Text("V1".into()),
                        Cell::Text("Perte de Connexion".into()),
                    ],
                    vec![Cell::Text("V1".into()), Cell::Text("Entrée POI".into())],
                    vec![Cell::Text("V2".into()), Cell::Text("Entrée POI".into())],
                    vec![Cell::Text("-----".into()), Cell::Text("-----".into())],
                ],
            )
        });
        sheets.insert(
            SheetKey::PoiTime,
            dataset(
                SheetKey::PoiTime.sheet_name(),
                COL_VISITS,
                &[
                    ("V1", 4.0),
                    ("BP Station Nord", 7.0),
                    ("Depot Central", 2.0),
                ],
            ),
        );
        sheets.insert(
            SheetKey::PoiVisits,
            dataset(
                SheetKey::PoiVisits.sheet_name(),
                COL_VISITS,
                &[
                    ("V1", 4.0),
                    ("V2", 1.0),
                    ("BP Station Nord", 7.0),
                    ("Depot Central", 3.0),
                ],
            ),
        );
        sheets.insert(
            SheetKey::Speed,
            {
                let mut d = dataset(
                    SheetKey::Speed.sheet_name(),
                    COL_MAX_SPEED,
                    &[("V1", 95.0), ("V1", 48.0), ("V2", 55.0)],
                );
                d.columns.push(COL_START_PLACE.to_string());
                d.columns.push(COL_END_PLACE.to_string());
                for row in &mut d.rows {
                    row.push(Cell::Text("Parakou".into()));
                    row.push(Cell::Text("Cotonou".into()));
                }
                d
            },
        );
        sheets
    }
}
