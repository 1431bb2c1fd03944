// The nine analysis pages.
//
// Each generator turns the loaded datasets into an ordered list of
// sections. Section structure is fixed per page: the same titles and
// block kinds come out on every run, only the values depend on the
// data. Exporters and the terminal preview all consume the same output.
use crate::analytics::{
    classify_severity, distance_stats, group_count, group_max, group_mean, group_sum,
    outer_join_zero, sort_desc_top, value_counts, vehicle_rows, SeverityTier,
};
use crate::classify::{is_poi_by_prefix, is_poi_by_roster, vehicle_roster};
use crate::report::{ChartSpec, Metric, Report, ResultTable, Section, Series, StructuredReport};
use crate::types::{
    Datasets, SheetKey, COL_DISTANCE, COL_END_PLACE, COL_KILOMETRAGE, COL_MAX_SPEED,
    COL_NOTIFICATION, COL_START_PLACE, COL_VISITS,
};
use crate::util::{format_int, format_number, pct, round1, round2};
use std::collections::HashMap;

const SPEED_LIMIT: f64 = 50.0;
const SPEED_LIMIT_HIGH: f64 = 90.0;

/// Canonical page order of the full report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKey {
    Synthese,
    Duree,
    Trajets,
    JourNuit,
    LimitationVitesse,
    Notifications,
    TempsPoi,
    VisitesPoi,
    Vitesse,
}

impl PageKey {
    pub const ALL: [PageKey; 9] = [
        PageKey::Synthese,
        PageKey::Duree,
        PageKey::Trajets,
        PageKey::JourNuit,
        PageKey::LimitationVitesse,
        PageKey::Notifications,
        PageKey::TempsPoi,
        PageKey::VisitesPoi,
        PageKey::Vitesse,
    ];

    pub fn title(self) -> &'static str {
        match self {
            PageKey::Synthese => "Synthèse Générale",
            PageKey::Duree => "Durée - Distance - Conso",
            PageKey::Trajets => "Trajets Non Autorisés",
            PageKey::JourNuit => "Conduite Jour vs Nuit",
            PageKey::LimitationVitesse => "Limitation de Vitesse",
            PageKey::Notifications => "Notifications",
            PageKey::TempsPoi => "Temps dans POI",
            PageKey::VisitesPoi => "Visites POI",
            PageKey::Vitesse => "Vitesse de Conduite",
        }
    }

    /// Raw dataset categories shown alongside this page's report.
    pub fn datasets(self) -> &'static [SheetKey] {
        match self {
            PageKey::Synthese => &[
                SheetKey::DurationDistance,
                SheetKey::Unauthorized,
                SheetKey::Daytime,
                SheetKey::Nighttime,
            ],
            PageKey::Duree => &[SheetKey::DurationDistance],
            PageKey::Trajets => &[SheetKey::Unauthorized],
            PageKey::JourNuit => &[SheetKey::Daytime, SheetKey::Nighttime],
            PageKey::LimitationVitesse => {
                &[SheetKey::Daytime, SheetKey::Nighttime, SheetKey::Speed]
            }
            PageKey::Notifications => &[SheetKey::Notifications],
            PageKey::TempsPoi => &[SheetKey::PoiTime],
            PageKey::VisitesPoi => &[SheetKey::PoiVisits],
            PageKey::Vitesse => &[SheetKey::Speed],
        }
    }
}

/// Generator registry.
pub fn generate_page(key: PageKey, data: &Datasets) -> Report {
    match key {
        PageKey::Synthese => synthese(data),
        PageKey::Duree => duree(data),
        PageKey::Trajets => trajets(data),
        PageKey::JourNuit => jour_nuit(data),
        PageKey::LimitationVitesse => limitation_vitesse(data),
        PageKey::Notifications => notifications(data),
        PageKey::TempsPoi => temps_poi(data),
        PageKey::VisitesPoi => visites_poi(data),
        PageKey::Vitesse => vitesse(data),
    }
}

/// All pages concatenated, each prefixed with a title-only marker.
pub fn generate_full_report(data: &Datasets) -> Report {
    let mut out = Vec::new();
    for key in PageKey::ALL {
        out.push(Section::titled(format!("=== {} ===", key.title())));
        out.extend(generate_page(key, data));
    }
    out
}

/// All pages keyed by title, no marker sections (sheet titles take
/// that role in the spreadsheet export).
pub fn generate_structured_report(data: &Datasets) -> StructuredReport {
    PageKey::ALL
        .iter()
        .map(|key| (key.title().to_string(), generate_page(*key, data)))
        .collect()
}

// ---- shared shaping --------------------------------------------------

fn rounded2(points: Vec<(String, f64)>) -> Vec<(String, f64)> {
    points.into_iter().map(|(k, v)| (k, round2(v))).collect()
}

fn rounded1(points: Vec<(String, f64)>) -> Vec<(String, f64)> {
    points.into_iter().map(|(k, v)| (k, round1(v))).collect()
}

// ---- page generators -------------------------------------------------

fn synthese(data: &Datasets) -> Report {
    let dd = data.get(SheetKey::DurationDistance);
    let dd_rows = vehicle_rows(dd);
    let roster = vehicle_roster(data);
    let unauthorized = vehicle_rows(data.get(SheetKey::Unauthorized)).len();
    let notifs = vehicle_rows(data.get(SheetKey::Notifications)).len();
    let day_trips = vehicle_rows(data.get(SheetKey::Daytime)).len();
    let night_trips = vehicle_rows(data.get(SheetKey::Nighttime)).len();
    let total_trips = day_trips + night_trips;
    let day_pct = round1(pct(day_trips as f64, total_trips as f64));
    let night_pct = round1(pct(night_trips as f64, total_trips as f64));

    let distances = sort_desc_top(group_sum(dd, &dd_rows, COL_DISTANCE), 15);

    vec![
        Section::titled("Indicateurs Clés").with_metrics(vec![
            Metric::new("Véhicules Actifs", format_int(roster.len())),
            Metric::new("Total Trajets", format_int(dd_rows.len())),
            Metric::new("Trajets Non Autorisés", format_int(unauthorized)),
            Metric::new("Notifications", format_int(notifs)),
        ]),
        Section::titled("Distance par Véhicule").with_chart(ChartSpec::horizontal_bar(
            "Distance Totale par Véhicule (km)",
            rounded2(distances),
        )),
        Section::titled("Répartition Jour / Nuit")
            .with_metrics(vec![
                Metric::new("Conduite de Jour", format!("{day_pct}%")),
                Metric::new("Conduite de Nuit", format!("{night_pct}%")),
            ])
            .with_chart(ChartSpec::pie(
                "Trajets Jour vs Nuit",
                vec![
                    ("Jour".to_string(), day_trips as f64),
                    ("Nuit".to_string(), night_trips as f64),
                ],
            )),
        Section::titled("Interprétation").with_text(&format!(
            "**Analyse de la semaine:**\n\
             - La flotte compte **{} véhicules actifs** pour {} trajets enregistrés.\n\
             - {} trajets non autorisés et {} notifications ont été relevés.\n\
             - La conduite de nuit représente **{night_pct}%** de l'activité; \
             chaque trajet nocturne doit faire l'objet d'une justification.",
            roster.len(),
            dd_rows.len(),
            unauthorized,
            notifs,
        )),
    ]
}

fn duree(data: &Datasets) -> Report {
    let ds = data.get(SheetKey::DurationDistance);
    let rows = vehicle_rows(ds);
    let stats = distance_stats(ds, COL_DISTANCE);
    let total_km: f64 = stats.iter().map(|s| s.total).sum();

    let top_distance: Vec<(String, f64)> = stats
        .iter()
        .take(15)
        .map(|s| (s.vehicle.clone(), round2(s.total)))
        .collect();
    let trip_counts = sort_desc_top(group_count(ds, &rows), 15);

    let recap = ResultTable {
        columns: vec![
            "Véhicule".to_string(),
            "Distance Totale (km)".to_string(),
            "Distance Moyenne (km)".to_string(),
            "Trajets".to_string(),
        ],
        rows: stats
            .iter()
            .map(|s| {
                vec![
                    s.vehicle.clone(),
                    format_number(s.total, 2),
                    format_number(s.mean, 2),
                    format_int(s.trips),
                ]
            })
            .collect(),
    };

    vec![
        Section::titled("Distance Totale par Véhicule").with_chart(ChartSpec::bar(
            "Top 15 - Distance Totale (km)",
            top_distance,
        )),
        Section::titled("Nombre de Trajets par Véhicule").with_chart(ChartSpec::bar(
            "Top 15 - Nombre de Trajets",
            trip_counts,
        )),
        Section::titled("Récapitulatif").with_table(recap),
        Section::titled("Interprétation").with_text(&format!(
            "**Lecture des distances:**\n\
             - Distance totale parcourue par la flotte: **{} km**.\n\
             - Les véhicules en tête du classement cumulent l'essentiel du \
             kilométrage; vérifier la cohérence avec leurs missions.\n\
             - Une distance moyenne par trajet anormalement élevée peut \
             signaler des détours ou des trajets personnels.",
            format_number(total_km, 2),
        )),
    ]
}

fn trajets(data: &Datasets) -> Report {
    let ds = data.get(SheetKey::Unauthorized);
    let rows = vehicle_rows(ds);
    let counts = group_count(ds, &rows);
    let involved = counts.len();
    let top_counts = sort_desc_top(counts, 15);
    let top_km = sort_desc_top(rounded2(group_sum(ds, &rows, COL_KILOMETRAGE)), 15);
    let max_speeds = sort_desc_top(rounded1(group_max(ds, &rows, COL_MAX_SPEED)), 15);

    vec![
        Section::titled("Vue d'Ensemble").with_metrics(vec![
            Metric::new("Trajets Non Autorisés", format_int(rows.len())),
            Metric::new("Véhicules Impliqués", format_int(involved)),
        ]),
        Section::titled("Incidents par Véhicule").with_chart(ChartSpec::bar(
            "Top 15 - Trajets Non Autorisés",
            top_counts,
        )),
        Section::titled("Kilométrage Non Autorisé").with_chart(ChartSpec::bar(
            "Top 15 - Kilométrage Non Autorisé (km)",
            top_km,
        )),
        Section::titled("Vitesse Maximale pendant les Incidents").with_chart(ChartSpec::bar(
            "Vitesse Maxi par Véhicule (km/h)",
            max_speeds,
        )),
        Section::titled("Interprétation").with_text(
            "**Points de vigilance:**\n\
             - Tout trajet hors plage autorisée doit être justifié par le conducteur.\n\
             - Un kilométrage non autorisé récurrent sur le même véhicule \
             indique un usage privé probable.\n\
             - Croiser ces incidents avec la conduite nocturne pour identifier \
             les conducteurs à risque.",
        ),
    ]
}

fn jour_nuit(data: &Datasets) -> Report {
    let day = data.get(SheetKey::Daytime);
    let night = data.get(SheetKey::Nighttime);
    let day_rows = vehicle_rows(day);
    let night_rows = vehicle_rows(night);

    let day_km_by_vehicle = group_sum(day, &day_rows, COL_KILOMETRAGE);
    let night_km_by_vehicle = group_sum(night, &night_rows, COL_KILOMETRAGE);
    let day_km: f64 = day_km_by_vehicle.iter().map(|(_, v)| v).sum();
    let night_km: f64 = night_km_by_vehicle.iter().map(|(_, v)| v).sum();
    let total = (day_rows.len() + night_rows.len()) as f64;
    let day_pct = round1(pct(day_rows.len() as f64, total));
    let night_pct = round1(pct(night_rows.len() as f64, total));

    let km_joined = outer_join_zero(&day_km_by_vehicle, &night_km_by_vehicle);
    let km_chart = ChartSpec::grouped_bar(
        "Kilométrage Jour vs Nuit (km)",
        vec![
            Series::new(
                "Jour",
                km_joined
                    .iter()
                    .map(|(k, d, _)| (k.clone(), round2(*d)))
                    .collect(),
            ),
            Series::new(
                "Nuit",
                km_joined
                    .iter()
                    .map(|(k, _, n)| (k.clone(), round2(*n)))
                    .collect(),
            ),
        ],
    );

    let speed_joined = outer_join_zero(
        &group_max(day, &day_rows, COL_MAX_SPEED),
        &group_max(night, &night_rows, COL_MAX_SPEED),
    );
    let speed_chart = ChartSpec::grouped_bar(
        "Vitesse Maxi Jour vs Nuit (km/h)",
        vec![
            Series::new(
                "Jour",
                speed_joined
                    .iter()
                    .map(|(k, d, _)| (k.clone(), round1(*d)))
                    .collect(),
            ),
            Series::new(
                "Nuit",
                speed_joined
                    .iter()
                    .map(|(k, _, n)| (k.clone(), round1(*n)))
                    .collect(),
            ),
        ],
    );

    vec![
        Section::titled("Volumes Jour / Nuit").with_metrics(vec![
            Metric::new("Trajets de Jour", format_int(day_rows.len())),
            Metric::new("Trajets de Nuit", format_int(night_rows.len())),
            Metric::new("Km de Jour", format_number(day_km, 2)),
            Metric::new("Km de Nuit", format_number(night_km, 2)),
        ]),
        Section::titled("Kilométrage Comparé").with_chart(km_chart),
        Section::titled("Vitesses Maximales Comparées").with_chart(speed_chart),
        Section::titled("Interprétation").with_text(&format!(
            "**Répartition de l'activité:**\n\
             - Jour: **{day_pct}%** des trajets, nuit: **{night_pct}%**.\n\
             - La conduite nocturne est interdite sauf autorisation; tout \
             kilométrage de nuit doit être documenté.\n\
             - Comparer les vitesses maximales de nuit aux limites en vigueur: \
             l'obscurité aggrave chaque excès.",
        )),
    ]
}

fn limitation_vitesse(data: &Datasets) -> Report {
    let speed = data.get(SheetKey::Speed);
    let rows = vehicle_rows(speed);
    let total = rows.len();

    let over_limit: Vec<_> = rows
        .iter()
        .filter(|r| speed.number(r, COL_MAX_SPEED).unwrap_or(0.0) > SPEED_LIMIT)
        .copied()
        .collect();
    let over_high = rows
        .iter()
        .filter(|r| speed.number(r, COL_MAX_SPEED).unwrap_or(0.0) > SPEED_LIMIT_HIGH)
        .count();
    let rate = round1(pct(over_limit.len() as f64, total as f64));

    let infractions_per_vehicle = sort_desc_top(group_count(speed, &over_limit), 15);

    // Severity distribution over every reading, all five tiers present.
    let mut tier_counts: HashMap<SeverityTier, f64> = HashMap::new();
    for row in &rows {
        if let Some(v) = speed.number(row, COL_MAX_SPEED) {
            *tier_counts.entry(classify_severity(v)).or_insert(0.0) += 1.0;
        }
    }
    let severity_points: Vec<(String, f64)> = SeverityTier::ALL
        .iter()
        .map(|t| {
            (
                t.label().to_string(),
                tier_counts.get(t).copied().unwrap_or(0.0),
            )
        })
        .collect();

    let day = data.get(SheetKey::Daytime);
    let night = data.get(SheetKey::Nighttime);
    let day_rows = vehicle_rows(day);
    let night_rows = vehicle_rows(night);
    let day_infractions = day_rows
        .iter()
        .filter(|r| day.number(r, COL_MAX_SPEED).unwrap_or(0.0) > SPEED_LIMIT)
        .count();
    let night_infractions = night_rows
        .iter()
        .filter(|r| night.number(r, COL_MAX_SPEED).unwrap_or(0.0) > SPEED_LIMIT)
        .count();
    let day_rate = round1(pct(day_infractions as f64, day_rows.len() as f64));
    let night_rate = round1(pct(night_infractions as f64, night_rows.len() as f64));

    // Worst readings first, with their start and end places.
    let mut offending: Vec<&Vec<_>> = over_limit.clone();
    offending.sort_by(|a, b| {
        let va = speed.number(a, COL_MAX_SPEED).unwrap_or(0.0);
        let vb = speed.number(b, COL_MAX_SPEED).unwrap_or(0.0);
        vb.partial_cmp(&va).unwrap_or(std::cmp::Ordering::Equal)
    });
    let recap = ResultTable {
        columns: vec![
            "Véhicule".to_string(),
            "Vitesse Maxi (km/h)".to_string(),
            "Départ".to_string(),
            "Arrivée".to_string(),
            "Gravité".to_string(),
        ],
        rows: offending
            .iter()
            .take(20)
            .map(|row| {
                let v = speed.number(row, COL_MAX_SPEED).unwrap_or(0.0);
                vec![
                    speed.identifier(row).unwrap_or("?").to_string(),
                    format_number(v, 1),
                    speed.cell(row, COL_START_PLACE).display(),
                    speed.cell(row, COL_END_PLACE).display(),
                    classify_severity(v).label().to_string(),
                ]
            })
            .collect(),
    };

    let sanction_table: String = std::iter::once("| Catégorie | Sanction |".to_string())
        .chain(
            SeverityTier::ALL
                .iter()
                .map(|t| format!("| {} | {} |", t.label(), t.sanction())),
        )
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        Section::titled("Infractions").with_metrics(vec![
            Metric::new("Dépassements > 50 km/h", format_int(over_limit.len())),
            Metric::new("Dépassements > 90 km/h", format_int(over_high)),
            Metric::new("Taux d'Infraction", format!("{rate}%")),
        ]),
        Section::titled("Infractions par Véhicule").with_chart(ChartSpec::bar(
            "Top 15 - Dépassements de Vitesse",
            infractions_per_vehicle,
        )),
        Section::titled("Répartition par Gravité")
            .with_chart(ChartSpec::pie("Gravité des Dépassements", severity_points))
            .with_text(&format!("**Barème des sanctions:**\n{sanction_table}")),
        Section::titled("Infractions Jour vs Nuit")
            .with_chart(ChartSpec::bar(
                "Dépassements par Période",
                vec![
                    ("Jour".to_string(), day_infractions as f64),
                    ("Nuit".to_string(), night_infractions as f64),
                ],
            ))
            .with_text(&format!(
                "Taux d'infraction de jour: **{day_rate}%**, de nuit: **{night_rate}%**.",
            )),
        Section::titled("Relevés en Infraction").with_table(recap),
        Section::titled("Interprétation").with_text(
            "**Application du barème:**\n\
             1. Notifier chaque conducteur de ses dépassements de la semaine.\n\
             2. Appliquer la sanction du palier le plus grave atteint.\n\
             3. Les récidives sur deux semaines consécutives passent au palier supérieur.",
        ),
    ]
}

fn notifications(data: &Datasets) -> Report {
    let ds = data.get(SheetKey::Notifications);
    let rows = vehicle_rows(ds);
    let by_type = value_counts(ds, &rows, COL_NOTIFICATION);
    let per_vehicle = sort_desc_top(group_count(ds, &rows), 15);

    // Count per (vehicle, type), first-seen order.
    let mut order: Vec<(String, String)> = Vec::new();
    let mut counts: HashMap<(String, String), u64> = HashMap::new();
    for row in &rows {
        let id = match ds.identifier(row) {
            Some(id) => id.to_string(),
            None => continue,
        };
        let kind = match ds.cell(row, COL_NOTIFICATION).as_text().map(str::to_string) {
            Some(k) => k,
            None => continue,
        };
        let key = (id, kind);
        if !counts.contains_key(&key) {
            order.push(key.clone());
        }
        *counts.entry(key).or_insert(0) += 1;
    }
    let detail = ResultTable {
        columns: vec![
            "Véhicule".to_string(),
            "Notification".to_string(),
            "Nombre".to_string(),
        ],
        rows: order
            .iter()
            .map(|key| {
                vec![
                    key.0.clone(),
                    key.1.clone(),
                    format_int(counts[key]),
                ]
            })
            .collect(),
    };

    vec![
        Section::titled("Volume").with_metrics(vec![
            Metric::new("Notifications Reçues", format_int(rows.len())),
            Metric::new("Types Distincts", format_int(by_type.len())),
        ]),
        Section::titled("Répartition par Type")
            .with_chart(ChartSpec::pie("Notifications par Type", by_type)),
        Section::titled("Notifications par Véhicule").with_chart(ChartSpec::bar(
            "Top 15 - Notifications",
            per_vehicle,
        )),
        Section::titled("Détail par Véhicule et Type").with_table(detail),
        Section::titled("Interprétation").with_text(
            "**Lecture des alertes:**\n\
             - Les pertes de connexion répétées sur un même véhicule peuvent \
             indiquer un boîtier débranché volontairement.\n\
             - Les entrées/sorties de POI hors horaires de service sont à \
             rapprocher des trajets non autorisés.",
        ),
    ]
}

fn temps_poi(data: &Datasets) -> Report {
    let ds = data.get(SheetKey::PoiTime);
    let roster = vehicle_roster(data);
    let all_rows = vehicle_rows(ds);
    let (poi_rows, veh_rows): (Vec<_>, Vec<_>) = all_rows
        .into_iter()
        .partition(|row| match ds.identifier(row) {
            Some(id) => is_poi_by_roster(id, &roster),
            None => false,
        });

    // Totals come from the full aggregate; top-N only caps the charts.
    let poi_visits = group_sum(ds, &poi_rows, COL_VISITS);
    let total_visits: f64 = poi_visits.iter().map(|(_, v)| v).sum();
    let distinct_pois = poi_visits.len();
    let per_poi = sort_desc_top(poi_visits, 15);
    let per_vehicle = sort_desc_top(group_sum(ds, &veh_rows, COL_VISITS), 15);

    vec![
        Section::titled("Fréquentation").with_metrics(vec![
            Metric::new("Visites de POI", format_number(total_visits, 0)),
            Metric::new("POI Fréquentés", format_int(distinct_pois)),
        ]),
        Section::titled("Visites par POI").with_chart(ChartSpec::horizontal_bar(
            "Top 15 - Visites par POI",
            per_poi,
        )),
        Section::titled("Visites par Véhicule").with_chart(ChartSpec::bar(
            "Visites de POI par Véhicule",
            per_vehicle,
        )),
        Section::titled("Interprétation").with_text(
            "**Temps passé dans les POI:**\n\
             - Un temps de présence long dans un POI hors réseau (garage, \
             domicile) mérite une vérification.\n\
             - Les stations les plus visitées doivent correspondre aux axes \
             réellement desservis par la flotte.",
        ),
    ]
}

fn visites_poi(data: &Datasets) -> Report {
    let ds = data.get(SheetKey::PoiVisits);
    let roster = vehicle_roster(data);
    let all_rows = vehicle_rows(ds);
    // POI side on the name prefix, vehicle side on roster membership.
    // An unprefixed zone is neither and lands in no chart.
    let poi_rows: Vec<_> = all_rows
        .iter()
        .copied()
        .filter(|row| ds.identifier(row).map_or(false, is_poi_by_prefix))
        .collect();
    let veh_rows: Vec<_> = all_rows
        .iter()
        .copied()
        .filter(|row| match ds.identifier(row) {
            Some(id) => roster.iter().any(|v| v == id),
            None => false,
        })
        .collect();

    let poi_visits = group_sum(ds, &poi_rows, COL_VISITS);
    let total_visits: f64 = poi_visits.iter().map(|(_, v)| v).sum();
    let per_poi = sort_desc_top(poi_visits, 20);
    let per_vehicle = sort_desc_top(group_sum(ds, &veh_rows, COL_VISITS), 15);

    vec![
        Section::titled("Volume de Visites").with_metrics(vec![Metric::new(
            "Total Visites",
            format_number(total_visits, 0),
        )]),
        Section::titled("Visites par POI").with_chart(ChartSpec::horizontal_bar(
            "Top 20 - Visites par Station",
            per_poi,
        )),
        Section::titled("Visites par Véhicule").with_chart(ChartSpec::bar(
            "Visites par Véhicule",
            per_vehicle,
        )),
        Section::titled("Interprétation").with_text(
            "**Couverture du réseau:**\n\
             - Les stations jamais visitées pendant la semaine signalent une \
             zone de tournée délaissée.\n\
             - Un véhicule concentré sur une seule station peut indiquer un \
             itinéraire à rééquilibrer.",
        ),
    ]
}

fn vitesse(data: &Datasets) -> Report {
    let ds = data.get(SheetKey::Speed);
    let rows = vehicle_rows(ds);
    let maxes = group_max(ds, &rows, COL_MAX_SPEED);
    let offenders = maxes.iter().filter(|(_, v)| *v > SPEED_LIMIT).count();
    let top_speeds = sort_desc_top(rounded1(maxes.clone()), 15);

    let means: HashMap<String, f64> = group_mean(ds, &rows, COL_MAX_SPEED).into_iter().collect();
    let counts: HashMap<String, f64> = group_count(ds, &rows).into_iter().collect();
    let stats = ResultTable {
        columns: vec![
            "Véhicule".to_string(),
            "Vitesse Max (km/h)".to_string(),
            "Vitesse Moyenne (km/h)".to_string(),
            "Relevés".to_string(),
        ],
        rows: maxes
            .iter()
            .map(|(vehicle, max)| {
                vec![
                    vehicle.clone(),
                    format_number(round1(*max), 1),
                    format_number(round1(means.get(vehicle).copied().unwrap_or(0.0)), 1),
                    format_int(counts.get(vehicle).copied().unwrap_or(0.0) as u64),
                ]
            })
            .collect(),
    };

    vec![
        Section::titled("Vue d'Ensemble").with_metrics(vec![
            Metric::new("Véhicules Suivis", format_int(maxes.len())),
            Metric::new("Véhicules en Excès", format_int(offenders)),
        ]),
        Section::titled("Vitesses Maximales").with_chart(ChartSpec::bar(
            "Top 15 - Vitesse Maxi (km/h)",
            top_speeds,
        )),
        Section::titled("Statistiques par Véhicule").with_table(stats),
        Section::titled("Interprétation").with_text(&format!(
            "**Limites applicables:**\n\
             - {SPEED_LIMIT} km/h en agglomération et dans les dépôts.\n\
             - {SPEED_LIMIT_HIGH} km/h sur route; aucun relevé ne doit dépasser \
             ce seuil quelle que soit la période.\n\
             - La vitesse moyenne lissée masque les pointes: c'est la vitesse \
             maximale qui fait foi pour le barème.",
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Block;
    use crate::types::fixtures::sample_datasets;

    fn section_titles(report: &Report) -> Vec<&str> {
        report
            .iter()
            .filter_map(|s| s.title.as_deref())
            .collect()
    }

    #[test]
    fn every_page_generates_sections() {
        let data = sample_datasets();
        for key in PageKey::ALL {
            let report = generate_page(key, &data);
            assert!(!report.is_empty(), "page {:?} came out empty", key);
        }
    }

    #[test]
    fn synthese_has_fixed_structure() {
        let data = sample_datasets();
        let report = synthese(&data);
        assert_eq!(
            section_titles(&report),
            vec![
                "Indicateurs Clés",
                "Distance par Véhicule",
                "Répartition Jour / Nuit",
                "Interprétation",
            ]
        );
        match &report[0].blocks[0] {
            Block::Metrics(m) => {
                assert_eq!(m[0].label, "Véhicules Actifs");
                assert_eq!(m[0].value, "2");
            }
            other => panic!("expected metrics, got {:?}", other),
        }
    }

    #[test]
    fn day_night_percentages_from_row_counts() {
        // Fixture: 3 day rows, 1 night row → 75% / 25%.
        let data = sample_datasets();
        let report = jour_nuit(&data);
        match &report[3].blocks[0] {
            Block::Text(n) => {
                let text = n.plain_text();
                assert!(text.contains("75%"), "got: {text}");
                assert!(text.contains("25%"), "got: {text}");
            }
            other => panic!("expected narrative, got {:?}", other),
        }
    }

    #[test]
    fn severity_pie_covers_all_five_tiers() {
        let data = sample_datasets();
        let report = limitation_vitesse(&data);
        let pie = report
            .iter()
            .flat_map(|s| &s.blocks)
            .find_map(|b| match b {
                Block::Chart(c) if c.title == "Gravité des Dépassements" => Some(c),
                _ => None,
            })
            .unwrap();
        let points = &pie.series[0].points;
        assert_eq!(points.len(), 5);
        // Fixture speeds 95/48/55 → one Grave, one Conforme, one Légère.
        assert_eq!(points[0], ("Conforme".to_string(), 1.0));
        assert_eq!(points[1], ("Légère (51-60)".to_string(), 1.0));
        assert_eq!(points[3], ("Grave (81-100)".to_string(), 1.0));
    }

    #[test]
    fn poi_pages_use_their_own_heuristics() {
        let data = sample_datasets();
        // Roster exclusion: both "BP Station Nord" and "Depot Central".
        let time_report = temps_poi(&data);
        let poi_chart = time_report
            .iter()
            .flat_map(|s| &s.blocks)
            .find_map(|b| match b {
                Block::Chart(c) if c.title.contains("par POI") => Some(c),
                _ => None,
            })
            .unwrap();
        let names: Vec<&str> = poi_chart.series[0]
            .points
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert!(names.contains(&"BP Station Nord"));
        assert!(names.contains(&"Depot Central"));

        // Prefix heuristic: only the "BP"-prefixed station.
        let visits_report = visites_poi(&data);
        let visits_chart = visits_report
            .iter()
            .flat_map(|s| &s.blocks)
            .find_map(|b| match b {
                Block::Chart(c) if c.title.contains("Station") => Some(c),
                _ => None,
            })
            .unwrap();
        let names: Vec<&str> = visits_chart.series[0]
            .points
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(names, vec!["BP Station Nord"]);

        // The vehicle chart keeps to the roster: "Depot Central" is
        // neither prefixed nor a vehicle and appears in no chart.
        let vehicle_chart = visits_report
            .iter()
            .flat_map(|s| &s.blocks)
            .find_map(|b| match b {
                Block::Chart(c) if c.title == "Visites par Véhicule" => Some(c),
                _ => None,
            })
            .unwrap();
        let names: Vec<&str> = vehicle_chart.series[0]
            .points
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(names, vec!["V1", "V2"]);
    }

    #[test]
    fn poi_totals_ignore_the_chart_cap() {
        use crate::types::fixtures::sample_sheets;
        use crate::types::{Cell, Dataset, IDENTIFIER_COLUMN};

        // 25 stations with one visit each: the chart caps at 20 but the
        // metric counts them all.
        let mut sheets = sample_sheets();
        sheets.insert(
            SheetKey::PoiVisits,
            Dataset::new(
                SheetKey::PoiVisits.sheet_name(),
                vec![IDENTIFIER_COLUMN.to_string(), COL_VISITS.to_string()],
                (0..25)
                    .map(|i| vec![Cell::Text(format!("BP Station {i}")), Cell::Number(1.0)])
                    .collect(),
            ),
        );
        let data = Datasets::new(sheets);
        let report = visites_poi(&data);
        match &report[0].blocks[0] {
            Block::Metrics(m) => assert_eq!(m[0].value, "25"),
            other => panic!("expected metrics, got {:?}", other),
        }
        match &report[1].blocks[0] {
            Block::Chart(c) => assert_eq!(c.series[0].points.len(), 20),
            other => panic!("expected chart, got {:?}", other),
        }
    }

    #[test]
    fn poi_count_is_distinct_zones_not_rows() {
        use crate::types::fixtures::sample_sheets;
        use crate::types::{Cell, Dataset, IDENTIFIER_COLUMN};

        let mut sheets = sample_sheets();
        sheets.insert(
            SheetKey::PoiTime,
            Dataset::new(
                SheetKey::PoiTime.sheet_name(),
                vec![IDENTIFIER_COLUMN.to_string(), COL_VISITS.to_string()],
                vec![
                    vec![Cell::Text("Zone A".into()), Cell::Number(1.0)],
                    vec![Cell::Text("Zone A".into()), Cell::Number(1.0)],
                    vec![Cell::Text("Zone B".into()), Cell::Number(1.0)],
                ],
            ),
        );
        let data = Datasets::new(sheets);
        let report = temps_poi(&data);
        match &report[0].blocks[0] {
            Block::Metrics(m) => {
                assert_eq!(m[0].value, "3"); // every visit counted
                assert_eq!(m[1].value, "2"); // two distinct zones
            }
            other => panic!("expected metrics, got {:?}", other),
        }
    }

    #[test]
    fn full_report_carries_page_markers() {
        let data = sample_datasets();
        let report = generate_full_report(&data);
        let markers: Vec<&str> = report
            .iter()
            .filter_map(|s| s.title.as_deref())
            .filter(|t| t.starts_with("==="))
            .collect();
        assert_eq!(markers.len(), 9);
        assert_eq!(markers[0], "=== Synthèse Générale ===");
    }

    #[test]
    fn structured_report_is_keyed_by_title_without_markers() {
        let data = sample_datasets();
        let structured = generate_structured_report(&data);
        assert_eq!(structured.len(), 9);
        assert_eq!(structured[0].0, "Synthèse Générale");
        for (_, report) in &structured {
            assert!(report
                .iter()
                .filter_map(|s| s.title.as_deref())
                .all(|t| !t.starts_with("===")));
        }
    }
}
