// Spreadsheet export with rust_xlsxwriter.
//
// Two families of sheets go into one workbook: report sheets rendered
// from the content model, and raw dataset sheets. Sheet names share a
// namespace with a 31-character ceiling and case-insensitive
// uniqueness; a raw sheet colliding with a report sheet gets a suffix.
use crate::charts;
use crate::error::Result;
use crate::pages::PageKey;
use crate::report::{Block, ReportContent, Section, MAX_TABLE_ROWS};
use crate::types::{Cell, Dataset, Datasets, SheetKey};
use rust_xlsxwriter::{Color, Format, Image, Workbook, Worksheet};

const MAX_SHEET_NAME: usize = 31;
const MAX_COLUMN_WIDTH: f64 = 50.0;
const DATA_SHEET_SUFFIX: &str = "_data";
const CHART_PLACEHOLDER: &str = "Graphique non disponible";
// Row span reserved under an embedded chart at half scale.
const CHART_ROW_SPAN: u32 = 16;

/// Write the workbook for one export action.
///
/// `current_page` picks the raw-dataset subset (all eight when absent);
/// `report` adds the rendered report sheets in front of them.
pub fn export(
    data: &Datasets,
    current_page: Option<PageKey>,
    report: Option<&ReportContent>,
) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let styles = Styles::new();
    let mut namer = SheetNamer::default();

    match report {
        Some(ReportContent::Structured(pages)) => {
            for (title, sections) in pages {
                let name = namer.assign(title, None);
                let sheet = workbook.add_worksheet();
                sheet.set_name(&name)?;
                write_report_sheet(sheet, sections, &styles)?;
            }
        }
        Some(ReportContent::Single(sections)) => {
            let name = namer.assign("Rapport", None);
            let sheet = workbook.add_worksheet();
            sheet.set_name(&name)?;
            write_report_sheet(sheet, sections, &styles)?;
        }
        None => {}
    }

    let keys: Vec<SheetKey> = match current_page {
        Some(page) => page.datasets().to_vec(),
        None => SheetKey::ALL.to_vec(),
    };
    for key in keys {
        let ds = data.get(key);
        let name = namer.assign(&ds.name, Some(DATA_SHEET_SUFFIX));
        let sheet = workbook.add_worksheet();
        sheet.set_name(&name)?;
        write_dataset_sheet(sheet, ds, &styles)?;
    }

    Ok(workbook.save_to_buffer()?)
}

struct Styles {
    heading: Format,
    header: Format,
    wrap: Format,
    notice: Format,
}

impl Styles {
    fn new() -> Styles {
        Styles {
            heading: Format::new().set_bold().set_font_size(13),
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0x4472C4))
                .set_font_color(Color::White),
            wrap: Format::new().set_text_wrap(),
            notice: Format::new().set_italic(),
        }
    }
}

fn write_report_sheet(sheet: &mut Worksheet, sections: &[Section], styles: &Styles) -> Result<()> {
    sheet.set_column_width(0, 60)?;
    let mut row: u32 = 0;
    for section in sections {
        if let Some(title) = &section.title {
            sheet.write_string_with_format(row, 0, title, &styles.heading)?;
            row += 2;
        }
        for block in &section.blocks {
            match block {
                Block::Metrics(metrics) => {
                    for metric in metrics {
                        sheet.write_string(
                            row,
                            0,
                            format!("{}: {}", metric.label, metric.value),
                        )?;
                        row += 1;
                    }
                    row += 1;
                }
                Block::Text(narrative) => {
                    sheet.write_string_with_format(
                        row,
                        0,
                        narrative.plain_text(),
                        &styles.wrap,
                    )?;
                    row += 2;
                }
                Block::Chart(spec) => {
                    match charts::render(spec).and_then(|r| r.to_png()) {
                        Ok(png) => {
                            let image = Image::new_from_buffer(&png)?
                                .set_scale_width(0.5)
                                .set_scale_height(0.5);
                            sheet.insert_image(row, 0, &image)?;
                            row += CHART_ROW_SPAN;
                        }
                        Err(e) => {
                            log::warn!("graphique ignoré dans le classeur: {e}");
                            sheet.write_string_with_format(
                                row,
                                0,
                                CHART_PLACEHOLDER,
                                &styles.notice,
                            )?;
                            row += 2;
                        }
                    }
                }
                Block::Table(table) => {
                    for (col, name) in table.columns.iter().enumerate() {
                        sheet.write_string_with_format(row, col as u16, name, &styles.header)?;
                    }
                    row += 1;
                    let shown = table.rows.len().min(MAX_TABLE_ROWS);
                    for data_row in table.rows.iter().take(shown) {
                        for (col, value) in data_row.iter().enumerate() {
                            sheet.write_string(row, col as u16, value)?;
                        }
                        row += 1;
                    }
                    if table.rows.len() > MAX_TABLE_ROWS {
                        sheet.write_string_with_format(
                            row,
                            0,
                            format!(
                                "(50 premières lignes affichées sur {})",
                                table.rows.len()
                            ),
                            &styles.notice,
                        )?;
                        row += 1;
                    }
                    row += 1;
                }
            }
        }
        row += 1;
    }
    Ok(())
}

fn write_dataset_sheet(sheet: &mut Worksheet, ds: &Dataset, styles: &Styles) -> Result<()> {
    for (col, name) in ds.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &styles.header)?;
        let widest = ds
            .rows
            .iter()
            .map(|row| row.get(col).map(|c| c.display().chars().count()).unwrap_or(0))
            .max()
            .unwrap_or(0)
            .max(name.chars().count());
        let width = ((widest + 2) as f64).min(MAX_COLUMN_WIDTH);
        sheet.set_column_width(col as u16, width)?;
    }
    for (r, data_row) in ds.rows.iter().enumerate() {
        let row = r as u32 + 1;
        for (col, cell) in data_row.iter().enumerate() {
            match cell {
                Cell::Number(n) => {
                    sheet.write_number(row, col as u16, *n)?;
                }
                Cell::Text(s) => {
                    sheet.write_string(row, col as u16, s)?;
                }
                Cell::Empty => {}
            }
        }
    }
    Ok(())
}

/// Allocates sheet names: ≤31 characters, case-insensitively unique.
/// A collision first tries the caller's suffix (raw sheets shadowed by
/// a report sheet), then a numeric tag.
#[derive(Default)]
struct SheetNamer {
    used: Vec<String>,
}

impl SheetNamer {
    fn assign(&mut self, desired: &str, collision_suffix: Option<&str>) -> String {
        let base = truncate_chars(desired, MAX_SHEET_NAME);
        let mut candidate = base.clone();
        if self.is_used(&candidate) {
            if let Some(suffix) = collision_suffix {
                let room = MAX_SHEET_NAME - suffix.chars().count();
                candidate = format!("{}{}", truncate_chars(desired, room), suffix);
            }
        }
        let mut n = 2;
        while self.is_used(&candidate) {
            let tag = format!(" ({n})");
            let room = MAX_SHEET_NAME - tag.chars().count();
            candidate = format!("{}{}", truncate_chars(&base, room), tag);
            n += 1;
        }
        self.used.push(candidate.to_lowercase());
        candidate
    }

    fn is_used(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.used.iter().any(|u| *u == lower)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pages::generate_structured_report;
    use crate::report::{ChartSpec, Section};
    use crate::types::fixtures::sample_datasets;
    use calamine::{Reader, Xlsx};
    use std::io::Cursor;

    fn sheet_names(bytes: &[u8]) -> Vec<String> {
        let workbook = Xlsx::new(Cursor::new(bytes.to_vec())).unwrap();
        workbook.sheet_names()
    }

    #[test]
    fn full_structured_export_has_nine_report_and_eight_data_sheets() {
        let data = sample_datasets();
        let report = ReportContent::Structured(generate_structured_report(&data));
        let bytes = export(&data, None, Some(&report)).unwrap();
        let names = sheet_names(&bytes);
        assert_eq!(names.len(), 17);

        for name in &names {
            assert!(name.chars().count() <= MAX_SHEET_NAME, "too long: {name}");
        }
        let mut lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        lowered.sort();
        lowered.dedup();
        assert_eq!(lowered.len(), names.len(), "case-insensitive collision");
    }

    #[test]
    fn colliding_data_sheets_get_the_suffix() {
        let data = sample_datasets();
        let report = ReportContent::Structured(generate_structured_report(&data));
        let bytes = export(&data, None, Some(&report)).unwrap();
        let names = sheet_names(&bytes);
        // These page titles shadow their raw dataset names, the last one
        // only up to case.
        assert!(names.iter().any(|n| n == "Notifications_data"));
        assert!(names.iter().any(|n| n == "Visites POI_data"));
        assert!(names.iter().any(|n| n == "Durée - Distance - Conso_data"));
        assert!(names.iter().any(|n| n == "Vitesse de conduite_data"));
        // No shadowing, no suffix.
        assert!(names.iter().any(|n| n == "Conduite en Journée"));
    }

    #[test]
    fn page_export_writes_only_the_mapped_datasets() {
        let data = sample_datasets();
        let sections = vec![Section::titled("Vitesse")];
        let report = ReportContent::Single(sections);
        let bytes = export(&data, Some(PageKey::Vitesse), Some(&report)).unwrap();
        let names = sheet_names(&bytes);
        assert_eq!(names, vec!["Rapport", "Vitesse de conduite"]);
    }

    #[test]
    fn failing_chart_writes_a_placeholder_cell() {
        let data = sample_datasets();
        let sections = vec![
            Section::titled("Cassé").with_chart(ChartSpec::bar("Vide", vec![])),
            Section::titled("Suivant"),
        ];
        let report = ReportContent::Single(sections);
        let bytes = export(&data, Some(PageKey::Vitesse), Some(&report)).unwrap();

        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("Rapport").unwrap();
        let cells: Vec<String> = range
            .rows()
            .flat_map(|r| r.iter().map(|c| c.to_string()))
            .collect();
        assert!(cells.iter().any(|c| c == CHART_PLACEHOLDER));
        assert!(cells.iter().any(|c| c == "Suivant"));
    }

    #[test]
    fn dataset_sheet_round_trips_numbers() {
        let data = sample_datasets();
        let bytes = export(&data, Some(PageKey::Duree), None).unwrap();
        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        let range = workbook
            .worksheet_range("Durée - Distance - Conso")
            .unwrap();
        // Header plus the fixture's five rows.
        assert_eq!(range.rows().count(), 6);
    }
}
