// Paginated document export built directly on lopdf.
//
// The document is assembled page by page: a running cursor walks down
// each A4 page and every block type knows its height, so blocks never
// overlap and a block that does not fit opens a new page. Charts are
// embedded as FlateDecode image XObjects from the raw RGB raster; a
// chart that fails to rasterize becomes an italic placeholder paragraph
// and the export continues.
use crate::charts::{self, RasterChart};
use crate::error::{ReportError, Result};
use crate::narrative::{Narrative, Span, TextBlock};
use crate::report::{Block, Metric, ResultTable, Section, MAX_TABLE_ROWS};
use chrono::Local;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Write;

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const USABLE_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

// Print size of an embedded chart (6.5in × 3.25in at 72 dpi).
const CHART_PRINT_WIDTH: f32 = 468.0;
const CHART_PRINT_HEIGHT: f32 = 234.0;

const REPORT_TITLE: &str = "Rapport d'Analyse";
const ORGANIZATION: &str = "BP - SADCI GAS PARAKOU";
const CREDIT_LINE: &str = "Document généré automatiquement par Fleet Report";

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";
const FONT_ITALIC: &str = "F3";

const HEADING_COLOR: (f32, f32, f32) = (0.40, 0.43, 0.92);
const MUTED_COLOR: (f32, f32, f32) = (0.40, 0.40, 0.40);
const HEADER_FILL: (f32, f32, f32) = (0.27, 0.45, 0.77);
const ZEBRA_FILL: (f32, f32, f32) = (0.95, 0.95, 0.95);

/// Serialize one page's sections into a complete PDF.
pub fn export(page_title: &str, sections: &[Section]) -> Result<Vec<u8>> {
    let mut writer = DocWriter::new();
    writer.title_block(page_title);
    for section in sections {
        writer.section(section);
    }
    writer.credit_line();
    writer.finish()
}

struct DocWriter {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    ops: Vec<Operation>,
    cursor: f32,
    images: Vec<(String, ObjectId)>,
}

impl DocWriter {
    fn new() -> DocWriter {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        DocWriter {
            doc,
            pages_id,
            page_ids: Vec::new(),
            ops: Vec::new(),
            cursor: PAGE_HEIGHT - MARGIN,
            images: Vec::new(),
        }
    }

    // ---- page management ------------------------------------------------

    fn flush_page(&mut self) {
        let ops = std::mem::take(&mut self.ops);
        let content = Content { operations: ops };
        let encoded = content.encode().unwrap_or_default();
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(PAGE_WIDTH),
                    Object::Real(PAGE_HEIGHT),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]);
        let page_id = self.doc.add_object(page);
        self.page_ids.push(page_id);
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.cursor - needed < MARGIN {
            self.flush_page();
        }
    }

    // ---- primitives -----------------------------------------------------

    fn set_fill(&mut self, (r, g, b): (f32, f32, f32)) {
        self.ops.push(Operation::new(
            "rg",
            vec![Object::Real(r), Object::Real(g), Object::Real(b)],
        ));
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, fill: (f32, f32, f32)) {
        self.set_fill(fill);
        self.ops.push(Operation::new(
            "re",
            vec![
                Object::Real(x),
                Object::Real(y),
                Object::Real(w),
                Object::Real(h),
            ],
        ));
        self.ops.push(Operation::new("f", vec![]));
        self.set_fill((0.0, 0.0, 0.0));
    }

    /// One line of styled text segments at an absolute position.
    fn text_at(&mut self, x: f32, baseline: f32, size: f32, segments: &[(&str, &str)]) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Td",
            vec![Object::Real(x), Object::Real(baseline)],
        ));
        for (font, text) in segments {
            self.ops.push(Operation::new(
                "Tf",
                vec![Object::Name(font.as_bytes().to_vec()), Object::Real(size)],
            ));
            self.ops.push(Operation::new(
                "Tj",
                vec![Object::String(encode_winansi(text), StringFormat::Literal)],
            ));
        }
        self.ops.push(Operation::new("ET", vec![]));
    }

    /// Single-font convenience over `text_at`, advancing the cursor.
    fn line(&mut self, text: &str, font: &'static str, size: f32, x: f32) {
        self.ensure_space(size * 1.5);
        let baseline = self.cursor - size;
        self.text_at(x, baseline, size, &[(font, text)]);
        self.cursor -= size * 1.5;
    }

    fn colored_line(
        &mut self,
        text: &str,
        font: &'static str,
        size: f32,
        x: f32,
        color: (f32, f32, f32),
    ) {
        self.ensure_space(size * 1.5);
        self.set_fill(color);
        let baseline = self.cursor - size;
        self.text_at(x, baseline, size, &[(font, text)]);
        self.set_fill((0.0, 0.0, 0.0));
        self.cursor -= size * 1.5;
    }

    fn spacer(&mut self, height: f32) {
        self.cursor -= height;
        if self.cursor < MARGIN {
            self.flush_page();
        }
    }

    // ---- report blocks --------------------------------------------------

    fn title_block(&mut self, page_title: &str) {
        self.spacer(72.0);
        self.centered_line(REPORT_TITLE, FONT_BOLD, 24.0, HEADING_COLOR);
        self.spacer(6.0);
        self.centered_line(page_title, FONT_BOLD, 20.0, HEADING_COLOR);
        self.spacer(22.0);
        self.centered_line(ORGANIZATION, FONT_REGULAR, 12.0, MUTED_COLOR);
        let stamp = Local::now().format("%d/%m/%Y %H:%M").to_string();
        self.centered_line(&format!("Généré le {}", stamp), FONT_REGULAR, 12.0, MUTED_COLOR);
        // Forced page break after the title page.
        self.flush_page();
    }

    fn centered_line(&mut self, text: &str, font: &'static str, size: f32, color: (f32, f32, f32)) {
        let width = text_width(text, size);
        let x = (PAGE_WIDTH - width) / 2.0;
        self.colored_line(text, font, size, x.max(MARGIN), color);
    }

    fn section(&mut self, section: &Section) {
        if let Some(title) = &section.title {
            self.ensure_space(40.0);
            self.colored_line(title, FONT_BOLD, 15.0, MARGIN, HEADING_COLOR);
            self.spacer(4.0);
        }
        for block in &section.blocks {
            match block {
                Block::Metrics(metrics) => self.metrics_row(metrics),
                Block::Chart(spec) => match charts::render(spec) {
                    Ok(raster) => self.chart_image(&raster),
                    Err(e) => {
                        log::warn!("graphique ignoré dans le PDF: {e}");
                        self.line(
                            &format!("Graphique non disponible: {e}"),
                            FONT_ITALIC,
                            10.0,
                            MARGIN,
                        );
                    }
                },
                Block::Table(table) => self.table(table),
                Block::Text(narrative) => self.narrative(narrative),
            }
            self.spacer(8.0);
        }
        self.spacer(10.0);
    }

    /// Metrics as a single row of equal-width cells: bold value over a
    /// muted label.
    fn metrics_row(&mut self, metrics: &[Metric]) {
        if metrics.is_empty() {
            return;
        }
        let height = 40.0;
        self.ensure_space(height + 6.0);
        let cell_w = USABLE_WIDTH / metrics.len() as f32;
        let top = self.cursor;
        for (i, metric) in metrics.iter().enumerate() {
            let x = MARGIN + cell_w * i as f32;
            self.rect(x + 1.0, top - height, cell_w - 2.0, height, (0.97, 0.97, 0.99));
            self.text_at(x + 8.0, top - 18.0, 14.0, &[(FONT_BOLD, metric.value.as_str())]);
            self.set_fill(MUTED_COLOR);
            self.text_at(x + 8.0, top - 32.0, 8.0, &[(FONT_REGULAR, metric.label.as_str())]);
            self.set_fill((0.0, 0.0, 0.0));
        }
        self.cursor -= height + 6.0;
    }

    fn table(&mut self, table: &ResultTable) {
        if table.columns.is_empty() {
            return;
        }
        let row_h = 16.0;
        let col_w = USABLE_WIDTH / table.columns.len() as f32;
        let max_chars = (col_w / 4.6) as usize;

        self.ensure_space(row_h * 2.0);
        self.table_header(table, row_h, col_w, max_chars);

        let shown = table.rows.len().min(MAX_TABLE_ROWS);
        for (r, row) in table.rows.iter().take(shown).enumerate() {
            // A table continuing on a new page repeats its header.
            if self.cursor - row_h < MARGIN {
                self.flush_page();
                self.table_header(table, row_h, col_w, max_chars);
            }
            let y = self.cursor - row_h;
            if r % 2 == 1 {
                self.rect(MARGIN, y, USABLE_WIDTH, row_h, ZEBRA_FILL);
            }
            for (i, cell) in row.iter().take(table.columns.len()).enumerate() {
                let x = MARGIN + col_w * i as f32 + 3.0;
                self.text_at(x, y + 4.0, 9.0, &[(FONT_REGULAR, &clip(cell, max_chars))]);
            }
            self.cursor -= row_h;
        }

        if table.rows.len() > MAX_TABLE_ROWS {
            self.line(
                &format!(
                    "(50 premières lignes affichées sur {})",
                    table.rows.len()
                ),
                FONT_ITALIC,
                8.0,
                MARGIN,
            );
        }
    }

    fn table_header(&mut self, table: &ResultTable, row_h: f32, col_w: f32, max_chars: usize) {
        let header_y = self.cursor - row_h;
        self.rect(MARGIN, header_y, USABLE_WIDTH, row_h, HEADER_FILL);
        self.set_fill((1.0, 1.0, 1.0));
        for (i, col) in table.columns.iter().enumerate() {
            let x = MARGIN + col_w * i as f32 + 3.0;
            let label = clip(col, max_chars);
            self.text_at(x, header_y + 4.0, 9.0, &[(FONT_BOLD, label.as_str())]);
        }
        self.set_fill((0.0, 0.0, 0.0));
        self.cursor -= row_h;
    }

    fn chart_image(&mut self, raster: &RasterChart) {
        self.ensure_space(CHART_PRINT_HEIGHT + 10.0);
        let name = format!("Im{}", self.images.len());

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        // Writing into a Vec cannot fail.
        let _ = encoder.write_all(&raster.rgb);
        let compressed = encoder.finish().unwrap_or_default();

        let dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(raster.width as i64)),
            ("Height", Object::Integer(raster.height as i64)),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(b"FlateDecode".to_vec())),
        ]);
        let image_id = self.doc.add_object(Stream::new(dict, compressed));
        self.images.push((name.clone(), image_id));

        let y = self.cursor - CHART_PRINT_HEIGHT;
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![
                Object::Real(CHART_PRINT_WIDTH),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(CHART_PRINT_HEIGHT),
                Object::Real(MARGIN + (USABLE_WIDTH - CHART_PRINT_WIDTH) / 2.0),
                Object::Real(y),
            ],
        ));
        self.ops
            .push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        self.ops.push(Operation::new("Q", vec![]));
        self.cursor -= CHART_PRINT_HEIGHT + 10.0;
    }

    fn narrative(&mut self, narrative: &Narrative) {
        for block in &narrative.blocks {
            match block {
                TextBlock::Paragraph(spans) => {
                    self.wrapped_spans(spans, MARGIN, 10.0);
                    self.spacer(4.0);
                }
                TextBlock::Bullet(spans) => {
                    let mut with_glyph = vec![Span {
                        text: "• ".to_string(),
                        bold: false,
                    }];
                    with_glyph.extend(spans.iter().cloned());
                    self.wrapped_spans(&with_glyph, MARGIN + 10.0, 10.0);
                }
                TextBlock::Numbered(n, spans) => {
                    let mut with_number = vec![Span {
                        text: format!("{}. ", n),
                        bold: false,
                    }];
                    with_number.extend(spans.iter().cloned());
                    self.wrapped_spans(&with_number, MARGIN + 10.0, 10.0);
                }
                TextBlock::TableRow(a, b) => {
                    let half = USABLE_WIDTH / 2.0;
                    self.ensure_space(14.0);
                    let baseline = self.cursor - 10.0;
                    self.text_at(MARGIN + 10.0, baseline, 10.0, &[(FONT_REGULAR, a.as_str())]);
                    self.text_at(
                        MARGIN + 10.0 + half,
                        baseline,
                        10.0,
                        &[(FONT_REGULAR, b.as_str())],
                    );
                    self.cursor -= 14.0;
                }
            }
        }
    }

    /// Greedy word wrap over styled spans; each output line is emitted
    /// as one `text_at` call with per-segment fonts.
    fn wrapped_spans(&mut self, spans: &[Span], x: f32, size: f32) {
        let width_limit = PAGE_WIDTH - MARGIN - x;
        let mut line: Vec<(bool, String)> = Vec::new();
        let mut line_width = 0.0f32;

        let mut flush_line = |writer: &mut DocWriter, line: &mut Vec<(bool, String)>| {
            if line.is_empty() {
                return;
            }
            writer.ensure_space(size * 1.4);
            let baseline = writer.cursor - size;
            let segments: Vec<(&str, &str)> = line
                .iter()
                .map(|(bold, text)| {
                    (
                        if *bold { FONT_BOLD } else { FONT_REGULAR },
                        text.as_str(),
                    )
                })
                .collect();
            writer.text_at(x, baseline, size, &segments);
            writer.cursor -= size * 1.4;
            line.clear();
        };

        for span in spans {
            for word in span.text.split_inclusive(' ') {
                let w = text_width(word, size);
                if line_width + w > width_limit && !line.is_empty() {
                    flush_line(self, &mut line);
                    line_width = 0.0;
                }
                match line.last_mut() {
                    Some((bold, text)) if *bold == span.bold => text.push_str(word),
                    _ => line.push((span.bold, word.to_string())),
                }
                line_width += w;
            }
        }
        flush_line(self, &mut line);
    }

    fn credit_line(&mut self) {
        self.spacer(24.0);
        self.centered_line(CREDIT_LINE, FONT_REGULAR, 8.0, MUTED_COLOR);
    }

    // ---- finalization ---------------------------------------------------

    fn finish(mut self) -> Result<Vec<u8>> {
        if !self.ops.is_empty() || self.page_ids.is_empty() {
            self.flush_page();
        }

        let mut fonts = Dictionary::new();
        for (name, base) in [
            (FONT_REGULAR, "Helvetica"),
            (FONT_BOLD, "Helvetica-Bold"),
            (FONT_ITALIC, "Helvetica-Oblique"),
        ] {
            let font = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                ("BaseFont", Object::Name(base.as_bytes().to_vec())),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
            ]);
            fonts.set(name, Object::Dictionary(font));
        }
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));
        if !self.images.is_empty() {
            let mut xobjects = Dictionary::new();
            for (name, id) in &self.images {
                xobjects.set(name.as_bytes(), Object::Reference(*id));
            }
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        // Resources sit on the Pages node; every page inherits them.
        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(self.page_ids.len() as i64)),
            (
                "Kids",
                Object::Array(
                    self.page_ids
                        .iter()
                        .map(|id| Object::Reference(*id))
                        .collect(),
                ),
            ),
            ("Resources", Object::Dictionary(resources)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]);
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| ReportError::Pdf(e.to_string()))?;
        Ok(buffer)
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut)
}

/// Approximate Helvetica width (average glyph ≈ 0.5 em). Used only for
/// wrapping and centering; exact metrics are not needed.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5
}

/// Encode to WinAnsi (CP-1252). Latin-1 covers the French repertoire;
/// the handful of useful CP-1252 extras are mapped explicitly and
/// anything else degrades to '?'.
fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{0000}'..='\u{007F}' => c as u8,
            '\u{00A0}'..='\u{00FF}' => c as u8,
            '€' => 0x80,
            '…' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            'œ' => 0x9C,
            'Œ' => 0x8C,
            _ => b'?',
        })
        .collect()
}
