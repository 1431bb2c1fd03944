// Narrative text with a small markup subset, parsed once into an IR.
//
// The interpretation strings use `**bold**`, `- ` bullets, numbered
// lines, `| a | b |` two-column table rows and blank-line paragraph
// breaks. Both exporters and the terminal preview consume the parsed
// form so their rendering cannot diverge. Parsing never fails: a
// malformed construct degrades to literal text.
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TextBlock {
    Paragraph(Vec<Span>),
    Bullet(Vec<Span>),
    Numbered(u32, Vec<Span>),
    /// One row of the simple two-column table form.
    TableRow(String, String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narrative {
    pub blocks: Vec<TextBlock>,
}

impl Narrative {
    pub fn parse(raw: &str) -> Narrative {
        let mut blocks = Vec::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            // Header separator rows like |---|---| are layout, not
            // content: drop them instead of leaking a dash paragraph.
            if is_table_separator(line) {
                continue;
            }
            if let Some(rest) = line.strip_prefix("- ") {
                blocks.push(TextBlock::Bullet(parse_spans(rest)));
                continue;
            }
            if let Some((n, rest)) = split_numbered(line) {
                blocks.push(TextBlock::Numbered(n, parse_spans(rest)));
                continue;
            }
            if let Some((a, b)) = split_table_row(line) {
                blocks.push(TextBlock::TableRow(a, b));
                continue;
            }
            blocks.push(TextBlock::Paragraph(parse_spans(line)));
        }
        Narrative { blocks }
    }

    /// Markup-stripped rendering for plain-text sinks (Excel wrapped
    /// cells): bullets become a bullet glyph, table rows join with a
    /// separator, bold markers disappear.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            if !out.is_empty() {
                out.push('\n');
            }
            match block {
                TextBlock::Paragraph(spans) => out.push_str(&spans_text(spans)),
                TextBlock::Bullet(spans) => {
                    out.push_str("• ");
                    out.push_str(&spans_text(spans));
                }
                TextBlock::Numbered(n, spans) => {
                    out.push_str(&format!("{}. {}", n, spans_text(spans)));
                }
                TextBlock::TableRow(a, b) => {
                    out.push_str(&format!("{} — {}", a, b));
                }
            }
        }
        out
    }
}

fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// Split `**bold**` runs into spans. An unbalanced `**` leaves the
/// trailing marker as literal text rather than erroring.
fn parse_spans(line: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut rest = line;
    let mut bold = false;
    while let Some(idx) = rest.find("**") {
        let (before, after) = rest.split_at(idx);
        if !before.is_empty() {
            spans.push(Span {
                text: before.to_string(),
                bold,
            });
        }
        rest = &after[2..];
        bold = !bold;
    }
    if !rest.is_empty() {
        // A dangling open marker must not embolden the tail.
        spans.push(Span {
            text: rest.to_string(),
            bold: false,
        });
    }
    if spans.is_empty() {
        spans.push(Span {
            text: String::new(),
            bold: false,
        });
    }
    spans
}

fn split_numbered(line: &str) -> Option<(u32, &str)> {
    let dot = line.find(". ")?;
    let n: u32 = line[..dot].parse().ok()?;
    Some((n, &line[dot + 2..]))
}

/// `| a | b |` rows; anything other than exactly two cells is not a
/// table row and falls through to a paragraph.
fn split_table_row(line: &str) -> Option<(String, String)> {
    if !line.starts_with('|') || !line.ends_with('|') {
        return None;
    }
    let inner = &line[1..line.len() - 1];
    let cells: Vec<&str> = inner.split('|').map(str::trim).collect();
    if cells.len() != 2 {
        return None;
    }
    Some((cells[0].to_string(), cells[1].to_string()))
}

fn is_table_separator(line: &str) -> bool {
    if !line.starts_with('|') || !line.ends_with('|') || line.len() < 2 {
        return false;
    }
    line[1..line.len() - 1].split('|').all(|cell| {
        let cell = cell.trim();
        !cell.is_empty() && cell.chars().all(|ch| ch == '-')
    })
}
