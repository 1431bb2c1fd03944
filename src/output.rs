// Terminal rendering of report sections and the JSON dump.
use crate::report::{Block, Section};
use serde::Serialize;
use std::error::Error;
use tabled::builder::Builder;
use tabled::settings::Style;

const PREVIEW_ROWS: usize = 10;

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Print a page's sections as a Markdown-ish console preview. Charts
/// cannot be drawn in a terminal; their title line stands in.
pub fn preview_report(sections: &[Section]) {
    for section in sections {
        if let Some(title) = &section.title {
            println!("\n## {}", title);
        }
        for block in &section.blocks {
            match block {
                Block::Metrics(metrics) => {
                    println!();
                    for metric in metrics {
                        println!("  {}: {}", metric.label, metric.value);
                    }
                }
                Block::Chart(spec) => {
                    println!("\n  [Graphique] {}", spec.title);
                }
                Block::Table(table) => {
                    println!();
                    preview_table(&table.columns, &table.rows, PREVIEW_ROWS);
                    if table.rows.len() > PREVIEW_ROWS {
                        println!("  ({} lignes au total)", table.rows.len());
                    }
                }
                Block::Text(narrative) => {
                    println!("\n{}", narrative.plain_text());
                }
            }
        }
    }
    println!();
}

fn preview_table(columns: &[String], rows: &[Vec<String>], max_rows: usize) {
    if rows.is_empty() {
        println!("(aucune ligne)");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows.iter().take(max_rows) {
        builder.push_record(row.iter().cloned());
    }
    let table = builder.build().with(Style::markdown()).to_string();
    println!("{}", table);
}
