// Entry point and interactive flow.
//
// The shell is a plain menu loop:
// - Option [1] loads the weekly workbook (cached by file identity).
// - Option [2] previews one analysis page in the terminal.
// - Options [3]/[4] export a page or the whole report to xlsx/pdf.
// - Option [5] dumps the structured report as JSON for inspection.
mod analytics;
mod charts;
mod classify;
mod error;
mod excel;
mod loader;
mod narrative;
mod output;
mod pages;
mod pdf;
mod report;
mod types;
mod util;

use anyhow::{Context, Result};
use loader::WorkbookCache;
use pages::PageKey;
use report::ReportContent;
use std::io::{self, Write};
use std::path::PathBuf;
use types::Datasets;

const DEFAULT_WORKBOOK: &str = "rapport_hebdomadaire.xlsx";
const FULL_REPORT_NAME: &str = "Rapport Complet";

struct AppState {
    cache: WorkbookCache,
    path: Option<PathBuf>,
}

/// Read a single line of input after printing a prompt.
fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Handle option [1]: load (or reload) the workbook.
fn handle_load(state: &mut AppState) {
    let input = read_line(&format!("Chemin du classeur [{}]: ", DEFAULT_WORKBOOK));
    let path = if input.is_empty() {
        PathBuf::from(DEFAULT_WORKBOOK)
    } else {
        PathBuf::from(input)
    };
    match state.cache.load(&path) {
        Ok(data) => {
            let rows: usize = data.iter().map(|(_, ds)| ds.rows.len()).sum();
            println!(
                "Classeur chargé: {} ({} feuilles, {} lignes)\n",
                path.display(),
                data.iter().count(),
                util::format_int(rows)
            );
            state.path = Some(path);
        }
        Err(e) => {
            eprintln!("Échec du chargement: {}\n", e);
        }
    }
}

/// Print the page menu and read a selection.
fn pick_page() -> Option<PageKey> {
    println!();
    for (i, key) in PageKey::ALL.iter().enumerate() {
        println!("[{}] {}", i + 1, key.title());
    }
    let choice = read_line("Page: ");
    let index: usize = choice.parse().ok()?;
    PageKey::ALL.get(index.checked_sub(1)?).copied()
}

fn pick_format() -> Option<&'static str> {
    match read_line("Format ([1] xlsx / [2] pdf): ").as_str() {
        "1" => Some("xlsx"),
        "2" => Some("pdf"),
        _ => None,
    }
}

fn handle_preview(data: &Datasets) {
    let Some(key) = pick_page() else {
        println!("Choix invalide.\n");
        return;
    };
    println!("\n# {}", key.title());
    output::preview_report(&pages::generate_page(key, data));
}

fn export_page(data: &Datasets, key: PageKey, format: &str) -> Result<String> {
    let filename = util::export_filename(key.title(), format);
    let bytes = match format {
        "xlsx" => {
            let content = ReportContent::Single(pages::generate_page(key, data));
            excel::export(data, Some(key), Some(&content))?
        }
        _ => pdf::export(key.title(), &pages::generate_page(key, data))?,
    };
    std::fs::write(&filename, bytes).with_context(|| format!("écriture de {}", filename))?;
    Ok(filename)
}

fn export_full(data: &Datasets, format: &str) -> Result<String> {
    let filename = util::export_filename(FULL_REPORT_NAME, format);
    let bytes = match format {
        "xlsx" => {
            let content = ReportContent::Structured(pages::generate_structured_report(data));
            excel::export(data, None, Some(&content))?
        }
        _ => pdf::export(FULL_REPORT_NAME, &pages::generate_full_report(data))?,
    };
    std::fs::write(&filename, bytes).with_context(|| format!("écriture de {}", filename))?;
    Ok(filename)
}

fn handle_export_page(data: &Datasets) {
    let Some(key) = pick_page() else {
        println!("Choix invalide.\n");
        return;
    };
    let Some(format) = pick_format() else {
        println!("Choix invalide.\n");
        return;
    };
    match export_page(data, key, format) {
        Ok(filename) => println!("Export terminé: {}\n", filename),
        Err(e) => eprintln!("Échec de l'export: {:#}\n", e),
    }
}

fn handle_export_full(data: &Datasets) {
    let Some(format) = pick_format() else {
        println!("Choix invalide.\n");
        return;
    };
    println!("Génération du rapport complet...");
    match export_full(data, format) {
        Ok(filename) => println!("Export terminé: {}\n", filename),
        Err(e) => eprintln!("Échec de l'export: {:#}\n", e),
    }
}

fn handle_dump_json(data: &Datasets) {
    let structured = pages::generate_structured_report(data);
    let filename = util::export_filename(FULL_REPORT_NAME, "json");
    match output::write_json(&filename, &structured) {
        Ok(()) => println!("Rapport structuré écrit dans {}\n", filename),
        Err(e) => eprintln!("Échec de l'écriture: {}\n", e),
    }
}

fn main() {
    env_logger::init();
    let mut state = AppState {
        cache: WorkbookCache::new(),
        path: None,
    };
    loop {
        println!("Rapport de Flotte Hebdomadaire");
        println!("[1] Charger le classeur");
        println!("[2] Aperçu d'une page");
        println!("[3] Exporter une page");
        println!("[4] Exporter le rapport complet");
        println!("[5] Export JSON du rapport structuré");
        println!("[q] Quitter\n");
        let choice = read_line("Votre choix: ");

        if choice == "1" {
            handle_load(&mut state);
            continue;
        }
        if choice.eq_ignore_ascii_case("q") {
            println!("Fin du programme.");
            break;
        }

        // Re-check the file on every action so a replaced workbook is
        // picked up without restarting.
        let data = match &state.path {
            Some(path) => match state.cache.load(path) {
                Ok(data) => data,
                Err(e) => {
                    eprintln!("Échec du chargement: {}\n", e);
                    continue;
                }
            },
            None => {
                println!("Erreur: aucun classeur chargé. Utilisez d'abord l'option 1.\n");
                continue;
            }
        };

        match choice.as_str() {
            "2" => handle_preview(&data),
            "3" => handle_export_page(&data),
            "4" => handle_export_full(&data),
            "5" => handle_dump_json(&data),
            _ => println!("Choix invalide.\n"),
        }
    }
}
