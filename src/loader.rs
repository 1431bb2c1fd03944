// Workbook ingestion: eight named sheets into immutable Datasets.
//
// Loading is memoized per file identity (path + size + mtime) by an
// explicit cache the caller owns, so repeated page navigation never
// re-parses the workbook while a replaced file always does.
use crate::error::{ReportError, Result};
use crate::types::{Cell, Dataset, Datasets, SheetKey};
use calamine::{open_workbook, Data, Reader, Xlsx};
use log::info;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Identity token of an uploaded file. Two tokens compare equal only
/// when nothing about the file on disk changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToken {
    len: u64,
    mtime: Option<SystemTime>,
}

impl FileToken {
    pub fn for_path(path: &Path) -> Result<FileToken> {
        let meta = std::fs::metadata(path)?;
        Ok(FileToken {
            len: meta.len(),
            mtime: meta.modified().ok(),
        })
    }
}

/// Explicit load cache: one entry per path, invalidated when the file
/// identity changes. Owned by the shell, not process-global.
#[derive(Default)]
pub struct WorkbookCache {
    entries: HashMap<PathBuf, (FileToken, Arc<Datasets>)>,
}

impl WorkbookCache {
    pub fn new() -> WorkbookCache {
        WorkbookCache::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<Arc<Datasets>> {
        let token = FileToken::for_path(path)?;
        if let Some((cached_token, data)) = self.entries.get(path) {
            if *cached_token == token {
                return Ok(Arc::clone(data));
            }
        }
        let data = Arc::new(load_datasets(path)?);
        self.entries
            .insert(path.to_path_buf(), (token, Arc::clone(&data)));
        Ok(data)
    }
}

/// Parse the workbook at `path`. Any missing or unreadable sheet fails
/// the whole load.
pub fn load_datasets(path: &Path) -> Result<Datasets> {
    let workbook: Xlsx<_> = open_workbook(path)?;
    let data = read_all_sheets(workbook)?;
    info!("classeur chargé: {}", path.display());
    Ok(data)
}

/// Same as `load_datasets` for an already-open reader (uploaded bytes).
pub fn load_datasets_from_reader<RS: Read + Seek>(reader: RS) -> Result<Datasets> {
    let workbook = Xlsx::new(reader)?;
    read_all_sheets(workbook)
}

fn read_all_sheets<RS: Read + Seek>(mut workbook: Xlsx<RS>) -> Result<Datasets> {
    let mut sheets = BTreeMap::new();
    for key in SheetKey::ALL {
        let name = key.sheet_name();
        let range = workbook
            .worksheet_range(name)
            .map_err(|_| ReportError::Sheet {
                name: name.to_string(),
            })?;
        sheets.insert(key, dataset_from_range(name, &range));
    }
    Ok(Datasets::new(sheets))
}

fn dataset_from_range(name: &str, range: &calamine::Range<Data>) -> Dataset {
    let mut rows_iter = range.rows();
    let columns: Vec<String> = match rows_iter.next() {
        Some(header) => header.iter().map(cell_text).collect(),
        None => Vec::new(),
    };
    let rows: Vec<Vec<Cell>> = rows_iter
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();
    Dataset::new(name, columns, rows)
}

fn cell_text(data: &Data) -> String {
    match data {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.to_string())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{COL_DISTANCE, IDENTIFIER_COLUMN};
    use std::io::Cursor;

    /// Build a minimal valid workbook in memory with all eight sheets.
    fn sample_workbook() -> Vec<u8> {
        let mut wb = rust_xlsxwriter::Workbook::new();
        for key in SheetKey::ALL {
            let ws = wb.add_worksheet();
            ws.set_name(key.sheet_name()).unwrap();
            ws.write_string(0, 0, IDENTIFIER_COLUMN).unwrap();
            ws.write_string(0, 1, COL_DISTANCE).unwrap();
            ws.write_string(1, 0, "V1").unwrap();
            ws.write_number(1, 1, 12.5).unwrap();
            ws.write_string(2, 0, "-----").unwrap();
        }
        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn loads_all_eight_sheets() {
        let bytes = sample_workbook();
        let data = load_datasets_from_reader(Cursor::new(bytes)).unwrap();
        for key in SheetKey::ALL {
            let ds = data.get(key);
            assert_eq!(ds.columns[0], IDENTIFIER_COLUMN);
            assert_eq!(ds.rows.len(), 2);
            assert_eq!(ds.number(&ds.rows[0], COL_DISTANCE), Some(12.5));
        }
    }

    #[test]
    fn missing_sheet_fails_whole_load() {
        let mut wb = rust_xlsxwriter::Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("Visites POI").unwrap();
        ws.write_string(0, 0, IDENTIFIER_COLUMN).unwrap();
        let bytes = wb.save_to_buffer().unwrap();
        let err = load_datasets_from_reader(Cursor::new(bytes)).unwrap_err();
        match err {
            ReportError::Sheet { name } => {
                assert_eq!(name, SheetKey::DurationDistance.sheet_name());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cache_reuses_until_file_changes() {
        let dir = std::env::temp_dir();
        let path = dir.join("fleet_report_cache_test.xlsx");
        std::fs::write(&path, sample_workbook()).unwrap();

        let mut cache = WorkbookCache::new();
        let first = cache.load(&path).unwrap();
        let second = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        // Rewrite the file with different content; identity changes.
        let mut wb = rust_xlsxwriter::Workbook::new();
        for key in SheetKey::ALL {
            let ws = wb.add_worksheet();
            ws.set_name(key.sheet_name()).unwrap();
            ws.write_string(0, 0, IDENTIFIER_COLUMN).unwrap();
            ws.write_string(1, 0, "V9").unwrap();
        }
        // The new file has a different size, so the token changes even
        // when mtime granularity is coarse.
        std::fs::write(&path, wb.save_to_buffer().unwrap()).unwrap();
        let third = cache.load(&path).unwrap();
        let ds = third.get(SheetKey::DurationDistance);
        assert_eq!(ds.identifier(&ds.rows[0]), Some("V9"));
        std::fs::remove_file(&path).ok();
    }
}
