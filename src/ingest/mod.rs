// src/ingest/mod.rs
//! Turns the decoded first sheet into an ordered sequence of `RawRow`s with
//! best-effort header detection.

use crate::error::LoadError;
use crate::row::{CellValue, Row};
use tracing::{debug, info};

/// One ingested data row, keyed by header or positional letter code.
pub type RawRow = Row;

/// First sheet of the workbook as delivered by the spreadsheet decoder:
/// a row-major grid of typed cells plus the declared column count, if the
/// decoder reported one.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub rows: Vec<Vec<CellValue>>,
    pub declared_cols: Option<usize>,
}

/// Cells longer than this count as long free text for header detection.
const HEADER_LONG_TEXT: usize = 30;
/// A candidate header row is rejected once this share of its non-blank
/// cells is long free text.
const HEADER_LONG_SHARE: f64 = 0.6;

/// Spreadsheet-style column code for a 0-based index: A..Z, AA, AB, …
pub fn column_letter(mut idx: usize) -> String {
    let mut out: Vec<char> = Vec::new();
    loop {
        out.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    out.iter().rev().collect()
}

fn row_is_blank(cells: &[CellValue]) -> bool {
    cells.iter().all(CellValue::is_blank)
}

/// Header heuristic: at least two non-blank cells, none of them numeric or
/// a date, and fewer than 60% of the non-blank cells longer than 30
/// characters. Long free-text rows are data, not headers.
fn looks_like_header(cells: &[CellValue]) -> bool {
    let non_blank: Vec<&CellValue> = cells.iter().filter(|c| !c.is_blank()).collect();
    if non_blank.len() < 2 {
        return false;
    }
    if non_blank
        .iter()
        .any(|c| matches!(c, CellValue::Number(_) | CellValue::Date(_)))
    {
        return false;
    }
    let long = non_blank
        .iter()
        .filter(|c| c.render().chars().count() > HEADER_LONG_TEXT)
        .count();
    (long as f64) < HEADER_LONG_SHARE * non_blank.len() as f64
}

/// Build one `RawRow` per non-blank data row of the sheet.
///
/// Rows before the first non-blank row are padding and skipped. The first
/// non-blank row becomes the header if the heuristic accepts it, otherwise
/// it is data under synthesized letter codes. Blank rows are dropped
/// silently.
#[tracing::instrument(level = "info", skip(sheet), fields(rows = sheet.rows.len()))]
pub fn ingest(sheet: &Sheet) -> Result<Vec<RawRow>, LoadError> {
    let first = sheet
        .rows
        .iter()
        .position(|r| !row_is_blank(r))
        .ok_or(LoadError::EmptyInput)?;

    // declared column count wins; the widest observed row is the fallback
    let widest = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);
    let width = sheet.declared_cols.unwrap_or(widest);

    let head = &sheet.rows[first];
    let (keys, data_start) = if looks_like_header(head) {
        let mut keys = Vec::with_capacity(width);
        let mut any_text = false;
        for i in 0..width {
            let name = head
                .get(i)
                .map(|c| c.render().trim().to_string())
                .unwrap_or_default();
            if name.is_empty() {
                keys.push(format!("__COL_{}", i + 1));
            } else {
                any_text = true;
                keys.push(name);
            }
        }
        if !any_text {
            return Err(LoadError::MissingHeader);
        }
        debug!(?keys, "first non-blank row classified as header");
        (keys, first + 1)
    } else {
        debug!("no header detected; synthesizing positional column codes");
        ((0..width).map(column_letter).collect(), first)
    };

    let mut out = Vec::new();
    for cells in sheet.rows[data_start..].iter() {
        if row_is_blank(cells) {
            continue;
        }
        let mut row = Row::new();
        for (i, key) in keys.iter().enumerate() {
            row.set(key.clone(), cells.get(i).cloned().unwrap_or(CellValue::Empty));
        }
        out.push(row);
    }
    if out.is_empty() {
        return Err(LoadError::NoDataRows);
    }
    info!(count = out.len(), "ingested data rows");
    Ok(out)
}
