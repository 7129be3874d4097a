//! Spreadsheet ingestion through `calamine`.
//!
//! Only the first worksheet is read. Typed spreadsheet values are kept as
//! typed cells so the inferencer does not have to re-parse them.

use std::io::Cursor;

use calamine::{Data, DataType, Reader, open_workbook_auto_from_rs};
use tracing::warn;

use super::RawTable;
use crate::error::{PrepError, Result};
use crate::types::Cell;
use crate::utils::is_na_marker;

/// Read the first worksheet of an xlsx/xlsm/xls/ods workbook.
///
/// Returns the sheet name and its table.
pub fn read_first_sheet(bytes: &[u8], na_values: &[String]) -> Result<(String, RawTable)> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| PrepError::UnreadableFile(format!("failed to open workbook: {e}")))?;

    let sheet_names = workbook.sheet_names();
    let Some(sheet) = sheet_names.first().cloned() else {
        return Err(PrepError::UnreadableFile("workbook has no worksheets".to_string()));
    };
    if sheet_names.len() > 1 {
        warn!(
            "Workbook has {} sheets, only '{}' is loaded",
            sheet_names.len(),
            sheet
        );
    }

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PrepError::UnreadableFile("workbook has no worksheets".to_string()))?
        .map_err(|e| PrepError::UnreadableFile(format!("failed to read sheet '{sheet}': {e}")))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(PrepError::EmptyFile);
    };
    let headers = header_row
        .iter()
        .map(|cell| header_text(cell))
        .collect::<Vec<_>>();

    let data_rows: Vec<Vec<Cell>> = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| row.iter().map(|cell| to_cell(cell, na_values)).collect())
        .collect();

    Ok((sheet, RawTable::from_rows(headers, data_rows)?))
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_cell(cell: &Data, na_values: &[String]) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::String(s) if is_na_marker(s, na_values) => Cell::Missing,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(f) => Cell::number(*f),
        Data::Int(i) => Cell::number(*i as f64),
        Data::Bool(b) => Cell::Boolean(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) => Cell::DateTime(dt),
            None => Cell::text(cell.to_string()),
        },
        Data::DurationIso(s) => Cell::text(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cell_kinds() {
        let na = vec!["NULL".to_string()];
        assert_eq!(to_cell(&Data::Empty, &na), Cell::Missing);
        assert_eq!(to_cell(&Data::String("NULL".into()), &na), Cell::Missing);
        assert_eq!(to_cell(&Data::String("x".into()), &na), Cell::text("x"));
        assert_eq!(to_cell(&Data::Float(2.5), &na), Cell::Number(2.5));
        assert_eq!(to_cell(&Data::Int(3), &na), Cell::Number(3.0));
        assert_eq!(to_cell(&Data::Bool(true), &na), Cell::Boolean(true));
    }

    #[test]
    fn test_garbage_bytes_are_unreadable() {
        let err = read_first_sheet(b"PK\x03\x04not really a zip", &[]).unwrap_err();
        assert_eq!(err.error_code(), "UNREADABLE_FILE");
    }
}
