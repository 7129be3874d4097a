//! Delimited text parsing: delimiter sniffing and row extraction.

use tracing::debug;

use super::RawTable;
use crate::error::{PrepError, Result};
use crate::types::Cell;
use crate::utils::is_na_marker;

/// Delimiters tried by [`detect_delimiter`], in preference order.
pub const DELIMITER_CANDIDATES: [u8; 3] = [b',', b'\t', b';'];

pub const DEFAULT_DELIMITER: u8 = b',';

fn open_reader(text: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Field count of each of the first `sample_rows` records, or `None` if the
/// sample does not parse with this delimiter.
fn sampled_field_counts(text: &str, delimiter: u8, sample_rows: usize) -> Option<Vec<usize>> {
    let mut reader = open_reader(text, delimiter);
    reader
        .records()
        .take(sample_rows)
        .map(|record| record.ok().map(|r| r.len()))
        .collect()
}

/// Pick the delimiter that yields a consistent column count on the sample.
///
/// The first candidate with a consistent count above one wins. Failing that,
/// the first candidate with a consistent single column is used, and finally
/// the comma.
pub fn detect_delimiter(text: &str, sample_rows: usize) -> u8 {
    let mut single_column = None;

    for delimiter in DELIMITER_CANDIDATES {
        let Some(counts) = sampled_field_counts(text, delimiter, sample_rows) else {
            continue;
        };
        let Some(first) = counts.first().copied() else {
            continue;
        };
        if !counts.iter().all(|c| *c == first) {
            continue;
        }
        if first > 1 {
            debug!(
                "Detected delimiter {:?} with {} columns",
                delimiter as char, first
            );
            return delimiter;
        }
        if first == 1 && single_column.is_none() {
            single_column = Some(delimiter);
        }
    }

    single_column.unwrap_or(DEFAULT_DELIMITER)
}

/// Parse delimited text into a raw table. The first record is the header.
pub fn parse_delimited(text: &str, delimiter: u8, na_values: &[String]) -> Result<RawTable> {
    let mut reader = open_reader(text, delimiter);
    let mut records = reader.records();

    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => return Err(PrepError::EmptyFile),
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                if is_na_marker(field, na_values) {
                    Cell::Missing
                } else {
                    Cell::text(field)
                }
            })
            .collect();
        rows.push(row);
    }

    RawTable::from_rows(headers, rows)
}
