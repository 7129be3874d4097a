//! File ingestion: format routing, encoding and delimiter detection, and
//! conversion of uploaded bytes into a [`RawTable`].
//!
//! The ingestor never interprets values beyond marking configured NA markers as
//! missing. Typing is left to [`crate::profiler::TypeInferencer`].

pub mod delimited;
pub mod encoding;
pub mod spreadsheet;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::{PrepError, Result};
use crate::types::{Cell, Dataset};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

/// Where a table came from and how it was decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceFormat {
    Delimited { encoding: String, delimiter: char },
    Spreadsheet { sheet: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Delimited,
    Spreadsheet,
}

/// Untyped table straight out of a file: normalized headers and cells in
/// column-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    columns: Vec<Vec<Cell>>,
    row_count: usize,
}

impl RawTable {
    /// Build a table from a header row and data rows.
    ///
    /// Short rows are padded with missing cells. A row longer than the header
    /// makes the file unreadable, and a table without data rows is empty.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(PrepError::EmptyFile);
        }

        let width = headers.len();
        let mut columns: Vec<Vec<Cell>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() > width {
                return Err(PrepError::UnreadableFile(format!(
                    "data row {} has {} fields but the header has {}",
                    index + 1,
                    row.len(),
                    width
                )));
            }
            let present = row.len();
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(cell);
            }
            for column in columns.iter_mut().skip(present) {
                column.push(Cell::Missing);
            }
        }

        let row_count = columns.first().map(Vec::len).unwrap_or(0);
        Ok(Self {
            headers: normalize_headers(headers),
            columns,
            row_count,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn columns(&self) -> &[Vec<Cell>] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Consume the table into `(name, cells)` pairs.
    pub fn into_columns(self) -> impl Iterator<Item = (String, Vec<Cell>)> {
        self.headers.into_iter().zip(self.columns)
    }
}

/// Give blank headers positional names and make duplicates unique with
/// `.1`, `.2`, ... suffixes.
pub fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let named: Vec<String> = headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let trimmed = h.trim();
            if trimmed.is_empty() {
                format!("column_{}", i + 1)
            } else {
                trimmed.to_string()
            }
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::with_capacity(named.len());
    let mut result = Vec::with_capacity(named.len());
    for name in named {
        let mut candidate = name.clone();
        let mut suffix = 1;
        while taken.contains(&candidate) {
            candidate = format!("{name}.{suffix}");
            suffix += 1;
        }
        taken.insert(candidate.clone());
        result.push(candidate);
    }
    result
}

/// A raw table plus the format it was read with.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub format: SourceFormat,
    pub table: RawTable,
}

/// Turns uploaded bytes into a [`RawTable`].
pub struct FileIngestor<'a> {
    config: &'a EngineConfig,
}

impl<'a> FileIngestor<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Read `bytes` using the file name's extension to pick the format.
    ///
    /// Without a file name the format is sniffed from the leading bytes.
    pub fn ingest(&self, bytes: &[u8], file_name: Option<&str>) -> Result<IngestedTable> {
        self.check_size(bytes)?;

        let kind = detect_kind(bytes, file_name)?;
        debug!("Ingesting {} bytes as {:?}", bytes.len(), kind);

        let ingested = match kind {
            FileKind::Delimited => self.read_delimited(bytes)?,
            FileKind::Spreadsheet => {
                let (sheet, table) = spreadsheet::read_first_sheet(bytes, &self.config.na_values)?;
                IngestedTable {
                    format: SourceFormat::Spreadsheet { sheet },
                    table,
                }
            }
        };

        info!(
            "Ingested {} rows x {} columns ({:?})",
            ingested.table.row_count(),
            ingested.table.headers().len(),
            ingested.format
        );
        Ok(ingested)
    }

    fn check_size(&self, bytes: &[u8]) -> Result<()> {
        let size = bytes.len() as u64;
        if size > self.config.max_file_size_bytes() {
            return Err(PrepError::FileTooLarge {
                size_mb: size as f64 / (1024.0 * 1024.0),
                limit_mb: self.config.max_file_size_mb,
            });
        }
        Ok(())
    }

    fn read_delimited(&self, bytes: &[u8]) -> Result<IngestedTable> {
        let candidates = encoding::resolve_candidates(&self.config.encodings)?;
        let decoded = encoding::detect_and_decode(bytes, &candidates, self.config.sample_rows)?;
        if decoded.text.trim().is_empty() {
            return Err(PrepError::EmptyFile);
        }

        let delimiter = delimited::detect_delimiter(&decoded.text, self.config.sample_rows);
        let table = delimited::parse_delimited(&decoded.text, delimiter, &self.config.na_values)?;

        Ok(IngestedTable {
            format: SourceFormat::Delimited {
                encoding: decoded.encoding.to_string(),
                delimiter: delimiter as char,
            },
            table,
        })
    }
}

fn detect_kind(bytes: &[u8], file_name: Option<&str>) -> Result<FileKind> {
    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv" | "tsv" | "txt") => Ok(FileKind::Delimited),
        Some("xlsx" | "xlsm" | "xls" | "ods") => Ok(FileKind::Spreadsheet),
        Some(other) => Err(PrepError::UnsupportedFormat(other.to_string())),
        None if bytes.starts_with(ZIP_MAGIC) || bytes.starts_with(OLE_MAGIC) => {
            Ok(FileKind::Spreadsheet)
        }
        None => Ok(FileKind::Delimited),
    }
}

/// Reject typed tables whose estimated footprint exceeds the memory ceiling.
pub fn check_memory_ceiling(dataset: &Dataset, config: &EngineConfig) -> Result<()> {
    let estimated = dataset.estimated_memory_bytes() as f64;
    if estimated > config.max_memory_bytes() {
        return Err(PrepError::MemoryCeilingExceeded {
            estimated_gb: estimated / (1024.0 * 1024.0 * 1024.0),
            limit_gb: config.max_memory_usage_gb,
        });
    }
    Ok(())
}
