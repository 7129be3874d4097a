//! Dataset export: CSV output and polars hand-off.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::error::{Result, ResultExt};
use crate::types::Dataset;

/// Write `dataset` as comma-separated text with a header row.
///
/// Missing cells are written as empty fields.
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(dataset.column_names())?;

    for row in 0..dataset.row_count() {
        let record = dataset
            .columns()
            .iter()
            .map(|column| column.cells()[row].render().unwrap_or_default());
        csv_writer.write_record(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_csv_file(dataset: &Dataset, path: &Path) -> Result<()> {
    let file = File::create(path).context(format!("Failed to create '{}'", path.display()))?;
    write_csv(dataset, file)?;
    info!("Dataset saved: {}", path.display());
    Ok(())
}

/// Convert to a polars `DataFrame`, one typed column per role.
pub fn to_dataframe(dataset: &Dataset) -> Result<DataFrame> {
    let columns = dataset
        .columns()
        .iter()
        .map(|column| column.to_series().into())
        .collect::<Vec<Column>>();

    Ok(DataFrame::new(columns)?)
}

impl Dataset {
    /// Hand the snapshot to polars-based collaborators.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        to_dataframe(self)
    }
}
