//! Core data model: roles, cells, columns and immutable datasets.
//!
//! A [`Dataset`] is never mutated in place. Every transformation builds a new
//! value; columns are reference counted so unchanged columns are shared
//! between history snapshots.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};

// ============================================================================
// Role
// ============================================================================

/// Semantic classification of a column.
///
/// The role decides which operations are legal on a column; it is metadata,
/// not the storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Numeric,
    Categorical,
    Datetime,
    Boolean,
    Text,
}

impl Role {
    /// All roles, in inference priority order.
    pub const ALL: [Role; 5] = [
        Role::Datetime,
        Role::Categorical,
        Role::Boolean,
        Role::Numeric,
        Role::Text,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
            Self::Text => "text",
        }
    }

    /// Whether a cell has the physical kind this role stores.
    pub fn accepts(&self, cell: &Cell) -> bool {
        match (self, cell) {
            (_, Cell::Missing) => true,
            (Self::Numeric, Cell::Number(_)) => true,
            (Self::Datetime, Cell::DateTime(_)) => true,
            (Self::Boolean, Cell::Boolean(_)) => true,
            (Self::Categorical | Self::Text, Cell::Text(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Cell
// ============================================================================

/// A single value in a column, or an explicit missing marker.
///
/// Numbers are always finite: use [`Cell::number`] to build one from an
/// arbitrary float.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
    Boolean(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Build a numeric cell; non-finite values become [`Cell::Missing`].
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Missing
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    #[inline]
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Canonical text rendering, `None` for missing cells.
    ///
    /// Datetimes at midnight render as a bare date so that the default
    /// datetime patterns parse the rendering back.
    pub fn render(&self) -> Option<String> {
        match self {
            Cell::Missing => None,
            Cell::Number(v) => Some(v.to_string()),
            Cell::Text(s) => Some(s.clone()),
            Cell::Boolean(b) => Some(b.to_string()),
            Cell::DateTime(dt) => {
                if dt.time() == NaiveTime::MIN {
                    Some(dt.format("%Y-%m-%d").to_string())
                } else {
                    Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())
                }
            }
        }
    }

    /// Approximate heap + inline footprint in bytes.
    pub fn estimated_size(&self) -> usize {
        let inline = std::mem::size_of::<Cell>();
        match self {
            Cell::Text(s) => inline + s.capacity(),
            _ => inline,
        }
    }
}

// Numbers are finite by construction, so equality is reflexive.
impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Missing => {}
            // -0.0 == 0.0 must hash identically
            Cell::Number(v) => {
                let normalized = if *v == 0.0 { 0.0f64 } else { *v };
                normalized.to_bits().hash(state);
            }
            Cell::Text(s) => s.hash(state),
            Cell::Boolean(b) => b.hash(state),
            Cell::DateTime(dt) => dt.hash(state),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(text) => f.write_str(&text),
            None => f.write_str("NA"),
        }
    }
}

// ============================================================================
// Column
// ============================================================================

/// A named, role-tagged sequence of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    role: Role,
    cells: Arc<[Cell]>,
}

impl Column {
    /// Create a column without checking cell kinds against the role.
    pub fn new(name: impl Into<String>, role: Role, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            role,
            cells: cells.into(),
        }
    }

    /// Create a column, rejecting cells whose kind does not match the role.
    pub fn try_new(name: impl Into<String>, role: Role, cells: Vec<Cell>) -> Result<Self> {
        let name = name.into();
        if let Some(bad) = cells.iter().find(|c| !role.accepts(c)) {
            return Err(PrepError::TypeMismatch {
                column: name,
                role,
                value: bad.to_string(),
            });
        }
        Ok(Self::new(name, role, cells))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }

    pub fn non_missing(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| !c.is_missing())
    }

    /// Numeric values of the column, skipping missing and non-numeric cells.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.cells.iter().filter_map(Cell::as_number).collect()
    }

    /// Number of distinct non-missing values.
    pub fn distinct_count(&self) -> usize {
        self.non_missing().collect::<HashSet<_>>().len()
    }

    /// Same name and role, new cells.
    pub fn with_cells(&self, cells: Vec<Cell>) -> Self {
        Self::new(self.name.clone(), self.role, cells)
    }

    /// Same name, new role and cells.
    pub fn with_role(&self, role: Role, cells: Vec<Cell>) -> Self {
        Self::new(self.name.clone(), role, cells)
    }

    /// Keep the cells whose flag in `keep` is true.
    pub fn filter(&self, keep: &[bool]) -> Self {
        let cells = self
            .cells
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(c, _)| c.clone())
            .collect();
        self.with_cells(cells)
    }

    fn estimated_size(&self) -> usize {
        self.name.len() + self.cells.iter().map(Cell::estimated_size).sum::<usize>()
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// Immutable snapshot of a table.
///
/// Invariants: all columns have `row_count` cells and column names are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    /// Build a dataset, validating the shared row count and unique names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);

        let mut seen = HashSet::new();
        for column in &columns {
            if column.len() != row_count {
                return Err(PrepError::InvalidDataset(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name(),
                    column.len(),
                    row_count
                )));
            }
            if !seen.insert(column.name()) {
                return Err(PrepError::InvalidDataset(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
        }

        Ok(Self { columns, row_count })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.row_count, self.columns.len())
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| PrepError::ColumnNotFound(name.to_string()))
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| PrepError::ColumnNotFound(name.to_string()))
    }

    /// Cells of one row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Cell>> {
        if index >= self.row_count {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.cells()[index]).collect())
    }

    /// Keep only the rows whose flag in `keep` is true.
    pub fn filter_rows(&self, keep: &[bool]) -> Result<Self> {
        if keep.len() != self.row_count {
            return Err(PrepError::InvalidDataset(format!(
                "row mask has {} entries, expected {}",
                keep.len(),
                self.row_count
            )));
        }
        if keep.iter().all(|k| *k) {
            return Ok(self.clone());
        }
        let row_count = keep.iter().filter(|k| **k).count();
        let columns = self.columns.iter().map(|c| c.filter(keep)).collect();
        Ok(Self { columns, row_count })
    }

    /// Replace the column with the same name, keeping position.
    pub fn replace_column(&self, column: Column) -> Result<Self> {
        let index = self.column_index(column.name())?;
        let mut columns = self.columns.clone();
        columns[index] = column;
        Self::new(columns)
    }

    /// Rough in-memory footprint used for the ingestion memory ceiling.
    pub fn estimated_memory_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.columns.iter().map(Column::estimated_size).sum::<usize>()
    }

    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }
}
