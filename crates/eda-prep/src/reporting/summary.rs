//! Serializable history summary and its plain-text rendering.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{History, OperationKind};

/// One active history step. Step 0 is the ingested dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummaryEntry {
    pub step: usize,
    /// `None` for the origin.
    pub kind: Option<OperationKind>,
    /// Operation parameters as submitted, `null` for the origin.
    pub params: Value,
    pub timestamp: DateTime<Local>,
    pub rows_before: usize,
    pub rows_after: usize,
    pub row_delta: i64,
    pub description: String,
}

/// Ordered steps from the origin up to the history cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub entries: Vec<HistorySummaryEntry>,
}

impl HistorySummary {
    pub fn from_history(history: &History) -> Self {
        let entries = history
            .active_entries()
            .iter()
            .enumerate()
            .map(|(step, entry)| match &entry.operation {
                Some(applied) => HistorySummaryEntry {
                    step,
                    kind: Some(applied.operation.kind()),
                    params: serde_json::to_value(&applied.operation).unwrap_or(Value::Null),
                    timestamp: applied.timestamp,
                    rows_before: applied.rows_before,
                    rows_after: applied.rows_after,
                    row_delta: applied.row_delta(),
                    description: entry.summary.clone(),
                },
                None => {
                    let rows = entry.dataset.row_count();
                    HistorySummaryEntry {
                        step,
                        kind: None,
                        params: Value::Null,
                        timestamp: entry.recorded_at,
                        rows_before: rows,
                        rows_after: rows,
                        row_delta: 0,
                        description: entry.summary.clone(),
                    }
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applied steps, excluding the origin.
    pub fn operations(&self) -> impl Iterator<Item = &HistorySummaryEntry> {
        self.entries.iter().filter(|e| e.kind.is_some())
    }
}

/// Plain-text log of the applied steps, suitable for a download.
pub fn history_report_text(summary: &HistorySummary, file_name: &str) -> String {
    let mut out = format!("Preprocessing history: {file_name}\n{}\n\n", "=".repeat(50));

    let applied: Vec<&HistorySummaryEntry> = summary.operations().collect();
    if applied.is_empty() {
        out.push_str("No operations applied.\n");
        return out;
    }

    for entry in applied {
        let kind = entry.kind.map(|k| k.as_str()).unwrap_or("unknown");
        out.push_str(&format!(
            "Step {}: {}\nTime: {}\nRows: {} -> {} ({:+})\n{}\n\n{}\n\n",
            entry.step,
            kind,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.rows_before,
            entry.rows_after,
            entry.row_delta,
            entry.description,
            "-".repeat(30),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AppliedOperation, Operation, OperationDetails};
    use crate::types::{Cell, Column, Dataset, Role};

    fn dataset(rows: usize) -> Dataset {
        Dataset::new(vec![Column::new(
            "a",
            Role::Numeric,
            (0..rows).map(|i| Cell::Number(i as f64)).collect(),
        )])
        .unwrap()
    }

    fn history() -> History {
        let mut history = History::new(dataset(3));
        history.push(
            AppliedOperation::new(
                Operation::DeleteRows { rows: vec![2] },
                3,
                2,
                OperationDetails::DeleteRows { removed: 1 },
            ),
            dataset(2),
        );
        history
    }

    #[test]
    fn test_summary_tracks_cursor() {
        let mut history = history();
        let summary = HistorySummary::from_history(&history);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.entries[0].kind, None);
        assert_eq!(summary.entries[1].kind, Some(OperationKind::DeleteRows));
        assert_eq!(summary.entries[1].row_delta, -1);
        assert_eq!(summary.entries[1].params["rows"][0], 2);

        history.undo().unwrap();
        assert_eq!(HistorySummary::from_history(&history).len(), 1);
    }

    #[test]
    fn test_report_text_lists_steps() {
        let summary = HistorySummary::from_history(&history());
        let text = history_report_text(&summary, "data.csv");
        assert!(text.starts_with("Preprocessing history: data.csv"));
        assert!(text.contains("Step 1: delete_rows"));
        assert!(text.contains("Rows: 3 -> 2 (-1)"));
        assert!(text.contains("Delete 1 row(s): removed 1 row(s)"));
        assert!(text.ends_with(&format!("\n\n{}\n\n", "-".repeat(30))));
    }

    #[test]
    fn test_report_text_without_operations() {
        let summary = HistorySummary::from_history(&History::new(dataset(1)));
        assert_eq!(
            history_report_text(&summary, "x.csv"),
            format!(
                "Preprocessing history: x.csv\n{}\n\nNo operations applied.\n",
                "=".repeat(50)
            )
        );
    }
}
