//! Integration tests for the preprocessing engine.
//!
//! These tests drive sessions end to end, from raw file bytes through
//! operations, history navigation and export.

use eda_prep::engine::OperationBudget;
use eda_prep::reporting::{history_report_text, write_csv_file};
use eda_prep::{
    Cell, Column, Dataset, EngineConfig, EngineState, ImputeStrategy, KeepPolicy, Operation,
    OperationDetails, OperationKind, OutlierDetector, OutlierMethod, PrepError, Role, Session,
    SourceFormat, TransformationEngine,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::io::Write;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_session(filename: &str) -> Session {
    let bytes = std::fs::read(fixtures_path().join(filename)).expect("Failed to read fixture");
    Session::ingest(&bytes, Some(filename), EngineConfig::default())
        .expect("Failed to ingest fixture")
}

fn numeric_column(name: &str, values: &[Option<f64>]) -> Column {
    Column::new(
        name,
        Role::Numeric,
        values
            .iter()
            .map(|v| v.map(Cell::Number).unwrap_or(Cell::Missing))
            .collect(),
    )
}

// ============================================================================
// Ingestion
// ============================================================================

#[test]
fn test_ingest_sales_roles() {
    let session = load_session("sales.csv");
    let dataset = session.current_dataset().unwrap();

    assert_eq!(dataset.shape(), (6, 4));
    assert_eq!(dataset.column("id").unwrap().role(), Role::Numeric);
    assert_eq!(dataset.column("price").unwrap().role(), Role::Numeric);
    assert_eq!(dataset.column("region").unwrap().role(), Role::Categorical);
    assert_eq!(dataset.column("date").unwrap().role(), Role::Datetime);
    assert_eq!(dataset.total_missing(), 2);
}

#[test]
fn test_ingest_semicolon_file() {
    let session = load_session("semicolon.csv");
    assert_eq!(
        session.source_format(),
        &SourceFormat::Delimited {
            encoding: "UTF-8".to_string(),
            delimiter: ';',
        }
    );
    let dataset = session.current_dataset().unwrap();
    assert_eq!(dataset.column_names(), vec!["city", "visits", "note"]);
    assert_eq!(dataset.column("note").unwrap().missing_count(), 1);
}

#[test]
fn test_ingest_shift_jis_file() {
    let session = load_session("shift_jis.csv");
    assert!(matches!(
        session.source_format(),
        SourceFormat::Delimited { encoding, .. } if encoding == "Shift_JIS"
    ));
    let dataset = session.current_dataset().unwrap();
    assert_eq!(dataset.column_names(), vec!["名前", "年齢", "部署"]);
    assert_eq!(dataset.column("年齢").unwrap().role(), Role::Numeric);
    assert_eq!(dataset.column("部署").unwrap().role(), Role::Categorical);
}

#[test]
fn test_categorical_needs_half_the_rows_or_fewer() {
    let csv = b"score,flag,grade\n10,true,a\n20,false,b\n10,true,a\n30,true,b\n40,false,a\n50,true,b\n";
    let session = Session::ingest(csv, Some("grades.csv"), EngineConfig::default()).unwrap();
    let dataset = session.current_dataset().unwrap();
    assert_eq!(dataset.column("score").unwrap().role(), Role::Numeric);
    assert_eq!(dataset.column("flag").unwrap().role(), Role::Categorical);
    assert_eq!(dataset.column("grade").unwrap().role(), Role::Categorical);

    let short = Session::ingest(b"flag\ntrue\nfalse\ntrue\n", None, EngineConfig::default()).unwrap();
    assert_eq!(
        short.current_dataset().unwrap().column("flag").unwrap().role(),
        Role::Boolean
    );

}

#[test]
fn test_valid_utf8_never_falls_back() {
    let bytes = "名前,値\n東京,1\n大阪,2\n".as_bytes();
    let session = Session::ingest(bytes, Some("jp.csv"), EngineConfig::default()).unwrap();
    assert!(matches!(
        session.source_format(),
        SourceFormat::Delimited { encoding, .. } if encoding == "UTF-8"
    ));
}

#[test]
fn test_ingest_rejects_oversized_file() {
    let config = EngineConfig {
        max_file_size_mb: 1,
        ..EngineConfig::default()
    };
    let mut bytes = b"a\n".to_vec();
    bytes.extend(std::iter::repeat_n(b'1', 1_100_000));
    let err = Session::ingest(&bytes, Some("big.csv"), config).unwrap_err();
    assert!(matches!(err, PrepError::FileTooLarge { limit_mb: 1, .. }));
}

#[test]
fn test_ingest_header_only_file() {
    let err = Session::ingest(b"a,b\n", Some("empty.csv"), EngineConfig::default()).unwrap_err();
    assert!(matches!(err, PrepError::EmptyFile));
}

#[test]
fn test_ingest_unknown_extension() {
    let err = Session::ingest(b"{}", Some("data.json"), EngineConfig::default()).unwrap_err();
    assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
}

#[test]
fn test_ingest_memory_ceiling() {
    let config = EngineConfig {
        max_memory_usage_gb: 1e-9,
        ..EngineConfig::default()
    };
    let err = Session::ingest(b"a,b\n1,2\n3,4\n", Some("a.csv"), config).unwrap_err();
    assert!(matches!(err, PrepError::MemoryCeilingExceeded { .. }));
}

// ============================================================================
// Operations and history
// ============================================================================

#[test]
fn test_iqr_flags_only_extreme_value() {
    let dataset = Dataset::new(vec![numeric_column(
        "x",
        &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0), Some(100.0)],
    )])
    .unwrap();
    let report = OutlierDetector::detect(
        &dataset,
        "x",
        OutlierMethod::Iqr,
        Some(1.5),
        &EngineConfig::default().outlier,
        &OperationBudget::unlimited(),
    )
    .unwrap();
    assert_eq!(report.outlier_rows(), vec![5]);
}

#[test]
fn test_modified_zscore_with_zero_mad_flags_nothing() {
    let dataset = Dataset::new(vec![numeric_column("x", &[Some(7.0); 8])]).unwrap();
    for threshold in [0.01, 1.0, 3.5, 100.0] {
        let report = OutlierDetector::detect(
            &dataset,
            "x",
            OutlierMethod::ModifiedZScore,
            Some(threshold),
            &EngineConfig::default().outlier,
            &OperationBudget::unlimited(),
        )
        .unwrap();
        assert_eq!(report.outlier_count, 0);
    }
}

#[test]
fn test_forward_fill_keeps_leading_missing() {
    // two distinct readings in five rows would otherwise be categorical
    let config = EngineConfig::builder().categorical_threshold(1).build().unwrap();
    let bytes = std::fs::read(fixtures_path().join("forward_fill.csv")).unwrap();
    let mut session = Session::ingest(&bytes, Some("forward_fill.csv"), config).unwrap();
    assert_eq!(
        session.current_dataset().unwrap().column("reading").unwrap().role(),
        Role::Numeric
    );
    session
        .apply(Operation::Impute {
            columns: vec!["reading".to_string()],
            strategy: ImputeStrategy::ForwardFill,
        })
        .unwrap();
    let dataset = session.current_dataset().unwrap();
    assert_eq!(
        dataset.column("reading").unwrap().cells(),
        &[
            Cell::Missing,
            Cell::Number(1.0),
            Cell::Number(1.0),
            Cell::Number(3.0),
            Cell::Number(3.0),
        ]
    );
}

#[test]
fn test_drop_duplicates_keep_last() {
    let mut session = load_session("duplicates.csv");
    let entry = session
        .apply(Operation::DropDuplicates {
            subset: Some(vec!["key".to_string(), "tag".to_string()]),
            keep: KeepPolicy::Last,
        })
        .unwrap();
    assert_eq!(
        entry.operation.as_ref().map(|op| op.details.clone()),
        Some(OperationDetails::DropDuplicates { removed: 1 })
    );

    let seq = session.current_dataset().unwrap().column("seq").unwrap();
    assert_eq!(seq.cells(), &[Cell::Number(20.0), Cell::Number(30.0)]);
}

#[test]
fn test_full_session_workflow() {
    let mut session = load_session("sales.csv");
    let original = session.current_dataset().unwrap().clone();

    session
        .apply(Operation::Impute {
            columns: vec!["price".to_string()],
            strategy: ImputeStrategy::Median,
        })
        .unwrap();
    session
        .apply(Operation::RemoveOutliers {
            column: "price".to_string(),
            method: OutlierMethod::Iqr,
            threshold: None,
        })
        .unwrap();
    session
        .apply(Operation::ConvertType {
            column: "id".to_string(),
            target: Role::Text,
            strict: true,
        })
        .unwrap();
    assert_eq!(session.state(), EngineState::Modified);

    let summary = session.history_summary().unwrap();
    let kinds: Vec<Option<OperationKind>> = summary.entries.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            None,
            Some(OperationKind::Impute),
            Some(OperationKind::RemoveOutliers),
            Some(OperationKind::ConvertType),
        ]
    );
    assert_eq!(summary.entries[2].row_delta, -1);

    let dataset = session.current_dataset().unwrap();
    assert_eq!(dataset.row_count(), 5);
    assert_eq!(dataset.column("price").unwrap().missing_count(), 0);
    assert_eq!(dataset.column("id").unwrap().role(), Role::Text);

    let text = history_report_text(&summary, "sales.csv");
    assert!(text.contains("Step 2: remove_outliers"));

    session.undo().unwrap();
    session.undo().unwrap();
    session.undo().unwrap();
    assert_eq!(session.current_dataset().unwrap(), &original);
    assert_eq!(session.state(), EngineState::Ready);

    session.redo().unwrap();
    assert_eq!(session.history_summary().unwrap().len(), 2);
}

#[test]
fn test_apply_after_undo_loses_redo() {
    let mut session = load_session("sales.csv");
    session.apply(Operation::DeleteRows { rows: vec![0] }).unwrap();
    session.apply(Operation::DeleteRows { rows: vec![0] }).unwrap();
    session.undo().unwrap();

    session
        .apply(Operation::DropDuplicates {
            subset: None,
            keep: KeepPolicy::First,
        })
        .unwrap();
    assert!(matches!(session.redo(), Err(PrepError::NothingToRedo)));
    assert_eq!(session.history_summary().unwrap().len(), 3);
}

#[test]
fn test_strict_conversion_reports_failures() {
    let mut session = load_session("sales.csv");
    let before = session.history_summary().unwrap();

    let err = session
        .apply(Operation::ConvertType {
            column: "region".to_string(),
            target: Role::Numeric,
            strict: true,
        })
        .unwrap_err();
    assert!(matches!(err, PrepError::ConversionError { failed: 6, .. }));
    assert_eq!(session.history_summary().unwrap(), before);

    let entry = session
        .apply(Operation::ConvertType {
            column: "region".to_string(),
            target: Role::Numeric,
            strict: false,
        })
        .unwrap();
    assert!(entry.summary.contains("6 cell(s) could not be converted"));
    assert_eq!(
        session
            .current_dataset()
            .unwrap()
            .column("region")
            .unwrap()
            .missing_count(),
        6
    );
}

#[test]
fn test_preview_leaves_history_alone() {
    let session = load_session("sales.csv");
    let preview = session
        .preview(&Operation::Impute {
            columns: vec!["price".to_string(), "date".to_string()],
            strategy: ImputeStrategy::DeleteRows,
        })
        .unwrap();
    assert_eq!(preview.dataset.row_count(), 4);
    assert_eq!(preview.comparison.rows_removed, 2);
    assert_eq!(session.history_summary().unwrap().len(), 1);
    assert_eq!(session.state(), EngineState::Ready);
}

#[test]
fn test_restore_original_leaves_one_entry() {
    let mut session = load_session("duplicates.csv");
    session
        .apply(Operation::DropDuplicates {
            subset: None,
            keep: KeepPolicy::First,
        })
        .unwrap();
    session.apply(Operation::DeleteRows { rows: vec![0] }).unwrap();

    session.restore_original().unwrap();
    assert_eq!(session.history_summary().unwrap().len(), 1);
    assert_eq!(session.current_dataset().unwrap().row_count(), 3);
}

#[test]
fn test_delete_rows_out_of_range() {
    let mut session = load_session("duplicates.csv");
    let err = session
        .apply(Operation::DeleteRows { rows: vec![3] })
        .unwrap_err();
    assert!(matches!(err, PrepError::RowOutOfRange { row: 3, rows: 3 }));
}

#[test]
fn test_operations_from_json() {
    let json = r#"[
        {"kind": "impute", "columns": ["price"], "strategy": {"method": "constant", "value": "0"}},
        {"kind": "drop_duplicates", "subset": ["region"], "keep": "first"}
    ]"#;
    let operations: Vec<Operation> = serde_json::from_str(json).unwrap();

    let mut session = load_session("sales.csv");
    for operation in operations {
        session.apply(operation).unwrap();
    }
    assert_eq!(session.current_dataset().unwrap().row_count(), 2);
}

// ============================================================================
// Export and configuration files
// ============================================================================

#[test]
fn test_export_csv_round_trips_through_ingest() {
    let session = load_session("sales.csv");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");

    write_csv_file(session.current_dataset().unwrap(), &path).unwrap();

    let reloaded = Session::ingest(
        &std::fs::read(&path).unwrap(),
        Some("out.csv"),
        EngineConfig::default(),
    )
    .unwrap();
    assert_eq!(
        reloaded.current_dataset().unwrap(),
        session.current_dataset().unwrap()
    );
}

#[test]
fn test_yaml_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "timeout_seconds: 30\ncategorical_threshold: 3\noutlier:\n  iqr_k: 3.0"
    )
    .unwrap();

    let config = EngineConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.timeout_seconds, 30);
    assert_eq!(config.categorical_threshold, 3);
    assert_eq!(config.outlier.iqr_k, 3.0);
    assert_eq!(config.outlier.zscore_threshold, 3.0);
    assert_eq!(config.sample_rows, 100);
}

#[test]
fn test_yaml_config_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::from_yaml_file(dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
fn test_config_rejects_non_positive_thresholds() {
    let result = EngineConfig::builder().timeout_seconds(0).build();
    assert!(result.is_err());

    let mut config = EngineConfig::default();
    config.outlier.zscore_threshold = -1.0;
    assert!(config.validate().is_err());
}

// ============================================================================
// Properties
// ============================================================================

fn value_strategy() -> impl Strategy<Value = Option<f64>> {
    prop_oneof![
        1 => Just(None),
        4 => (-1000.0..1000.0f64).prop_map(Some),
    ]
}

fn dataset_strategy() -> impl Strategy<Value = Dataset> {
    (1usize..40)
        .prop_flat_map(|rows| {
            (
                proptest::collection::vec(value_strategy(), rows),
                proptest::collection::vec(0u8..3, rows),
            )
        })
        .prop_map(|(values, tags)| {
            Dataset::new(vec![
                numeric_column("v", &values),
                Column::new(
                    "tag",
                    Role::Categorical,
                    tags.iter().map(|t| Cell::text(format!("t{t}"))).collect(),
                ),
            ])
            .expect("columns share the row count")
        })
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        Just(Operation::Impute {
            columns: vec!["v".to_string()],
            strategy: ImputeStrategy::Mean,
        }),
        Just(Operation::Impute {
            columns: vec!["v".to_string()],
            strategy: ImputeStrategy::ForwardFill,
        }),
        Just(Operation::Impute {
            columns: vec!["v".to_string(), "tag".to_string()],
            strategy: ImputeStrategy::DeleteRows,
        }),
        Just(Operation::RemoveOutliers {
            column: "v".to_string(),
            method: OutlierMethod::ZScore,
            threshold: Some(1.0),
        }),
        Just(Operation::ConvertType {
            column: "v".to_string(),
            target: Role::Text,
            strict: false,
        }),
        prop_oneof![Just(KeepPolicy::First), Just(KeepPolicy::Last)].prop_map(|keep| {
            Operation::DropDuplicates {
                subset: Some(vec!["tag".to_string()]),
                keep,
            }
        }),
        (0usize..5).prop_map(|row| Operation::DeleteRows { rows: vec![row] }),
    ]
}

#[derive(Debug, Clone)]
enum Action {
    Apply(Operation),
    Undo,
    Redo,
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => operation_strategy().prop_map(Action::Apply),
        1 => Just(Action::Undo),
        1 => Just(Action::Redo),
    ]
}

proptest! {
    #[test]
    fn prop_undo_after_apply_restores_dataset(
        dataset in dataset_strategy(),
        operation in operation_strategy(),
    ) {
        let mut engine = TransformationEngine::new(EngineConfig::default());
        engine.load(dataset.clone());

        if engine.apply(operation).is_ok() {
            let restored = engine.undo().unwrap();
            prop_assert_eq!(restored, &dataset);
        } else {
            prop_assert_eq!(engine.current_dataset().unwrap(), &dataset);
            prop_assert_eq!(engine.state(), EngineState::Ready);
        }
    }

    #[test]
    fn prop_summary_length_tracks_cursor(
        dataset in dataset_strategy(),
        actions in proptest::collection::vec(action_strategy(), 1..20),
    ) {
        let mut engine = TransformationEngine::new(EngineConfig::default());
        engine.load(dataset);

        for action in actions {
            match action {
                Action::Apply(op) => { let _ = engine.apply(op); }
                Action::Undo => { let _ = engine.undo(); }
                Action::Redo => { let _ = engine.redo(); }
            }
            let history = engine.history().unwrap();
            prop_assert_eq!(engine.history_summary().unwrap().len(), history.cursor() + 1);
        }
    }
}
