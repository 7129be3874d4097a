//! CLI entry point for the preprocessing engine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use eda_prep::engine::OperationBudget;
use eda_prep::reporting::{history_report_text, write_csv_file};
use eda_prep::{
    ColumnStatistics, DatasetComparison, EngineConfig, Operation, OutlierDetector, OutlierMethod,
    Session,
};
use tracing::{info, warn};

/// CLI-compatible outlier method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutlierMethod {
    /// Interquartile range fences
    Iqr,
    /// Distance from the mean in standard deviations
    Zscore,
    /// Robust score based on the median absolute deviation
    ModifiedZscore,
}

impl From<CliOutlierMethod> for OutlierMethod {
    fn from(cli: CliOutlierMethod) -> Self {
        match cli {
            CliOutlierMethod::Iqr => OutlierMethod::Iqr,
            CliOutlierMethod::Zscore => OutlierMethod::ZScore,
            CliOutlierMethod::ModifiedZscore => OutlierMethod::ModifiedZScore,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Interactive preprocessing engine for tabular datasets",
    long_about = "Ingest CSV/TSV or spreadsheet files, inspect them, and replay\n\
                  preprocessing operations with a recorded history.\n\n\
                  EXAMPLES:\n  \
                  # Column overview and missing values\n  \
                  eda-prep inspect data.csv\n\n  \
                  # Flag outliers in one column\n  \
                  eda-prep outliers data.csv --column price --method iqr\n\n  \
                  # Apply a JSON list of operations and save the result\n  \
                  eda-prep run data.csv --ops ops.json -o cleaned.csv --history history.txt"
)]
struct Args {
    /// YAML settings file; defaults are used when it does not exist
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Print machine-readable JSON instead of tables; disables logging
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show inferred roles, column statistics and missing values
    Inspect {
        /// Input file (.csv, .tsv, .txt, .xlsx, .xls, .ods)
        input: PathBuf,
    },
    /// Detect outliers in a numeric column
    Outliers {
        input: PathBuf,

        #[arg(long)]
        column: String,

        #[arg(long, value_enum, default_value = "iqr")]
        method: CliOutlierMethod,

        /// Overrides the configured threshold for the method
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Apply a JSON array of operations in order
    Run {
        input: PathBuf,

        /// JSON file with an array of operations
        #[arg(long)]
        ops: PathBuf,

        /// Write the resulting dataset as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a plain-text history log
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, json_output: bool) {
    // stdout must carry only JSON in that mode
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.json);

    let config = match &args.config {
        Some(path) => EngineConfig::from_yaml_file(path)?,
        None => EngineConfig::default(),
    };

    match &args.command {
        Command::Inspect { input } => inspect(&args, input, config),
        Command::Outliers {
            input,
            column,
            method,
            threshold,
        } => outliers(&args, input, config, column, (*method).into(), *threshold),
        Command::Run {
            input,
            ops,
            output,
            history,
        } => run(&args, input, config, ops, output.as_deref(), history.as_deref()),
    }
}

fn open_session(input: &Path, config: EngineConfig) -> Result<Session> {
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let file_name = input.file_name().and_then(|n| n.to_str());
    Ok(Session::ingest(&bytes, file_name, config)?)
}

/// Note: this uses `println!` for user-facing output that must be visible
/// regardless of the log level.
fn inspect(args: &Args, input: &Path, config: EngineConfig) -> Result<()> {
    let session = open_session(input, config)?;
    let dataset = session.current_dataset()?;
    let columns = ColumnStatistics::all_columns(dataset);
    let missing = ColumnStatistics::missing_report(dataset);
    let summary = ColumnStatistics::summary(dataset)?;

    if args.json {
        let report = serde_json::json!({
            "source": session.source_format(),
            "summary": summary,
            "columns": columns,
            "missing": missing,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!("DATASET OVERVIEW");
    println!("{}", "=".repeat(80));
    println!("  File: {}", input.display());
    println!("  Source: {:?}", session.source_format());
    println!("  Rows: {}", summary.rows);
    println!("  Columns: {}", summary.columns);
    println!("  Missing cells: {}", summary.total_missing);
    println!("  Duplicate rows: {}", summary.duplicate_rows);
    println!();

    println!(
        "{:<20} {:<12} {:<10} {:<10} {:<12} {:<12}",
        "Column", "Role", "Missing", "Unique", "Mean", "Std"
    );
    println!("{}", "-".repeat(80));
    for info in &columns {
        let (mean, std) = match &info.numeric {
            Some(n) => (
                format!("{:.4}", n.mean),
                n.std.map(|s| format!("{s:.4}")).unwrap_or_else(|| "-".to_string()),
            ),
            None => ("-".to_string(), "-".to_string()),
        };
        println!(
            "{:<20} {:<12} {:<10} {:<10} {:<12} {:<12}",
            truncate_str(&info.name, 19),
            info.role.as_str(),
            info.missing_count,
            info.unique_count,
            mean,
            std
        );
    }

    if !missing.is_empty() {
        println!("\nMISSING VALUES");
        println!("{}", "-".repeat(40));
        for report in &missing {
            println!(
                "  {:<20} {:>6} ({:.1}%)",
                truncate_str(&report.column, 19),
                report.count,
                report.percentage
            );
        }
    }
    Ok(())
}

fn outliers(
    args: &Args,
    input: &Path,
    config: EngineConfig,
    column: &str,
    method: OutlierMethod,
    threshold: Option<f64>,
) -> Result<()> {
    let session = open_session(input, config)?;
    let report = OutlierDetector::detect(
        session.current_dataset()?,
        column,
        method,
        threshold,
        &session.config().outlier,
        &OperationBudget::new(session.config().timeout(), session.engine().cancellation_token()),
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} outlier(s) in '{}' by {} (threshold {}): {:.2}% of values",
        report.outlier_count, report.column, report.method, report.threshold, report.outlier_percentage
    );
    match report.bounds {
        Some(b) => println!("  Bounds: [{:.4}, {:.4}]", b.lower, b.upper),
        None => println!("  No spread; nothing flagged"),
    }
    let rows = report.outlier_rows();
    if !rows.is_empty() {
        println!("  Rows: {:?}", rows);
    }
    Ok(())
}

fn run(
    args: &Args,
    input: &Path,
    config: EngineConfig,
    ops_path: &Path,
    output: Option<&Path>,
    history_path: Option<&Path>,
) -> Result<()> {
    let ops_text = std::fs::read_to_string(ops_path)
        .with_context(|| format!("reading operations from {}", ops_path.display()))?;
    let operations: Vec<Operation> =
        serde_json::from_str(&ops_text).context("parsing operations JSON")?;

    let mut session = open_session(input, config)?;
    for (i, operation) in operations.into_iter().enumerate() {
        let entry = session
            .apply(operation)
            .with_context(|| format!("operation {} failed", i + 1))?;
        info!("Step {}: {}", i + 1, entry.summary);
    }

    let summary = session.history_summary()?;
    let dataset = session.current_dataset()?;

    if let Some(path) = output {
        write_csv_file(dataset, path)?;
    }
    if let Some(path) = history_path {
        let file_name = session.file_name().unwrap_or("dataset");
        std::fs::write(path, history_report_text(&summary, file_name))
            .with_context(|| format!("writing {}", path.display()))?;
        info!("History saved: {}", path.display());
    }

    let comparison = DatasetComparison::between(session.original_dataset()?, dataset);
    if args.json {
        let report = serde_json::json!({
            "history": summary,
            "comparison": comparison,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if output.is_none() {
        warn!("No --output given; the result was not saved");
    }
    print!("{}", history_report_text(&summary, session.file_name().unwrap_or("dataset")));
    println!(
        "Shape: {:?} -> {:?}, {} row(s) removed",
        comparison.shape_before, comparison.shape_after, comparison.rows_removed
    );
    Ok(())
}

/// Truncate a string to a maximum length, adding ellipsis if needed.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
