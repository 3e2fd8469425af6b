//! Insight CLI - Command-line interface for Enrolment Insight
//!
//! Commands:
//! - validate: Check input rows against the enrolment schema
//! - analyze: Descriptive, temporal and geographic report
//! - detect: Anomaly report (z-score, rolling, pincode volume)
//! - schema: Print the required input columns

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use enrolment_insight::schema::{parse_date_str, DATE_FORMATS};
use enrolment_insight::{
    filter, load, AnalysisConfig, AnalysisEngine, AnalysisError, FilterSpec, RawTable, RecordValidator,
    ENGINE_VERSION, REQUIRED_COLUMNS,
};

/// Insight - explainable statistics and anomaly detection for enrolment records
#[derive(Parser)]
#[command(name = "insight")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Analyse daily enrolment records and explain anomalies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check input rows against the enrolment schema
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Descriptive, temporal and geographic report
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Analysis configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Anomaly report over the daily series
    Detect {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        filter: FilterArgs,

        /// Analysis configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the detector threshold
        #[arg(long)]
        threshold: Option<f64>,

        /// Override the rolling window in days
        #[arg(long)]
        window: Option<usize>,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Print the required input columns
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Input format
    #[arg(long, default_value = "json")]
    input_format: InputFormat,
}

#[derive(Args)]
struct FilterArgs {
    /// First date to include
    #[arg(long)]
    start: Option<String>,

    /// Last date to include
    #[arg(long)]
    end: Option<String>,

    /// Pincodes to include (repeatable)
    #[arg(long = "pincode")]
    pincodes: Vec<u32>,
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of row objects
    Json,
    /// Newline-delimited JSON (one row object per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), InsightCliError> {
    match cli.command {
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Analyze {
            input,
            filter,
            config,
            output_format,
        } => {
            let config = load_config(config.as_deref())?;
            cmd_analyze(&input, &filter, config, &output_format)
        }
        Commands::Detect {
            input,
            filter,
            config,
            threshold,
            window,
            output_format,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(threshold) = threshold {
                config.detector.threshold = threshold;
            }
            if let Some(window) = window {
                config.detector.window = window;
            }
            cmd_detect(&input, &filter, config, &output_format)
        }
        Commands::Schema { json } => cmd_schema(json),
    }
}

fn read_table(input: &InputArgs) -> Result<RawTable, InsightCliError> {
    let data = if input.input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(&input.input)?
    };

    let table = match input.input_format {
        InputFormat::Json => RawTable::from_json_rows(&data)?,
        InputFormat::Ndjson => RawTable::from_ndjson(&data)?,
    };
    if table.is_empty() {
        return Err(InsightCliError::NoRows);
    }

    info!(rows = table.len(), columns = table.columns().len(), "input read");
    Ok(table)
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, InsightCliError> {
    match path {
        Some(path) => Ok(AnalysisConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(AnalysisConfig::default()),
    }
}

fn filter_spec(args: &FilterArgs) -> Result<FilterSpec, InsightCliError> {
    let mut spec = FilterSpec::new();
    if let Some(start) = &args.start {
        spec = spec.with_start_date(parse_cli_date("start", start)?);
    }
    if let Some(end) = &args.end {
        spec = spec.with_end_date(parse_cli_date("end", end)?);
    }
    if !args.pincodes.is_empty() {
        spec = spec.with_pincodes(args.pincodes.iter().copied());
    }
    Ok(spec)
}

fn parse_cli_date(flag: &str, value: &str) -> Result<chrono::NaiveDate, InsightCliError> {
    parse_date_str(value).ok_or_else(|| InsightCliError::BadDate(format!("--{flag} '{value}'")))
}

#[derive(Serialize)]
struct ValidationReport {
    total_rows: usize,
    valid_rows: usize,
    invalid_rows: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    row: usize,
    column: String,
    error: String,
}

fn cmd_validate(input: &InputArgs, json: bool) -> Result<(), InsightCliError> {
    let table = read_table(input)?;
    let issues = RecordValidator::validate_rows(&table)?;

    let mut invalid: Vec<usize> = issues.iter().map(|i| i.row).collect();
    invalid.dedup();

    let report = ValidationReport {
        total_rows: table.len(),
        valid_rows: table.len() - invalid.len(),
        invalid_rows: invalid.len(),
        errors: issues
            .into_iter()
            .map(|i| ValidationErrorDetail {
                row: i.row,
                column: i.column,
                error: i.reason,
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:   {}", report.total_rows);
        println!("Valid rows:   {}", report.valid_rows);
        println!("Invalid rows: {}", report.invalid_rows);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Row {}, column '{}': {}", err.row, err.column, err.error);
            }
        }
    }

    if report.invalid_rows > 0 {
        Err(InsightCliError::ValidationFailed(report.invalid_rows))
    } else {
        Ok(())
    }
}

fn cmd_analyze(
    input: &InputArgs,
    filter_args: &FilterArgs,
    config: AnalysisConfig,
    output_format: &OutputFormat,
) -> Result<(), InsightCliError> {
    let dataset = load(&read_table(input)?)?;
    let view = filter(&dataset, &filter_spec(filter_args)?)?;
    let report = AnalysisEngine::new(config)?.analyze(&view)?;
    println!("{}", format_output(&report, output_format)?);
    Ok(())
}

fn cmd_detect(
    input: &InputArgs,
    filter_args: &FilterArgs,
    config: AnalysisConfig,
    output_format: &OutputFormat,
) -> Result<(), InsightCliError> {
    let dataset = load(&read_table(input)?)?;
    let view = filter(&dataset, &filter_spec(filter_args)?)?;
    let report = AnalysisEngine::new(config)?.detect(&view)?;
    println!("{}", format_output(&report, output_format)?);
    Ok(())
}

fn cmd_schema(json: bool) -> Result<(), InsightCliError> {
    if json {
        let schema = serde_json::json!({
            "required_columns": REQUIRED_COLUMNS,
            "date_formats": DATE_FORMATS,
            "count_columns": ["age_0_5", "age_5_17", "age_18_greater"],
        });
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else {
        println!("Required columns (case-insensitive, surrounding whitespace ignored):");
        for column in REQUIRED_COLUMNS {
            println!("  - {column}");
        }
        println!("\nAccepted date formats: {}", DATE_FORMATS.join(", "));
        println!("Age columns must be non-negative integers; pincode must be a positive integer.");
    }
    Ok(())
}

fn format_output<T: Serialize>(report: &T, format: &OutputFormat) -> Result<String, InsightCliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(report)?,
    })
}

// Error handling

enum InsightCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    NoRows,
    BadDate(String),
    ValidationFailed(usize),
}

impl From<io::Error> for InsightCliError {
    fn from(e: io::Error) -> Self {
        InsightCliError::Io(e)
    }
}

impl From<AnalysisError> for InsightCliError {
    fn from(e: AnalysisError) -> Self {
        InsightCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for InsightCliError {
    fn from(e: serde_json::Error) -> Self {
        InsightCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl From<InsightCliError> for CliError {
    fn from(e: InsightCliError) -> Self {
        match e {
            InsightCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            InsightCliError::Analysis(e) => {
                let hint = match &e {
                    AnalysisError::SchemaError { .. } | AnalysisError::ValidationError { .. } => {
                        Some("Run 'insight validate' for details".to_string())
                    }
                    AnalysisError::EmptyResult(_) => Some("Widen the date range or pincode filter".to_string()),
                    AnalysisError::InvalidParameter { .. } => Some("Check --threshold, --window and --config".to_string()),
                    _ => None,
                };
                CliError {
                    code: e.kind().to_uppercase(),
                    message: e.to_string(),
                    hint,
                }
            }
            InsightCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            InsightCliError::NoRows => CliError {
                code: "NO_ROWS".to_string(),
                message: "No rows found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            InsightCliError::BadDate(value) => CliError {
                code: "BAD_DATE".to_string(),
                message: format!("Unrecognised date {value}"),
                hint: Some(format!("Use one of: {}", DATE_FORMATS.join(", "))),
            },
            InsightCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{count} rows failed validation"),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}
