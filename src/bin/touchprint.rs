//! touchprint - Command-line interface for Synheart Touch
//!
//! Commands:
//! - replay: Replay recorded touch samples through a session
//! - summary: Aggregate a measurement snapshot
//! - validate: Validate touch sample schema
//! - doctor: Diagnose configuration and environment
//! - schema: Print schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use synheart_touch::measurements::MeasurementLog;
use synheart_touch::replay::{SampleParser, TouchSample, SAMPLE_SCHEMA_VERSION};
use synheart_touch::stats::AggregateTables;
use synheart_touch::types::{MeasurementKind, SnapshotRecord};
use synheart_touch::{Session, SessionConfig, TouchError, PRODUCER_NAME, TOUCH_VERSION};

/// touchprint - Behavioral touch measurements from recorded touch streams
#[derive(Parser)]
#[command(name = "touchprint")]
#[command(author = "Synheart AI Inc")]
#[command(version = TOUCH_VERSION)]
#[command(about = "Replay touch streams into behavioral measurements", long_about = None)]
struct Cli {
    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded touch samples through a session
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// What to write: the measurement snapshot or the session report
        #[arg(long, default_value = "snapshot")]
        emit: Emit,

        /// Session configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the short-stroke threshold (points)
        #[arg(long)]
        short_stroke_threshold: Option<f64>,

        /// Override the enrolment window (seconds)
        #[arg(long)]
        enrolment_window_secs: Option<u64>,

        /// Save aggregate tables to file after replay
        #[arg(long)]
        save_tables: Option<PathBuf>,
    },

    /// Aggregate a measurement snapshot
    Summary {
        /// Snapshot file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Snapshot format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Merge previously saved aggregate tables
        #[arg(long)]
        load_tables: Option<PathBuf>,
    },

    /// Validate touch sample schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a session configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum Emit {
    /// Ordered measurement records
    Snapshot,
    /// Session report with aggregates
    Report,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (touch.sample.v1)
    Input,
    /// Output schema (measurement snapshot record)
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

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

/// Logs go to stderr so stdout stays machine-readable
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), TouchCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            emit,
            config,
            short_stroke_threshold,
            enrolment_window_secs,
            save_tables,
        } => {
            let config = load_config(config.as_deref(), short_stroke_threshold, enrolment_window_secs)?;
            cmd_replay(
                &input,
                &output,
                input_format,
                output_format,
                emit,
                config,
                save_tables.as_deref(),
            )
        }

        Commands::Summary {
            input,
            input_format,
            load_tables,
        } => cmd_summary(&input, input_format, load_tables.as_deref()),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Schema { schema_type, json_schema } => cmd_schema(schema_type, json_schema),
    }
}

fn load_config(
    path: Option<&Path>,
    short_stroke_threshold: Option<f64>,
    enrolment_window_secs: Option<u64>,
) -> Result<SessionConfig, TouchCliError> {
    let mut config = match path {
        Some(path) => SessionConfig::from_json(&fs::read_to_string(path)?)?,
        None => SessionConfig::default(),
    };

    if let Some(threshold) = short_stroke_threshold {
        config.tracker.short_stroke_threshold = threshold;
    }
    if let Some(secs) = enrolment_window_secs {
        config.enrolment_window_secs = secs;
    }

    config.validate()?;
    Ok(config)
}

fn read_input(input: &Path) -> Result<String, TouchCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_samples(data: &str, format: &InputFormat) -> Result<Vec<TouchSample>, TouchCliError> {
    let samples = match format {
        InputFormat::Ndjson => SampleParser::parse_ndjson(data)?,
        InputFormat::Json => SampleParser::parse_array(data)?,
    };
    Ok(samples)
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    emit: Emit,
    config: SessionConfig,
    save_tables: Option<&Path>,
) -> Result<(), TouchCliError> {
    let input_data = read_input(input)?;
    let samples = parse_samples(&input_data, &input_format)?;

    let Some(first) = samples.first() else {
        return Err(TouchCliError::NoSamples);
    };

    let mut session = Session::new(config, first.timestamp)?;
    let mut failures = 0usize;

    for sample in &samples {
        let outcome = session.handle_sample(sample)?;
        if let Some(failure) = outcome.failure {
            failures += 1;
            warn!(touch = sample.touch_id, %failure, "gesture failed");
        }
    }

    let log = session.log();
    info!(
        session = %session.id(),
        samples = samples.len(),
        measurements = log.len(),
        dropped = session.dropped_count(),
        failures,
        "replay finished"
    );

    if let Some(path) = save_tables {
        fs::write(path, log.tables().to_json()?)?;
    }

    let output_data = match emit {
        Emit::Snapshot => format_records(&log.snapshot(), &output_format)?,
        Emit::Report => {
            let mut report = session.report();
            report.summary = report.summary.with_units();
            format_value(&report, &output_format)?
        }
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_summary(
    input: &Path,
    input_format: InputFormat,
    load_tables: Option<&Path>,
) -> Result<(), TouchCliError> {
    let input_data = read_input(input)?;

    let records: Vec<SnapshotRecord> = match input_format {
        InputFormat::Json => MeasurementLog::parse_snapshot(&input_data)?,
        InputFormat::Ndjson => input_data
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line.trim()))
            .collect::<Result<_, _>>()?,
    };

    let log = MeasurementLog::from_snapshot(&records)?;
    let mut tables = match load_tables {
        Some(path) => AggregateTables::from_json(&fs::read_to_string(path)?)?,
        None => AggregateTables::new(),
    };
    for measurement in log.measurements() {
        tables.record(measurement.kind(), &measurement.value());
    }

    println!("{}", serde_json::to_string_pretty(&tables.summary().with_units())?);
    Ok(())
}

fn validation_report(samples: &[TouchSample]) -> ValidationReport {
    let errors: Vec<ValidationErrorDetail> = samples
        .iter()
        .enumerate()
        .filter_map(|(index, sample)| {
            sample.validate().err().map(|e| ValidationErrorDetail {
                index,
                touch_id: sample.touch_id,
                error: e.to_string(),
            })
        })
        .collect();

    ValidationReport {
        total_samples: samples.len(),
        valid_samples: samples.len() - errors.len(),
        invalid_samples: errors.len(),
        errors,
    }
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), TouchCliError> {
    let input_data = read_input(input)?;
    let samples = parse_samples(&input_data, &input_format)?;
    let report = validation_report(&samples);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total samples:   {}", report.total_samples);
        println!("Valid samples:   {}", report.valid_samples);
        println!("Invalid samples: {}", report.invalid_samples);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Touch {} (index {}): {}", err.touch_id, err.index, err.error);
            }
        }
    }

    if report.invalid_samples > 0 {
        Err(TouchCliError::ValidationFailed(report.invalid_samples))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), TouchCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "touch_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Synheart Touch version {}", TOUCH_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SAMPLE_SCHEMA_VERSION),
    });

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match SessionConfig::from_json(&content) {
                    Ok(cfg) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (enrolment window {}s, short stroke < {} pt)",
                            cfg.enrolment_window_secs, cfg.tracker.short_stroke_threshold
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (replay from stdin ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: TOUCH_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("touchprint Doctor Report");
        println!("========================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(TouchCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), TouchCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input Schema: {}", SAMPLE_SCHEMA_VERSION);
                println!();
                println!("One record per touch phase:");
                println!();
                println!("- phase: begin | move | end | cancel");
                println!("- touch_id: contact identifier");
                println!("- x, y: location in points (optional for cancel)");
                println!("- force, max_force: pressure and hardware maximum (optional)");
                println!("- major_radius: contact radius in points (optional)");
                println!("- uptime_ms: monotonic event time");
                println!("- timestamp: wall-clock event time (RFC 3339)");
                println!("- touch_count: simultaneous touches reported (default 1)");
                println!("- target: {{ x, y, width, height }} of the touched element (optional)");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output Schema: measurement snapshot record");
                println!();
                println!("- kind: measurement kind name");
                println!("- value: decimal number or category label");
                println!("- timestamp: RFC 3339 with nanoseconds");
                println!();
                println!("Kinds:");
                for kind in MeasurementKind::ALL {
                    match kind.unit() {
                        Some(unit) => println!("  - {} ({})", kind, unit),
                        None => println!("  - {}", kind),
                    }
                }
            }
        }
    }

    Ok(())
}

// Helper functions

fn format_records(records: &[SnapshotRecord], format: &OutputFormat) -> Result<String, TouchCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
    }
}

fn format_value<T: serde::Serialize>(value: &T, format: &OutputFormat) -> Result<String, TouchCliError> {
    match format {
        OutputFormat::Ndjson | OutputFormat::Json => Ok(serde_json::to_string(value)? + "\n"),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)? + "\n"),
    }
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/touch.sample.v1.json",
        "title": "touch.sample.v1",
        "description": "Synheart recorded touch sample schema",
        "type": "object",
        "required": ["phase", "touch_id", "uptime_ms", "timestamp"],
        "properties": {
            "phase": {
                "type": "string",
                "enum": ["begin", "move", "end", "cancel"]
            },
            "touch_id": { "type": "integer", "minimum": 0 },
            "x": { "type": "number" },
            "y": { "type": "number" },
            "force": { "type": "number", "minimum": 0 },
            "max_force": { "type": "number", "minimum": 0 },
            "major_radius": { "type": "number", "minimum": 0 },
            "uptime_ms": { "type": "number", "minimum": 0 },
            "timestamp": { "type": "string", "format": "date-time" },
            "touch_count": { "type": "integer", "minimum": 1 },
            "target": {
                "type": "object",
                "required": ["x", "y", "width", "height"],
                "properties": {
                    "x": { "type": "number" },
                    "y": { "type": "number" },
                    "width": { "type": "number", "minimum": 0 },
                    "height": { "type": "number", "minimum": 0 }
                }
            }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    let kinds: Vec<&str> = MeasurementKind::ALL.iter().map(|k| k.as_str()).collect();
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://synheart.ai/schemas/touch.snapshot.v1.json",
        "title": "touch.snapshot.v1",
        "description": "Synheart touch measurement snapshot",
        "type": "array",
        "items": {
            "type": "object",
            "required": ["kind", "value", "timestamp"],
            "properties": {
                "kind": { "type": "string", "enum": kinds },
                "value": { "type": "string" },
                "timestamp": { "type": "string", "format": "date-time" }
            }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum TouchCliError {
    Io(io::Error),
    Touch(TouchError),
    Json(serde_json::Error),
    NoSamples,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for TouchCliError {
    fn from(e: io::Error) -> Self {
        TouchCliError::Io(e)
    }
}

impl From<TouchError> for TouchCliError {
    fn from(e: TouchError) -> Self {
        TouchCliError::Touch(e)
    }
}

impl From<serde_json::Error> for TouchCliError {
    fn from(e: serde_json::Error) -> Self {
        TouchCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TouchCliError> for CliError {
    fn from(e: TouchCliError) -> Self {
        match e {
            TouchCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TouchCliError::Touch(TouchError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'touchprint doctor --config <file>' for details".to_string()),
            },
            TouchCliError::Touch(e @ TouchError::InvalidSample(_)) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'touchprint validate' for details".to_string()),
            },
            TouchCliError::Touch(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches {} schema", SAMPLE_SCHEMA_VERSION)),
            },
            TouchCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TouchCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No touch samples found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            TouchCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} samples failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            TouchCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_samples: usize,
    valid_samples: usize,
    invalid_samples: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    touch_id: u64,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
