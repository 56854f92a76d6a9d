//! AutoGrade CLI - run one submission under the bounded execution engine
//!
//! Exit status: 0 when the invocation completed, 1 for a behavioral outcome
//! (fault, timeout, exit attempt, exhausted input, cancellation), 2 for a
//! structural error that needs manual review.

use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info, warn};

mod args;
mod config;
mod logging;
mod platform;

use crate::config::LogConfig;
use crate::logging::LogFormat;
use crate::platform::print_report_with_source;
use autograde_api::{
    CaptureMode, GraderConfig, GradingError, GradingSession, InvocationOutcome, InvocationReport, SourceUnit,
    Ty, Value,
};

const EXIT_COMPLETED: i32 = 0;
const EXIT_BEHAVIORAL: i32 = 1;
const EXIT_STRUCTURAL: i32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "autograde",
    about = "Compile a submitted unit and run it under a deadline with captured I/O",
    version
)]
struct Cli {
    /// Submitted source file
    #[arg(value_name = "SOURCE")]
    source: PathBuf,

    /// Entry type name, if it cannot be inferred from a public class
    #[arg(long, value_name = "NAME")]
    entry: Option<String>,

    /// Method to call instead of main(String[])
    #[arg(long, value_name = "NAME")]
    method: Option<String>,

    /// Method argument as TYPE:VALUE (repeatable)
    #[arg(long = "arg", value_name = "TYPE:VALUE", value_parser = args::parse_value)]
    args: Vec<Value>,

    /// Constructor argument as TYPE:VALUE; constructs an instance first (repeatable)
    #[arg(long = "ctor-arg", value_name = "TYPE:VALUE", value_parser = args::parse_value)]
    ctor_args: Vec<Value>,

    /// Construct an instance even without constructor arguments
    #[arg(long)]
    instance: bool,

    /// Return type the method must have
    #[arg(long, value_name = "TYPE", value_parser = args::parse_type)]
    expect: Option<Ty>,

    /// Standard input line (repeatable)
    #[arg(long = "input", value_name = "LINE")]
    input: Vec<String>,

    /// File whose lines are appended to the standard input
    #[arg(long, value_name = "PATH")]
    input_file: Option<PathBuf>,

    /// Deadline in milliseconds; 0 disables it
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Stream output as it is written instead of replaying it at the end
    #[arg(long)]
    live: bool,

    /// Header printed in front of the program output
    #[arg(long, value_name = "TEXT")]
    header: Option<String>,

    /// Harness configuration (JSON)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop after compiling
    #[arg(long)]
    compile_only: bool,

    #[arg(long, value_enum, default_value = "text")]
    report: ReportFormat,

    /// Global level with optional per-phase overrides, e.g. `info,engine=debug`
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: LogConfig,

    #[arg(long, value_enum, default_value = "compact")]
    log_format: LogFormat,
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.log_format);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("error: {message}");
            process::exit(EXIT_STRUCTURAL);
        }
    };
    let mut input = cli.input.clone();
    if let Some(path) = &cli.input_file {
        match std::fs::read_to_string(path) {
            Ok(text) => input.extend(text.lines().map(str::to_string)),
            Err(e) => {
                eprintln!("error: cannot read input file '{}': {e}", path.display());
                process::exit(EXIT_STRUCTURAL);
            }
        }
    }

    let session = GradingSession::new(config);
    let status = run(&cli, &session, input);
    let leftovers = session.clean_byproducts();
    if !leftovers.is_empty() {
        warn!(target: "autograde::cli", count = leftovers.len(), "staging files left behind");
    }
    session.shutdown(status)
}

fn build_config(cli: &Cli) -> Result<GraderConfig, String> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read '{}': {e}", path.display()))?;
            GraderConfig::from_json_str(&text).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => GraderConfig::default(),
    };
    if let Some(ms) = cli.timeout_ms {
        config.engine.default_deadline_ms = (ms > 0).then_some(ms);
    }
    if cli.live {
        config.capture.mode = CaptureMode::Live;
    }
    if cli.header.is_some() {
        config.capture.header = cli.header.clone();
    }
    // the CLI always shows what the program printed
    config.capture.replay = true;
    debug!(target: "autograde::cli", ?config, "configuration");
    Ok(config)
}

fn run(cli: &Cli, session: &GradingSession, input: Vec<String>) -> i32 {
    let source_text = std::fs::read_to_string(&cli.source).unwrap_or_default();
    let compiled = read_unit(session, &cli.source, cli.entry.as_deref())
        .and_then(|unit| session.compile_source(unit));
    let unit = match compiled {
        Ok(unit) => unit,
        Err(err) => return structural(cli, &err, &source_text),
    };
    for warning in &unit.warnings {
        eprintln!("{warning}");
    }
    info!(target: "autograde::cli", entry = %unit.entry_qualified_name(), "compiled");
    if cli.compile_only {
        emit_compiled(cli, &unit.entry_name, unit.namespace(), unit.classes.len());
        return EXIT_COMPLETED;
    }

    let mut attempt = match session.attempt(&unit) {
        Ok(attempt) => attempt,
        Err(err) => return structural(cli, &err, &source_text),
    };
    attempt.with_input(input.clone());

    let result = match &cli.method {
        None => attempt.run_main(input),
        Some(method) => {
            let receiver = if cli.instance || !cli.ctor_args.is_empty() {
                match attempt.construct(cli.ctor_args.clone()) {
                    Ok(InvocationReport {
                        outcome: InvocationOutcome::Completed(instance),
                        ..
                    }) => Some(instance),
                    Ok(report) => return behavioral(cli, &report, &source_text),
                    Err(err) => return structural(cli, &err, &source_text),
                }
            } else {
                None
            };
            attempt.call(receiver, method, cli.args.clone(), cli.expect.clone())
        }
    };

    match result {
        Ok(report) if report.outcome.is_completed() => {
            emit_completed(cli, &report);
            EXIT_COMPLETED
        }
        Ok(report) => behavioral(cli, &report, &source_text),
        Err(err) => structural(cli, &err, &source_text),
    }
}

fn read_unit(
    session: &GradingSession,
    path: &Path,
    entry: Option<&str>,
) -> Result<SourceUnit, GradingError> {
    let unit = session.read_source(path)?;
    Ok(match entry {
        Some(name) => unit.with_entry(name),
        None => unit,
    })
}

fn structural(cli: &Cli, err: &GradingError, source: &str) -> i32 {
    let report = err.to_report();
    match cli.report {
        ReportFormat::Text => print_report_with_source(&report, source),
        ReportFormat::Json => print_json(serde_json::json!({
            "status": "structural",
            "report": report,
        })),
    }
    EXIT_STRUCTURAL
}

fn behavioral(cli: &Cli, report: &InvocationReport, source: &str) -> i32 {
    let error = report.outcome.to_report();
    match cli.report {
        ReportFormat::Text => {
            if let Some(error) = &error {
                print_report_with_source(error, source);
            }
            if report.capture.incomplete {
                eprintln!("note: output may be incomplete");
            }
        }
        ReportFormat::Json => print_json(serde_json::json!({
            "status": "behavioral",
            "outcome": report.outcome.kind(),
            "output": report.capture.output,
            "truncated": report.capture.truncated,
            "elapsed_ms": report.elapsed.as_millis() as u64,
            "report": error,
        })),
    }
    EXIT_BEHAVIORAL
}

fn emit_completed(cli: &Cli, report: &InvocationReport) {
    let value = report.value().filter(|v| **v != Value::Void).map(Value::display);
    match cli.report {
        ReportFormat::Text => {
            if let Some(value) = value {
                println!("=> {value}");
            }
        }
        ReportFormat::Json => print_json(serde_json::json!({
            "status": "completed",
            "value": value,
            "output": report.capture.output,
            "truncated": report.capture.truncated,
            "elapsed_ms": report.elapsed.as_millis() as u64,
        })),
    }
}

fn emit_compiled(cli: &Cli, entry: &str, namespace: &str, classes: usize) {
    match cli.report {
        ReportFormat::Text => println!("compiled {entry} into {namespace} ({classes} classes)"),
        ReportFormat::Json => print_json(serde_json::json!({
            "status": "compiled",
            "entry": entry,
            "namespace": namespace,
            "classes": classes,
        })),
    }
}

fn print_json(value: serde_json::Value) {
    match serde_json::to_string_pretty(&value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("error: cannot serialize report: {e}"),
    }
}
