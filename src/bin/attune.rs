//! Attune CLI - Command-line interface for attune-core
//!
//! Commands:
//! - transform: Process a recorded frame stream into events (batch mode)
//! - run: Process streaming frames from stdin (streaming mode)
//! - validate: Validate a frame stream against the input schema
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use attune_core::types::FrameSample;
use attune_core::{AnalyzerConfig, SessionAnalyzer, ENGINE_VERSION, PRODUCER_NAME};

/// Attune - fusion and calibration engine for face/pose biofeedback
#[derive(Parser)]
#[command(name = "attune")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Turn per-frame face/pose measurements into session events", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a recorded frame stream into events (batch mode)
    Transform {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Analyzer configuration overrides (JSON file)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the final continuous-signal snapshot to this file
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Process streaming frames from stdin (streaming mode)
    Run {
        /// Analyzer configuration overrides (JSON file)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit a snapshot record every N frames (0 = never)
        #[arg(long, default_value = "0")]
        snapshot_every: u64,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Validate a frame stream against the input schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration overrides file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one frame per line)
    Ndjson,
    /// JSON array of frames
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Core(attune_core::CoreError),
    Parse { line: usize, message: String },
    DoctorFailed,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Io(e) => write!(f, "io error: {e}"),
            CliError::Core(e) => write!(f, "{e}"),
            CliError::Parse { line, message } => {
                write!(f, "parse error on line {line}: {message}")
            }
            CliError::DoctorFailed => write!(f, "doctor found errors"),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<attune_core::CoreError> for CliError {
    fn from(e: attune_core::CoreError) -> Self {
        CliError::Core(e)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Transform {
            input,
            output,
            input_format,
            output_format,
            config,
            snapshot,
        } => cmd_transform(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            snapshot.as_deref(),
        ),
        Commands::Run {
            config,
            snapshot_every,
            flush,
        } => cmd_run(config.as_deref(), snapshot_every, flush),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig, CliError> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            Ok(AnalyzerConfig::from_json(&json)?)
        }
        None => Ok(AnalyzerConfig::default()),
    }
}

fn read_input(path: &Path) -> Result<String, CliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn parse_frames(data: &str, format: &InputFormat) -> Result<Vec<FrameSample>, CliError> {
    match format {
        InputFormat::Ndjson => {
            let mut frames = Vec::new();
            for (i, line) in data.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let frame: FrameSample =
                    serde_json::from_str(line).map_err(|e| CliError::Parse {
                        line: i + 1,
                        message: e.to_string(),
                    })?;
                frames.push(frame);
            }
            Ok(frames)
        }
        InputFormat::Json => {
            let frames: Vec<FrameSample> =
                serde_json::from_str(data).map_err(|e| CliError::Parse {
                    line: 1,
                    message: e.to_string(),
                })?;
            Ok(frames)
        }
    }
}

fn cmd_transform(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    snapshot: Option<&Path>,
) -> Result<(), CliError> {
    let cfg = load_config(config)?;
    let data = read_input(input)?;
    let frames = parse_frames(&data, &input_format)?;

    let mut analyzer = SessionAnalyzer::new(cfg);
    let mut events = Vec::new();
    for frame in &frames {
        events.extend(analyzer.update(frame));
    }

    let rendered = match output_format {
        OutputFormat::Ndjson => {
            let mut out = String::new();
            for event in &events {
                out.push_str(&serde_json::to_string(event).map_err(attune_core::CoreError::from)?);
                out.push('\n');
            }
            out
        }
        OutputFormat::Json => {
            serde_json::to_string(&events).map_err(attune_core::CoreError::from)?
        }
        OutputFormat::JsonPretty => {
            serde_json::to_string_pretty(&events).map_err(attune_core::CoreError::from)?
        }
    };

    if output.to_string_lossy() == "-" {
        io::stdout().write_all(rendered.as_bytes())?;
    } else {
        fs::write(output, rendered)?;
    }

    if let Some(path) = snapshot {
        let json = serde_json::to_string_pretty(&analyzer.snapshot())
            .map_err(attune_core::CoreError::from)?;
        fs::write(path, json)?;
    }

    Ok(())
}

/// Streaming record: events interleaved with periodic snapshots
#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum StreamRecord<'a> {
    Event(&'a attune_core::SessionEvent),
    Snapshot(attune_core::AnalyzerSnapshot),
}

fn cmd_run(config: Option<&Path>, snapshot_every: u64, flush: bool) -> Result<(), CliError> {
    let cfg = load_config(config)?;
    let mut analyzer = SessionAnalyzer::new(cfg);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for (i, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let frame: FrameSample = match serde_json::from_str(trimmed) {
            Ok(frame) => frame,
            Err(e) => {
                // A malformed frame in a live stream is skipped, not fatal
                eprintln!("skipping line {}: {e}", i + 1);
                continue;
            }
        };

        for event in analyzer.update(&frame) {
            let record = StreamRecord::Event(&event);
            serde_json::to_writer(&mut out, &record).map_err(attune_core::CoreError::from)?;
            out.write_all(b"\n")?;
        }

        let count = analyzer.snapshot().frame_count;
        if snapshot_every > 0 && count % snapshot_every == 0 {
            let record = StreamRecord::Snapshot(analyzer.snapshot());
            serde_json::to_writer(&mut out, &record).map_err(attune_core::CoreError::from)?;
            out.write_all(b"\n")?;
        }

        if flush {
            out.flush()?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct ValidationReport {
    total_lines: usize,
    valid_frames: usize,
    invalid_lines: Vec<InvalidLine>,
}

#[derive(Serialize)]
struct InvalidLine {
    line: usize,
    message: String,
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), CliError> {
    let data = read_input(input)?;

    let mut report = ValidationReport {
        total_lines: 0,
        valid_frames: 0,
        invalid_lines: Vec::new(),
    };

    for (i, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        report.total_lines += 1;
        match serde_json::from_str::<FrameSample>(trimmed) {
            Ok(_) => report.valid_frames += 1,
            Err(e) => report.invalid_lines.push(InvalidLine {
                line: i + 1,
                message: e.to_string(),
            }),
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).map_err(attune_core::CoreError::from)?
        );
    } else {
        println!(
            "{}/{} frames valid",
            report.valid_frames, report.total_lines
        );
        for invalid in &report.invalid_lines {
            println!("  line {}: {}", invalid.line, invalid.message);
        }
    }

    if report.invalid_lines.is_empty() {
        Ok(())
    } else {
        Err(CliError::Parse {
            line: report.invalid_lines[0].line,
            message: "invalid frames in input".to_string(),
        })
    }
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), CliError> {
    let mut checks = Vec::new();

    match config {
        Some(path) if path.exists() => match fs::read_to_string(path) {
            Ok(data) => match AnalyzerConfig::from_json(&data) {
                Ok(_) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: "Configuration parses and validates".to_string(),
                }),
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid configuration: {e}"),
                }),
            },
            Err(e) => checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read config file: {e}"),
            }),
        },
        Some(_) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        }),
        None => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Ok,
            message: "Using built-in defaults".to_string(),
        }),
    }

    // Frame streaming needs a pipe on stdin
    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY; pipe NDJSON frames in to stream"
    } else {
        "stdin is a pipe, ready to stream frames"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).map_err(attune_core::CoreError::from)?
        );
    } else {
        println!("Attune Doctor Report");
        println!("====================");
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

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliError::DoctorFailed)
    } else {
        Ok(())
    }
}
