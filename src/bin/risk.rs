//! Risk CLI - Command-line interface for the exposure risk engine
//!
//! Commands:
//! - score: Score exposure windows with the current per-day algorithm
//! - legacy: Score exposure windows with the legacy summary algorithm
//! - validate-config: Check a configuration snapshot
//! - default-config: Print the bundled fallback configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use exposure_risk::encoder::ReportEncoder;
use exposure_risk::types::RiskReport;
use exposure_risk::{
    parse_windows, RiskAlgorithm, RiskCalculationConfiguration, RiskEngine, RiskError,
    ENGINE_VERSION,
};

/// Risk - On-device risk scoring for exposure notification windows
#[derive(Parser)]
#[command(name = "risk")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score exposure windows into daily risk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score exposure windows with the current per-day algorithm
    Score(ScoreArgs),

    /// Score exposure windows with the legacy summary algorithm
    Legacy(ScoreArgs),

    /// Validate a risk configuration snapshot
    ValidateConfig {
        /// Configuration file path (use - for stdin)
        #[arg(short, long)]
        config: PathBuf,

        /// Output validation result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the bundled fallback configuration
    DefaultConfig {
        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct ScoreArgs {
    /// Exposure windows file path (use - for stdin)
    #[arg(short, long)]
    windows: PathBuf,

    /// Configuration file path; the bundled default is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file path (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Output format
    #[arg(long, default_value = "json-pretty")]
    output_format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON on a single line
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RiskCliError> {
    match cli.command {
        Commands::Score(args) => cmd_score(RiskAlgorithm::Daily, &args),
        Commands::Legacy(args) => cmd_score(RiskAlgorithm::Legacy, &args),
        Commands::ValidateConfig { config, json } => cmd_validate_config(&config, json),
        Commands::DefaultConfig { output } => cmd_default_config(&output),
    }
}

fn cmd_score(algorithm: RiskAlgorithm, args: &ScoreArgs) -> Result<(), RiskCliError> {
    let engine = match &args.config {
        Some(path) => RiskEngine::from_json(&read_input(path)?)?,
        None => RiskEngine::default(),
    };

    let windows = parse_windows(&read_input(&args.windows)?)?;
    let assessment = engine.assess(algorithm, &windows)?;
    let report = ReportEncoder::new().encode(&assessment, windows.len());

    write_output(&args.output, &format_report(&report, &args.output_format)?)
}

fn cmd_validate_config(config: &Path, json: bool) -> Result<(), RiskCliError> {
    let input = read_input(config)?;
    let result = RiskCalculationConfiguration::from_json(&input);

    let report = ConfigValidationReport {
        valid: result.is_ok(),
        legacy_tables: result
            .as_ref()
            .map(|c| c.legacy.is_some())
            .unwrap_or(false),
        error: result.as_ref().err().map(|e| e.to_string()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Configuration Validation");
        println!("========================");
        println!("Valid:         {}", report.valid);
        println!("Legacy tables: {}", report.legacy_tables);
        if let Some(error) = &report.error {
            println!("\nError: {}", error);
        }
    }

    match result {
        Ok(_) => Ok(()),
        Err(_) => Err(RiskCliError::ValidationFailed),
    }
}

fn cmd_default_config(output: &Path) -> Result<(), RiskCliError> {
    let json = RiskCalculationConfiguration::default().to_json()?;
    write_output(output, &(json + "\n"))
}

// Helper functions

fn read_input(path: &Path) -> Result<String, RiskCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, data: &str) -> Result<(), RiskCliError> {
    if path.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(path, data)?;
    }
    Ok(())
}

fn format_report(report: &RiskReport, format: &OutputFormat) -> Result<String, RiskCliError> {
    let body = match format {
        OutputFormat::Json => serde_json::to_string(report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(report)?,
    };
    Ok(body + "\n")
}

// Error types

#[derive(Debug)]
enum RiskCliError {
    Io(io::Error),
    Risk(RiskError),
    Json(serde_json::Error),
    ValidationFailed,
}

impl From<io::Error> for RiskCliError {
    fn from(e: io::Error) -> Self {
        RiskCliError::Io(e)
    }
}

impl From<RiskError> for RiskCliError {
    fn from(e: RiskError) -> Self {
        RiskCliError::Risk(e)
    }
}

impl From<serde_json::Error> for RiskCliError {
    fn from(e: serde_json::Error) -> Self {
        RiskCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RiskCliError> for CliError {
    fn from(e: RiskCliError) -> Self {
        match e {
            RiskCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RiskCliError::Risk(RiskError::InvalidConfiguration(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'risk validate-config' for details".to_string()),
            },
            RiskCliError::Risk(e) => CliError {
                code: "RISK_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure windows and configuration match the expected JSON shape".to_string()),
            },
            RiskCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RiskCliError::ValidationFailed => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: "Configuration failed validation".to_string(),
                hint: Some("Fix the reported field and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ConfigValidationReport {
    valid: bool,
    legacy_tables: bool,
    error: Option<String>,
}
