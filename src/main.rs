use anyhow::Result;
use clap::{Parser, Subcommand};
use renlint::{checks, Config, Reporter, StructuralParser};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "renlint")]
#[command(about = "Static analyzer for Ren'Py-style visual novel scripts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project directory and report findings
    Analyze {
        /// Project root (the folder containing game/, or a scripts folder)
        path: PathBuf,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Comma-separated check names (default: all)
        #[arg(long)]
        checks: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Directory to write JSON/markdown reports into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Enable debug logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Generate a documented default configuration file
    Config {
        /// Output path (defaults to ~/.renlint.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the available checks
    Checks,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            config,
            checks,
            format,
            output,
            verbose,
        } => analyze(path, config, checks, format, output, verbose),
        Commands::Config { output } => match generate_config(output) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::from(2)
            }
        },
        Commands::Checks => {
            for name in checks::check_names() {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
    }
}

fn analyze(
    path: PathBuf,
    config_path: Option<PathBuf>,
    check_names: Option<String>,
    format: OutputFormat,
    output: Option<PathBuf>,
    verbose: bool,
) -> ExitCode {
    init_logging(verbose);

    let config = match load_config(config_path, check_names) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    let parser = match StructuralParser::new() {
        Ok(parser) => parser,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };

    let start = Instant::now();
    let progress = |msg: &str, _frac: f64| {
        if verbose {
            eprintln!("{msg}");
        }
    };

    let findings = match renlint::run_analysis(&path, &config, &parser, Some(&progress), None) {
        Ok(findings) => findings,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };
    let duration = start.elapsed();

    match format {
        OutputFormat::Text => print_text(&findings),
        OutputFormat::Json => match serde_json::to_string_pretty(&findings) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(2);
            }
        },
    }

    if let Some(output_dir) = output {
        let reporter = Reporter::new();
        let report = reporter.generate_report(&findings, &path, duration.as_millis());
        match reporter.export_report(&report, &output_dir) {
            Ok(written) => {
                for file in written {
                    eprintln!("Report written to {}", file.display());
                }
            }
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(2);
            }
        }
    }

    if findings.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn load_config(config_path: Option<PathBuf>, check_names: Option<String>) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => Config::from_file(&path)?,
        None => Config::load()?,
    };
    if let Some(names) = check_names {
        config.checks.enabled = names.split(',').map(|s| s.trim().to_string()).collect();
    }
    Ok(config)
}

fn print_text(findings: &[renlint::Finding]) {
    if findings.is_empty() {
        println!("No issues found.");
        return;
    }

    for finding in findings {
        println!("[{}] {}", finding.severity, finding.message);
        println!("  {}:{}", finding.file, finding.line);
        if !finding.explanation.is_empty() {
            println!("  {}", finding.explanation);
        }
        if !finding.suggestion.is_empty() {
            println!("  -> {}", finding.suggestion);
        }
        println!();
    }

    eprintln!("Total: {} finding(s).", findings.len());
}

fn generate_config(output: Option<PathBuf>) -> Result<()> {
    let config_path = match output {
        Some(path) => path,
        None => Config::default_config_path()?,
    };
    std::fs::write(&config_path, Config::create_documented_config())?;
    println!("Configuration file created: {}", config_path.display());
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "renlint=debug" } else { "renlint=warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
