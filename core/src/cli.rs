use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::interpreter::{Interp, ParseStatus, ResultCode};

#[derive(Parser)]
#[command(name = "mortar")]
#[command(about = "Mortar - an embeddable command-language interpreter", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script file
    Run {
        /// Script to execute
        file: PathBuf,
    },

    /// Evaluate a script given on the command line
    Eval {
        /// Script text
        script: String,
    },

    /// Report whether a script file is complete, incomplete or malformed
    Check {
        /// Script to classify
        file: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load and validate configuration before executing any command
    let config = Config::builder()
        .config_path(cli.config.as_ref().map(PathBuf::from))
        .build()?;
    init_logging(&config);

    match cli.command {
        Commands::Run { file } => {
            let source = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            info!(file = %file.display(), "running script");
            run_script(&config, &source);
        }

        Commands::Eval { script } => {
            debug!("evaluating command-line script");
            let mut interp = Interp::with_config(&config);
            let result = run_script_in(&mut interp, script.as_bytes());
            if !result.is_empty() {
                println!("{}", result);
            }
        }

        Commands::Check { file } => {
            let source = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let interp = Interp::with_config(&config);
            match interp.parse(&source) {
                ParseStatus::Complete => println!("complete"),
                ParseStatus::Incomplete => {
                    println!("incomplete");
                    std::process::exit(1);
                }
                ParseStatus::Error(message) => {
                    println!("error: {}", message);
                    std::process::exit(1);
                }
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

fn run_script(config: &Config, source: &[u8]) {
    let mut interp = Interp::with_config(config);
    run_script_in(&mut interp, source);
}

/// Evaluate `source`; on failure the trace goes to stderr and the process exits
fn run_script_in(interp: &mut Interp, source: &[u8]) -> String {
    match interp.eval(source) {
        ResultCode::Error => {
            let trace = interp
                .error_info()
                .unwrap_or_else(|| interp.result().to_string());
            eprintln!("{}", trace);
            std::process::exit(1);
        }
        code => {
            debug!(?code, "script finished");
            interp.result().to_string()
        }
    }
}

/// `RUST_LOG` wins over the configured filter
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
