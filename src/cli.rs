use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::application::InitBuilder;
use crate::config::Config;
use crate::driver::{PassOptions, Query, QueryOutcome};
use crate::tickets::{FinStore, TicketRegistry};
use crate::workflows::load_workflow;

#[derive(Parser)]
#[command(name = "loom")]
#[command(about = "Loom - a resumable reducer for workflow expressions", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reduce a workflow to completion, running foreign calls locally
    Run {
        /// Workflow JSON file
        workflow: PathBuf,

        /// Maximum concurrent invocations
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Directory holding per-ticket work directories
        #[arg(long)]
        build_dir: Option<PathBuf>,

        /// Print targets as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Parse a workflow and print a summary
    Check {
        /// Workflow JSON file
        workflow: PathBuf,
    },

    /// Run a single pass with no execution backend
    Reduce {
        /// Workflow JSON file
        workflow: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with explicit arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load eagerly so config errors show before any command output
    let config = Config::builder().config_path(cli.config.clone()).build()?;
    init_logging(&config);

    match cli.command {
        Commands::Run {
            workflow,
            workers,
            build_dir,
            json,
        } => {
            let file = load_workflow(&workflow)?;
            let mut builder = InitBuilder::new();
            if let Some(path) = cli.config {
                builder = builder.config_path(path);
            }
            if let Some(workers) = workers {
                builder = builder.workers(workers);
            }
            if let Some(dir) = build_dir {
                builder = builder.build_dir(dir);
            }
            let app = builder.init()?;
            tracing::info!(workflow = %file.name, version = %file.version, "running workflow");

            let result = tokio::select! {
                result = app.run(&file.document) => result,
                _ = tokio::signal::ctrl_c() => {
                    app.shutdown();
                    anyhow::bail!("interrupted");
                }
            };

            match result {
                Ok(targets) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&targets)?);
                    } else {
                        for target in &targets {
                            println!("{}", target);
                        }
                    }
                }
                Err(failure) => {
                    eprintln!("{}: {}", failure.error.kind(), failure.error);
                    eprintln!("Query {} after {} pass(es). Last targets:", failure.query, failure.passes);
                    for target in &failure.context {
                        eprintln!("  {}", target);
                    }
                    return Err(failure.into());
                }
            }
        }

        Commands::Check { workflow } => {
            let file = load_workflow(&workflow)?;
            println!("Workflow: {}", file.name);
            println!("Version: {}", file.version);
            println!("Definitions: {}", file.document.definitions.len());
            println!("Targets: {}", file.document.targets.len());
        }

        Commands::Reduce { workflow } => {
            let file = load_workflow(&workflow)?;
            let registry = TicketRegistry::sequential();
            let fin = FinStore::new();
            let options = PassOptions::default().with_max_depth(config.reducer.max_depth);
            let mut query = Query::new(file.document.definitions, file.document.targets);

            let outcome = query
                .step(&fin.snapshot(), &registry, &options)
                .map_err(|e| query.failure(e))
                .context("reduction failed")?;
            let requested = registry.drain_outbox(query.id());

            println!("{}", serde_json::to_string_pretty(query.targets())?);
            match outcome {
                QueryOutcome::Done(_) => println!("Complete: no tickets requested"),
                QueryOutcome::Waiting => {
                    println!("Requested {} ticket(s):", requested.len());
                    println!("{}", serde_json::to_string_pretty(&requested)?);
                }
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// `RUST_LOG` wins over `logging.filter`
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    // Already installed when called twice in one process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
