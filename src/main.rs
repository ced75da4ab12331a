//! Policy-Harvester main entry point
//!
//! This is the command-line interface for the policy crawler and the task
//! pipeline built around it.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use policy_harvester::config::load_config_or_default;
use policy_harvester::crawler::CrawlOptions;
use policy_harvester::output::{load_statistics, print_statistics};
use policy_harvester::pipeline::{run_pipeline, run_policies_task, PipelineOptions, RunOptions};
use policy_harvester::storage::open_repository;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Policy-Harvester: crawl, dedupe, and archive published policies
///
/// Crawls the policy listing, stores new policies in a JSON-lines
/// repository, downloads their attachments, and optionally exports each
/// policy as a Markdown document.
#[derive(Parser, Debug)]
#[command(name = "policy-harvester")]
#[command(version)]
#[command(about = "Crawl and archive published policies", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl policies and merge new ones into the repository
    Policies {
        /// Only crawl policies published on or after this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        since: Option<NaiveDate>,

        /// Fetch at most this many list pages
        #[arg(long)]
        max_pages: Option<u32>,

        /// Yield at most this many policies
        #[arg(long)]
        limit: Option<usize>,

        /// Attachment directory (overrides [storage] download-dir)
        #[arg(long)]
        download_dir: Option<PathBuf>,

        /// Do not export new policies
        #[arg(long)]
        skip_export: bool,

        /// Report potential new policies without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the named task pipeline
    Pipeline {
        /// Print the task plan and exit
        #[arg(long)]
        dry_run: bool,

        /// Earliest publish date for the policies task (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date_arg)]
        policies_since: Option<NaiveDate>,

        /// Do not export from the policies task
        #[arg(long)]
        policies_skip_export: bool,
    },

    /// Show repository statistics and exit
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(path) = &cli.config {
        tracing::info!("Loading configuration from: {}", path.display());
    }
    let config = match load_config_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Policies {
            since,
            max_pages,
            limit,
            download_dir,
            skip_export,
            dry_run,
        } => {
            let defaults = RunOptions::from_config(&config);
            let options = RunOptions {
                crawl: CrawlOptions {
                    since,
                    max_pages,
                    limit,
                },
                download_dir: download_dir.unwrap_or(defaults.download_dir),
                skip_export,
                dry_run,
            };

            if let Err(e) = run_policies_task(&config, &options).await {
                tracing::error!("Policies task failed: {}", e);
                return Err(e.into());
            }
        }

        Command::Pipeline {
            dry_run,
            policies_since,
            policies_skip_export,
        } => {
            let options = PipelineOptions {
                dry_run,
                policies_since,
                policies_skip_export,
            };

            if let Err(e) = run_pipeline(&config, &options).await {
                tracing::error!("Pipeline failed: {:#}", e);
                return Err(e.into());
            }
        }

        Command::Stats => {
            let repository = open_repository(&config)?;
            let stats = load_statistics(&repository)?;
            print_statistics(&stats);
        }
    }

    Ok(())
}

/// Parses a `YYYY-MM-DD` command-line date
fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got {:?}: {}", value, e))
}

/// Sets up logging based on verbosity flags
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0-3+)
/// * `quiet` - If true, only show errors
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("policy_harvester=info,warn"),
            1 => EnvFilter::new("policy_harvester=debug,info"),
            2 => EnvFilter::new("policy_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
