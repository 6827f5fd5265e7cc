//! # Label Ledger CLI (`ledger`)
//!
//! Drives the ingestion pipeline and the reports from the command line.
//!
//! ## Usage
//!
//! ```bash
//! ledger --config ./config/ledger.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ledger init` | Pick a backend and create the schema |
//! | `ledger backend` | Show which backend this process would pin |
//! | `ledger ingest --reporter-id N [FILE]` | Store one vision-model response |
//! | `ledger stats [--date YYYY-MM-DD]` | Daily summary |
//! | `ledger list [--period 7d]` | Records for a period with price statistics |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use label_ledger::report::Period;
use label_ledger::validate::Reporter;
use label_ledger::{backend, config, ingest, stats, Category};

/// Label Ledger CLI: shelf-label ingestion and reporting.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, defaults plus environment variables
/// (`DATABASE_URL`, `DB_POSTGRESDB_*`) are used.
#[derive(Parser)]
#[command(
    name = "ledger",
    about = "Label Ledger: shelf-label ingestion with PostgreSQL/SQLite storage",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ledger.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Select the backend and create the schema.
    ///
    /// This command is idempotent.
    Init,

    /// Show the backend this process pins and how it was reached.
    Backend,

    /// Store one vision-model response.
    ///
    /// Reads the response from FILE, or stdin when FILE is omitted. Exits
    /// with status 1 when no positive price could be read.
    Ingest {
        /// Response file. Reads stdin when omitted.
        file: Option<PathBuf>,

        /// Numeric identity of the person who sent the photo.
        #[arg(long)]
        reporter_id: i64,

        /// Display name of the reporter.
        #[arg(long)]
        reporter_name: Option<String>,
    },

    /// Print the summary for one date.
    Stats {
        /// Date to summarize (YYYY-MM-DD, UTC). Defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<chrono::NaiveDate>,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// List records, newest first.
    List {
        /// Time window: `today`, `7d`, `30d`, or `all`.
        #[arg(long, default_value = "all")]
        period: Period,

        /// Only show one category (e.g. `Rojo-Construcción`).
        #[arg(long)]
        category: Option<Category>,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn parse_date(s: &str) -> Result<chrono::NaiveDate, String> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {}", s, e))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let storage = backend::select_backend(&cfg).await?;
            println!(
                "Database initialized successfully ({} backend: {}).",
                storage.kind(),
                storage.descriptor()
            );
        }
        Commands::Backend => {
            let storage = backend::select_backend(&cfg).await?;
            println!("kind:       {}", storage.kind());
            println!("engine:     {}", storage.engine());
            println!("descriptor: {}", storage.descriptor());
        }
        Commands::Ingest {
            file,
            reporter_id,
            reporter_name,
        } => {
            let reporter = Reporter::new(reporter_id, reporter_name);
            let stored = ingest::run_ingest(&cfg, file.as_deref(), &reporter).await?;
            if !stored {
                std::process::exit(1);
            }
        }
        Commands::Stats { date, json } => {
            stats::run_stats(&cfg, date, json).await?;
        }
        Commands::List {
            period,
            category,
            json,
        } => {
            stats::run_list(&cfg, period, category, json).await?;
        }
    }

    Ok(())
}
