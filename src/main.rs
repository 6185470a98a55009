use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use transaction_pipeline::{
    latest_batch, load_projections, projection, run_batch, setup_database, BatchFile,
    PipelineConfig, PipelineError,
};

/// Exit code when the batch was abandoned at schema normalization
const EXIT_ABANDONED: u8 = 2;
/// Exit code for every other failure
const EXIT_FAILURE: u8 = 1;

#[derive(Parser)]
#[command(name = "transaction-pipeline")]
#[command(about = "Validate, quarantine and load a batch of transactions")]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the latest batch (or --file), export it, optionally load it
    Run {
        /// Batch file name inside the raw data directory
        #[arg(long)]
        file: Option<String>,

        /// SQLite database to load projections into (overrides config)
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Print the batch file that `run` would pick
    Latest,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("transaction_pipeline=info,warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let status = exit_status(&e);
            if status == EXIT_ABANDONED {
                error!("❌ Batch abandoned: {}", e);
            } else {
                error!("❌ {:#}", e);
            }
            ExitCode::from(status)
        }
    }
}

/// Abandoned batches get their own exit code; quarantined rows are a success
fn exit_status(err: &anyhow::Error) -> u8 {
    let abandoned = err
        .downcast_ref::<PipelineError>()
        .map_or(false, PipelineError::is_batch_abandoned);

    if abandoned {
        EXIT_ABANDONED
    } else {
        EXIT_FAILURE
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { file, database } => run(&config, file.as_deref(), database),
        Commands::Latest => {
            let batch = latest_batch(&config.paths.raw_data)?;
            println!("{}", batch.path.display());
            Ok(())
        }
    }
}

fn resolve_batch(config: &PipelineConfig, file: Option<&str>) -> Result<BatchFile> {
    match file {
        Some(name) => {
            let path = config.paths.raw_data.join(name);
            BatchFile::from_path(&path).with_context(|| {
                format!(
                    "{} is not named transactions_<year>_<month>_<day>.json",
                    path.display()
                )
            })
        }
        None => Ok(latest_batch(&config.paths.raw_data)?),
    }
}

fn run(config: &PipelineConfig, file: Option<&str>, database: Option<PathBuf>) -> Result<()> {
    let batch = resolve_batch(config, file)?;
    info!("📂 Batch: {}", batch.file_name);

    let report = run_batch(config, &batch)?;
    info!("✓ {}", report.outcome.summary.summary());
    info!("✓ Validated: {}", report.paths.validated.display());
    info!("✓ Rejected: {}", report.paths.rejected.display());

    let Some(db_path) = database.or_else(|| config.database.clone()) else {
        return Ok(());
    };

    let customers = projection::customers(&report.outcome.validated, report.processed_at);
    let transactions = projection::transactions(&report.outcome.validated, report.processed_at);

    let mut conn = open_database(&db_path)?;
    let summary = load_projections(&mut conn, &customers, &transactions, &batch.file_name)?;
    info!(
        "💾 Loaded {} new customers, {} new transactions into {}",
        summary.customers_inserted,
        summary.transactions_inserted,
        db_path.display()
    );

    Ok(())
}

fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

// ============================================================================
// TESTS
// ============================================================================
