//! shotlog-import - merge a CSV shot export into the shot store
//!
//! Loads the saved store, imports the file into its game and saves the
//! store again. Exit codes: 0 imported (or dry run), 1 error, 2 duplicates
//! found and `--force` not given, 3 imported but the save failed.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shotlog_common::config::{load_or_default, TomlConfig, CONFIG_ENV_VAR, STORE_ENV_VAR};
use shotlog_import::config::ImportSettings;
use shotlog_import::models::import_result::{count_by_severity, ErrorSeverity};
use shotlog_import::services::{csv_ingestor, duplicate_detector, import_planner, load_store_file};
use shotlog_import::{GameTarget, ImportCoordinator, ImportError, ImportMode, ImportOutcome, ImportSession, PersistenceStore};

/// Command-line arguments for shotlog-import
#[derive(Parser, Debug)]
#[command(name = "shotlog-import")]
#[command(about = "Import a CSV shot export into the shot store")]
#[command(version)]
struct Args {
    /// CSV file to import
    csv: PathBuf,

    /// Game name (default: "<team1> vs <team2>" from the first row)
    #[arg(short, long)]
    game: Option<String>,

    /// Game date (default: date of the first row)
    #[arg(short, long)]
    date: Option<String>,

    /// Import the non-duplicate rows without asking
    #[arg(short, long)]
    force: bool,

    /// Show the import plan without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Skip rows the store rejects instead of rolling the batch back
    #[arg(long)]
    best_effort: bool,

    /// Store snapshot file
    #[arg(short, long, env = STORE_ENV_VAR)]
    store: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("shotlog_import={0},shotlog_common={0}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args, config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args, config: TomlConfig) -> Result<ExitCode> {
    let settings = ImportSettings::resolve(args.store.as_deref(), args.best_effort, &config);
    info!(store = %settings.store_path.display(), "Starting shotlog-import");

    let store = match load_store_file(&settings.store_path)
        .await
        .context("Failed to read store file")?
    {
        Some(bytes) => PersistenceStore::from_snapshot(&bytes)
            .await
            .context("Failed to load store snapshot")?,
        None => {
            info!("No saved store yet, starting empty");
            PersistenceStore::open_in_memory()
                .await
                .context("Failed to open store")?
        }
    };

    let text = tokio::fs::read_to_string(&args.csv)
        .await
        .with_context(|| format!("Failed to read {}", args.csv.display()))?;

    let target = match (args.game, args.date) {
        (Some(game), Some(date)) => Some(GameTarget::new(game, date)),
        (game, date) => csv_ingestor::ingest(&text)
            .ok()
            .and_then(|ingested| GameTarget::suggest(&ingested.candidates))
            .map(|s| GameTarget::new(game.unwrap_or(s.name), date.unwrap_or(s.date))),
    };

    if args.dry_run {
        return dry_run(&store, &text, target).await;
    }

    let sink = settings.snapshot_sink().context("Failed to set up durable save")?;
    let coordinator = ImportCoordinator::new(store, sink)
        .with_log_sink(settings.log_sink())
        .with_batch_mode(settings.batch_mode);

    let mode = if args.force { ImportMode::Forced } else { ImportMode::Standard };
    let mut session = ImportSession::new();
    let result = coordinator.run(&mut session, &text, target, mode).await;

    let warnings = count_by_severity(&session.issues, ErrorSeverity::Warning);
    let skipped = count_by_severity(&session.issues, ErrorSeverity::Skip);

    match result {
        Ok(ImportOutcome::Committed(report)) => {
            print_json(&json!({
                "status": "committed",
                "report": report,
                "warnings": warnings,
                "skipped_rows": skipped,
                "issues": session.issues,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(ImportOutcome::AwaitingConfirmation(plan)) => {
            warn!(duplicates = plan.duplicate_count, "Duplicates found, re-run with --force to import the rest");
            print_json(&json!({ "status": "awaiting_confirmation", "plan": plan }))?;
            Ok(ExitCode::from(2))
        }
        Err(e @ ImportError::Durability(_)) => {
            print_json(&json!({
                "status": "unsaved",
                "error": e.to_string(),
                "report": session.report,
            }))?;
            Ok(ExitCode::from(3))
        }
        Err(e) => {
            print_json(&json!({
                "status": "failed",
                "code": e.code(),
                "error": e.to_string(),
                "state": session.state,
            }))?;
            Ok(ExitCode::from(1))
        }
    }
}

/// Print the plan an import would follow
async fn dry_run(store: &PersistenceStore, text: &str, target: Option<GameTarget>) -> Result<ExitCode> {
    let ingested = csv_ingestor::ingest(text).context("Failed to parse CSV")?;
    let target = target
        .context("No game given and none could be derived from the first row")?
        .validated()?;

    let game_id = store.game_exists(&target.name, &target.date).await?;
    let existing = match game_id {
        Some(id) => store.shots_for_game(id).await?,
        None => Vec::new(),
    };

    let duplicates = duplicate_detector::find_duplicates(&ingested.candidates, &existing);
    let plan = import_planner::build_plan(&ingested.candidates, &duplicates, game_id);

    let duplicate_rows: Vec<usize> = duplicates
        .iter()
        .filter_map(|&i| ingested.candidates.get(i).map(|c| c.row_index))
        .collect();

    print_json(&json!({
        "status": "dry_run",
        "target": target,
        "plan": plan,
        "duplicate_rows": duplicate_rows,
    }))?;
    Ok(ExitCode::SUCCESS)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
