use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::OptionExt;
use logotask::db::Db;
use logotask::models::{Difficulty, NewContentItem, TaskKind};
use logotask::names;
use logotask::services::generator::TaskGenerator;
use logotask::services::streak::StreakSweep;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// SQLite database URL.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://logotask.db")]
    database_url: String,

    /// User id that owns the shared content catalogue.
    #[arg(long, env = "DEFAULT_CONTENT_OWNER")]
    default_content_owner: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database and bring the schema up to date
    InitDb,
    /// Load the starter catalogue and a demo therapist/patient pair
    Seed,
    /// Import content items from a JSON file into a user's pool
    ImportContent {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        owner: i64,
    },
    /// Generate a task from the shared catalogue pool
    Generate {
        #[arg(long)]
        name: String,
        #[arg(long)]
        kind: String,
        #[arg(long, default_value = names::DIFFICULTY_EASY)]
        difficulty: String,
        /// Creating user; defaults to the catalogue owner.
        #[arg(long)]
        owner: Option<i64>,
        /// Fixed RNG seed for reproducible question selection.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Zero the day streaks of patients who missed a day
    Sweep {
        /// Keep running and sweep once a day instead of exiting.
        #[arg(long)]
        daemon: bool,
        /// Time of day (UTC, HH:MM) for the daemon's daily run.
        #[arg(long, default_value = "03:00")]
        at: String,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "tracing=info,logotask=debug".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let db = Db::new(&cli.database_url).await?;

    match cli.command {
        Commands::InitDb => {
            // Db::new already ran the migrations.
            println!("Schema ready.");
        }
        Commands::Seed => {
            let summary = db.seed().await?;
            println!(
                "Seeded {} content items. Catalogue owner: {}. Demo therapist: {}. Demo patient: {}.",
                summary.content_items,
                summary.catalogue_owner_id,
                summary.therapist_id,
                summary.patient_id
            );
            println!(
                "Set DEFAULT_CONTENT_OWNER={} for task generation.",
                summary.catalogue_owner_id
            );
        }
        Commands::ImportContent { file, owner } => {
            let raw = std::fs::read_to_string(&file)?;
            let items: Vec<NewContentItem> = serde_json::from_str(&raw)?;
            let imported = db.import_content(owner, &items).await?;
            println!("Imported {imported} content items from {}.", file.display());
        }
        Commands::Generate {
            name,
            kind,
            difficulty,
            owner,
            seed,
        } => {
            let catalogue_owner = cli
                .default_content_owner
                .ok_or_eyre("DEFAULT_CONTENT_OWNER must be set to generate tasks")?;
            let kind = TaskKind::from_str(&kind).ok_or_else(|| {
                color_eyre::eyre::eyre!(
                    "unknown task kind {kind:?}; expected one of {:?}",
                    names::TASK_KINDS
                )
            })?;
            let difficulty = Difficulty::from_str(&difficulty)
                .ok_or_eyre("difficulty must be \"Easy\" or \"Hard\"")?;

            let generator = TaskGenerator::new(db.clone(), catalogue_owner);
            let task_id = generator
                .generate(
                    &name,
                    kind,
                    difficulty,
                    owner.unwrap_or(catalogue_owner),
                    seed,
                )
                .await?;
            println!("Generated task {task_id} ({kind}, {} questions).", names::QUESTIONS_PER_TASK);
        }
        Commands::Sweep { daemon, at } => {
            let sweep = StreakSweep::new(db.clone());
            if daemon {
                run_sweep_daemon(&sweep, &at).await?;
            } else {
                let outcome = sweep.run(Utc::now().date_naive()).await?;
                println!(
                    "Swept streaks: {} checked, {} zeroed, {} failed.",
                    outcome.checked, outcome.zeroed, outcome.failed
                );
            }
        }
    }

    Ok(())
}

/// Sweeps once a day at the given UTC time until ctrl-c.
async fn run_sweep_daemon(sweep: &StreakSweep, at: &str) -> color_eyre::Result<()> {
    let at = chrono::NaiveTime::parse_from_str(at, "%H:%M")?;
    tracing::info!("streak sweep daemon started, daily run at {at} UTC");

    loop {
        let now = Utc::now();
        let todays_run = now.date_naive().and_time(at).and_utc();
        let next = if todays_run > now {
            todays_run
        } else {
            todays_run + chrono::Duration::days(1)
        };
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                if let Err(error) = sweep.run(Utc::now().date_naive()).await {
                    tracing::error!("streak sweep failed: {error}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("streak sweep daemon shutting down");
                return Ok(());
            }
        }
    }
}
