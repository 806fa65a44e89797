use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use baseball_db::config::{Config, IntegrityMode};
use baseball_db::constants::{CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE};
use baseball_db::pipeline::cleanup;
use baseball_db::{inspect, logging, metrics, schema, BuildOptions, BuildReport, Pipeline, Store};

#[derive(Parser)]
#[command(name = "baseball_db")]
#[command(about = "Normalize historical game logs into a relational SQLite store")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file (default: $BASEBALL_DB_CONFIG, then ./baseball_db.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite store to write or inspect
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Debug-level console logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the extracts and build every normalized table
    Build {
        /// Directory holding the five source extracts
        #[arg(long)]
        sources: Option<PathBuf>,
        /// How unresolved foreign keys are handled
        #[arg(long, value_enum)]
        integrity: Option<IntegrityMode>,
        /// Leave legacy staging tables in the store
        #[arg(long)]
        keep_staging: bool,
        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Declare the normalized tables without loading data
    Schema,
    /// List tables with their row counts
    Tables,
    /// First and last game date per league
    Leagues,
    /// Everyone who appeared in one game
    Game {
        /// Game id, e.g. 18710504CL10
        game_id: String,
    },
    /// Check game pairing and foreign keys in an existing store
    Verify,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let explicit = cli
        .config
        .clone()
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));
    let mut config = Config::resolve(explicit.as_deref(), Path::new(DEFAULT_CONFIG_FILE))
        .context("Failed to load configuration")?;
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    Ok(config)
}

fn print_report(report: &BuildReport) {
    println!(
        "\n📊 Build Results ({:.2}s, {:?} integrity):",
        report.duration_secs(),
        report.integrity
    );
    for source in &report.sources {
        println!("   {:<18} {:>9} rows read", source.source, source.rows);
    }
    for table in &report.tables {
        println!(
            "   {:<18} {:>9} inserted {:>9} skipped",
            table.table, table.counts.inserted, table.counts.skipped
        );
    }
    if !report.schema.rebuilt.is_empty() {
        println!("   Rebuilt tables: {:?}", report.schema.rebuilt);
    }
    println!("   Games verified: {}", report.verification.games_checked);
    if !report.integrity_violations.is_empty() {
        println!("\n⚠️  {} unresolved foreign keys:", report.integrity_violations.len());
        for violation in report.integrity_violations.iter().take(20) {
            println!("   - {}", violation);
        }
    }
    if !report.legacy_tables_dropped.is_empty() {
        println!("   Dropped legacy tables: {}", report.legacy_tables_dropped.join(", "));
    }
}

fn run_build(
    config: &Config,
    sources: Option<PathBuf>,
    integrity: Option<IntegrityMode>,
    keep_staging: bool,
    json: bool,
) -> Result<()> {
    let mut source_config = config.sources.clone();
    if let Some(dir) = sources {
        source_config.dir = dir;
    }
    let options = BuildOptions {
        integrity: integrity.unwrap_or(config.build.integrity),
        drop_staging: config.build.drop_staging && !keep_staging,
    };

    let recorder = config.metrics.textfile.as_ref().and_then(|_| metrics::install_recorder());

    if !json {
        println!("🔄 Building {} ...", config.database.display());
    }
    let mut store = Store::open(&config.database)
        .with_context(|| format!("Failed to open store '{}'", config.database.display()))?;
    let result = Pipeline::new(&mut store, options).run(&source_config.paths());

    if let (Some(handle), Some(path)) = (&recorder, &config.metrics.textfile) {
        metrics::write_textfile(handle, path).context("Failed to write metrics textfile")?;
    }

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            error!("Build failed: {}", e);
            return Err(e).context("Build failed");
        }
    };

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
        println!("\n✅ Build completed successfully");
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let _guard = logging::init_logging(&config.logging.dir, &config.logging.file_name, cli.verbose)
        .context("Failed to initialize logging")?;
    info!(database = %config.database.display(), "Starting baseball_db");

    match cli.command {
        Commands::Build {
            sources,
            integrity,
            keep_staging,
            json,
        } => run_build(&config, sources, integrity, keep_staging, json)?,
        Commands::Schema => {
            let store = Store::open(&config.database)?;
            let outcome = schema::declare(store.connection())?;
            println!(
                "✅ Schema declared: {} created, {} rebuilt, {} unchanged",
                outcome.created.len(),
                outcome.rebuilt.len(),
                outcome.unchanged.len()
            );
        }
        Commands::Tables => {
            let store = Store::open(&config.database)?;
            for table in inspect::list_tables(store.connection())? {
                println!("{:<20} {:<6} {:>10}", table.name, table.kind, table.rows);
            }
        }
        Commands::Leagues => {
            let store = Store::open(&config.database)?;
            for span in inspect::league_spans(store.connection())? {
                println!(
                    "{:<4} {:<22} {} - {} ({} games)",
                    span.league_id.as_deref().unwrap_or("?"),
                    span.name.as_deref().unwrap_or("unknown"),
                    span.first_date,
                    span.last_date,
                    span.games
                );
            }
        }
        Commands::Game { game_id } => {
            let store = Store::open(&config.database)?;
            let appearances = inspect::game_appearances(store.connection(), &game_id)?;
            if appearances.is_empty() {
                println!("⚠️  No appearances recorded for game {}", game_id);
            }
            for a in appearances {
                let name = [a.first_name.as_deref(), a.last_name.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "{:<4} {:<5} {:<10} {:<24} {}",
                    a.team_id.as_deref().unwrap_or("-"),
                    a.appearance_type_id,
                    a.person_id,
                    name,
                    a.type_name.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Verify => {
            let store = Store::open(&config.database)?;
            let verification = cleanup::verify_store(store.connection())?;
            let violations = store.foreign_key_violations()?;
            println!("   Games checked: {}", verification.games_checked);
            println!("   Unpaired performances: {}", verification.unpaired_performances.len());
            println!("   Foreign key violations: {}", violations.len());
            if verification.is_ok() && violations.is_empty() {
                println!("✅ Store verified");
            } else {
                anyhow::bail!("Store failed verification");
            }
        }
    }
    Ok(())
}
