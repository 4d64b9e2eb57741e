use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tunegraph::config::AppConfig;
use tunegraph::db::Database;
use tunegraph::models::ImportStats;

#[derive(Parser)]
#[command(name = "tunegraph", version, about = "Traditional music catalog normalizer")]
struct Cli {
    /// Path to the SQLite database
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize the JSON exports and store the result
    Import {
        /// Directory holding the exports (defaults to config data_dir)
        data_dir: Option<PathBuf>,

        /// Write normalized JSON files to this directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Skip writing to the database
        #[arg(long)]
        no_db: bool,

        /// Record references to unknown tunes as import errors
        #[arg(long)]
        strict_links: bool,

        /// Number of parallel workers (0 = auto-detect from config)
        #[arg(short = 'j', long, default_value = "0")]
        jobs: usize,
    },

    /// Print the melodic features of a notation string
    Features {
        /// Notation text
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        abc: Option<String>,

        /// Read the notation from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Search stored tunes (or sessions) by name, alias, type, mode or place
    Search {
        query: String,

        /// Search sessions instead of tunes
        #[arg(long)]
        sessions: bool,

        /// Number of results
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Show catalog statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = AppConfig::load();

    // Resolve database path: CLI > config > XDG default
    let db_path = cli
        .db_path
        .or(config.db_path.clone())
        .unwrap_or_else(tunegraph::config::default_db_path);

    match cli.command {
        Commands::Import { data_dir, out, no_db, strict_links, jobs } => {
            let data_dir = match data_dir.or(config.data_dir.clone()) {
                Some(dir) => dir,
                None => anyhow::bail!(
                    "No data directory. Pass it as an argument or set data_dir in config."
                ),
            };

            let inputs = tunegraph::loader::load_inputs(&data_dir)
                .with_context(|| format!("Failed to load exports from {}", data_dir.display()))?;

            let options = tunegraph::pipeline::PipelineOptions {
                workers: if jobs > 0 { jobs } else { config.resolve_workers() },
                strict_links: strict_links || config.strict_links,
                progress: config.progress,
            };
            let output = tunegraph::pipeline::run(&inputs, &options).context("Import failed")?;

            print_import_stats(&output.stats);
            if !options.strict_links {
                let unresolved =
                    output.set_links.unresolved.len() + output.recording_links.unresolved.len();
                if unresolved > 0 {
                    println!("Unresolved tune references: {} (use --strict-links to record them)", unresolved);
                }
            }

            if let Some(out_dir) = out.or(config.output_dir.clone()) {
                let written = tunegraph::export::write_json(&out_dir, &output)
                    .context("Failed to write JSON output")?;
                println!("Wrote {} files to {}", written.len(), out_dir.display());
            }

            if !no_db {
                let db = open_db(&db_path)?;
                let summary = db.store_output(&output).context("Failed to store import")?;
                println!(
                    "Stored {} tunes, {} settings, {} sets, {} recordings, {} sessions in {}",
                    summary.tunes,
                    summary.settings,
                    summary.sets,
                    summary.recordings,
                    summary.sessions,
                    db_path.display()
                );
            }
        }

        Commands::Features { abc, file } => {
            let abc = match (abc, file) {
                (Some(abc), _) => abc,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("Pass notation text or --file"),
            };
            let features = tunegraph::features::extract(&abc);
            println!("{}", serde_json::to_string_pretty(&features)?);
        }

        Commands::Search { query, sessions, limit } => {
            let db = open_db(&db_path)?;
            if sessions {
                let hits = db.search_sessions(&query, limit).context("Session search failed")?;
                if hits.is_empty() {
                    println!("No sessions matching '{}'", query);
                    return Ok(());
                }
                println!("{:>7}  {:<30} {}", "ID", "Session", "Address");
                println!("{}", "-".repeat(80));
                for h in &hits {
                    println!("{:>7}  {:<30} {}", h.session_id, truncate(&h.name, 30), h.full_address);
                }
            } else {
                let hits = db.search_tunes(&query, limit).context("Tune search failed")?;
                if hits.is_empty() {
                    println!("No tunes matching '{}'", query);
                    return Ok(());
                }
                println!("{:>7}  {:<35} {:<12} {:>8} {:>5}", "ID", "Tune", "Type", "Books", "Sets");
                println!("{}", "-".repeat(72));
                for h in &hits {
                    println!(
                        "{:>7}  {:<35} {:<12} {:>8} {:>5}",
                        h.tune_id,
                        truncate(&h.name, 35),
                        h.tune_type,
                        h.popularity,
                        h.setting_count
                    );
                }
            }
        }

        Commands::Stats => {
            let db = open_db(&db_path)?;
            let stats = db.stats().context("Failed to get stats")?;
            println!("Catalog Statistics");
            println!("==================");
            println!("Tunes:          {}", stats.tunes);
            println!("Settings:       {}", stats.settings);
            println!("Sets:           {}", stats.sets);
            println!("Recordings:     {}", stats.recordings);
            println!("Sessions:       {}", stats.sessions);
            println!("Users:          {}", stats.users);
            println!("Import errors:  {}", stats.import_errors);
            println!();

            if !stats.tune_types.is_empty() {
                println!("Tune types:");
                for (kind, count) in &stats.tune_types {
                    println!("  {:<14} {}", kind, count);
                }
            }
        }
    }

    Ok(())
}

fn open_db(path: &Path) -> Result<Database> {
    log::info!("Database: {}", path.display());
    Database::open(path).context("Failed to open database")
}

fn print_import_stats(stats: &ImportStats) {
    println!("Import complete");
    println!("===============");
    println!("Tunes:          {}", stats.tunes_processed);
    println!("Sets:           {}", stats.sets_processed);
    println!("Recordings:     {}", stats.recordings_processed);
    println!("Sessions:       {}", stats.sessions_processed);
    println!("Aliases:        {}", stats.aliases_processed);
    println!("Popularity:     {}", stats.popularity_processed);
    println!("Errors:         {}", stats.errors.len());

    let by_type = stats.error_count_by_type();
    if !by_type.is_empty() {
        println!();
        println!("Errors by type:");
        for (entity_type, count) in &by_type {
            println!("  {:<14} {}", entity_type, count);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}
