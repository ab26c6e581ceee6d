mod db;
mod error;
mod loader;
mod normalize;
mod parser;
mod settings;

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;
use tracing::info;

use db::SqliteSink;
use loader::{Echo, LoadStats, Sink};
use normalize::{CategoryLookup, EntityType};
use settings::{prompt, Settings};

#[derive(Parser)]
#[command(name = "listings_loader", about = "Load community listings CSV exports into the database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Target {
    /// Settings file (default: loader.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// SQLite database file (overrides settings)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load CSV exports and commit everything at the end
    Load {
        #[command(flatten)]
        target: Target,
        /// Item types to load, in order (default: info, leisure, help, link, service)
        #[arg(long, value_delimiter = ',')]
        only: Vec<EntityType>,
    },
    /// Load inside a transaction, print every item as JSON, then roll back
    Check {
        #[command(flatten)]
        target: Target,
        #[arg(long, value_delimiter = ',')]
        only: Vec<EntityType>,
    },
    /// List the categories known for an item type
    Categories {
        item_type: EntityType,
        #[command(flatten)]
        target: Target,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    match cli.command {
        Commands::Load { target, only } => {
            let total = run_load(&target, &only, true)?;
            print_total(&total);
        }
        Commands::Check { target, only } => {
            let total = run_load(&target, &only, false)?;
            eprintln!("Check only, nothing was committed.");
            print_total(&total);
        }
        Commands::Categories { item_type, target } => {
            let settings = Settings::load(target.config.as_deref())?;
            let conn = open_db(&target, &settings)?;
            let categories = db::categories_for(&conn, item_type)?;
            if categories.is_empty() {
                println!("No categories for {}.", item_type);
                return Ok(());
            }
            println!("{:<28} | {:<32} | {}", "Code", "Name", "Link");
            println!("{}", "-".repeat(90));
            for c in &categories {
                println!(
                    "{:<28} | {:<32} | {}",
                    truncate(&c.code, 28),
                    truncate(&c.name, 32),
                    c.link.as_deref().unwrap_or("-")
                );
            }
            println!("\n{} categories", categories.len());
        }
    }

    eprintln!("Done in {:.1}s", t0.elapsed().as_secs_f64());
    Ok(())
}

fn open_db(target: &Target, settings: &Settings) -> Result<Connection> {
    settings.warn_unused();
    let path = match target.db.clone().or_else(|| settings.database.clone()) {
        Some(p) => p,
        None => PathBuf::from(prompt("Database: ")?),
    };
    info!(database = ?path, "Connecting");
    let conn = db::connect(&path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

/// Load every selected item type in one transaction. Any error rolls all of it back.
fn run_load(target: &Target, only: &[EntityType], commit: bool) -> Result<LoadStats> {
    let settings = Settings::load(target.config.as_deref())?;
    let conn = open_db(target, &settings)?;
    let item_types = if only.is_empty() {
        EntityType::ALL.to_vec()
    } else {
        only.to_vec()
    };

    let tx = conn.unchecked_transaction()?;
    let total = if commit {
        load_all(&item_types, &settings, &mut SqliteSink::new(&tx))?
    } else {
        let mut echo = Echo::new(SqliteSink::new(&tx), io::stdout());
        let total = load_all(&item_types, &settings, &mut echo)?;
        echo.flush()?;
        total
    };

    if commit {
        tx.commit().context("Commit failed")?;
    } else {
        tx.rollback()?;
    }
    Ok(total)
}

fn load_all<S>(item_types: &[EntityType], settings: &Settings, sink: &mut S) -> Result<LoadStats>
where
    S: Sink + CategoryLookup,
{
    let mut total = LoadStats::default();
    for &item_type in item_types {
        let path = match settings.file_for(item_type) {
            Some(p) => p.to_path_buf(),
            None => {
                let answer = prompt(&format!("{}s csv file: ", item_type.label()))?;
                if answer.is_empty() {
                    info!(item_type = item_type.label(), "no file given, skipped");
                    continue;
                }
                PathBuf::from(answer)
            }
        };
        let file = File::open(&path).with_context(|| format!("Failed to open {:?}", path))?;
        total += loader::load(item_type, file, sink)
            .with_context(|| format!("Loading {:?} failed", path))?;
    }
    Ok(total)
}

fn print_total(total: &LoadStats) {
    eprintln!(
        "Inserted {} items, {} opening periods, {} languages.",
        total.items, total.periods, total.languages
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}
