use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use inquire::{Confirm, InquireError};
use std::path::{Path, PathBuf};
use tabled::{Table, settings::Style};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tvsort::{
    alias::AliasIndex,
    config::Config,
    matcher::SimilarityMatcher,
    missing::{find_missing, select_shows, tracked_shows},
    pipeline::{Partition, Pipeline},
    relocate::{Relocation, Relocator, fix_ownership},
    report,
    tmdb::TmdbClient,
    video::{PatternParser, find_videos},
};

const CONFIG_FILE: &str = "tvsort.yml";

#[derive(Subcommand, Debug)]
enum Commands {
    /// Identify episode files under a path and move them into the destination
    Sort {
        path: PathBuf,
        /// Report what would happen without moving anything
        #[arg(long)]
        dry: bool,
    },
    /// List aired episodes that are not in the destination yet
    Missing {
        /// Shows to check, matched like filenames. Defaults to every show.
        shows: Vec<String>,
    },
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file, defaults to ~/tvsort.yml
    #[arg(long, env = "TVSORT_CONFIG", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug)]
enum Outcome {
    NoFiles,
    DryRun(Partition),
    Declined(Partition),
    Relocated(Relocation),
}

fn config_path(arg: Option<PathBuf>) -> Result<PathBuf> {
    match arg {
        Some(path) => Ok(path),
        None => {
            let home = std::env::var_os("HOME").context("HOME is not set, pass --config")?;
            Ok(PathBuf::from(home).join(CONFIG_FILE))
        }
    }
}

fn load(path: &Path) -> Result<(Config, AliasIndex)> {
    let config = Config::load(path).with_context(|| format!("Failed to load {:?}", path))?;
    let aliases = AliasIndex::build(&config.shows)
        .with_context(|| format!("Invalid shows in {:?}", path))?;
    Ok((config, aliases))
}

fn confirm() -> Result<bool> {
    match Confirm::new("Proceed to move files?")
        .with_default(false)
        .prompt()
    {
        Ok(answer) => Ok(answer),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn sort(
    config: &Config,
    aliases: &AliasIndex,
    files: Vec<PathBuf>,
    dry_run: bool,
    confirm: impl FnOnce() -> Result<bool>,
) -> Result<Outcome> {
    let parser = PatternParser::new()?;
    let matcher = SimilarityMatcher::new();
    let pipeline = Pipeline::new(config, aliases, &parser, &matcher);
    let partition = pipeline.run(files);

    if partition.is_empty() {
        println!("No files found");
        return Ok(Outcome::NoFiles);
    }

    report::print(&report::sections(&partition));
    if dry_run {
        return Ok(Outcome::DryRun(partition));
    }

    println!();
    if !confirm()? {
        println!("Aborted, no files were moved");
        return Ok(Outcome::Declined(partition));
    }

    let relocation = Relocator::from_settings(&config.settings).relocate_all(partition.success);
    info!(
        "relocated {} files, {} paths need ownership fixes",
        relocation.moved().count(),
        relocation.fixups.len()
    );

    if let Some(owner) = &config.settings.user {
        for failure in fix_ownership(&relocation.fixups, owner)? {
            println!(
                "{} {:?}: {}",
                "Could not fix ownership of".yellow(),
                failure.path,
                failure.error
            );
        }
    }

    let failures = report::failure_section("Move failures:", relocation.failed());
    if !failures.lines.is_empty() {
        println!();
        report::print(&[failures]);
    }
    println!(
        "Moved {} of {} files",
        relocation.moved().count(),
        relocation.records.len()
    );

    Ok(Outcome::Relocated(relocation))
}

async fn missing(config: &Config, aliases: &AliasIndex, queries: &[String]) -> Result<()> {
    let parser = PatternParser::new()?;
    let matcher = SimilarityMatcher::new();
    let pipeline = Pipeline::new(config, aliases, &parser, &matcher);

    let selection = select_shows(&pipeline, config, queries);
    for (query, confidence) in &selection.unresolved {
        println!(
            "{} {} (confidence={})",
            "Unknown show".yellow(),
            query,
            confidence
        );
    }

    let (tracked, untracked) = tracked_shows(config, &selection.shows);
    for name in &untracked {
        println!("Skipping {}: no tmdb_id configured", name);
    }
    if tracked.is_empty() {
        return Ok(());
    }

    let client = TmdbClient::new()?;
    let missing = find_missing(&client, &config.settings.destination, &tracked).await?;
    if missing.is_empty() {
        println!("No missing episodes");
    } else {
        println!("{}", Table::new(missing).with(Style::rounded()));
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let args = Args::parse();

    let path = config_path(args.config)?;
    let (config, aliases) = load(&path)?;

    match args.command {
        Commands::Sort { path, dry } => {
            let files = find_videos(&path, &config.settings.valid_extensions)?;
            sort(&config, &aliases, files, dry, confirm)?;
            Ok(())
        }
        Commands::Missing { shows } => missing(&config, &aliases, &shows).await,
    }
}
