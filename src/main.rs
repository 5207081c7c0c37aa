//! # Wordstock Main Driver
//!
//! ## Purpose
//! Command line entry point for the vocabulary corpus builder. Loads
//! configuration, reads a highlight export and runs one sequential harvest:
//! resolve, merge, snapshot.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration file, command line arguments, environment
//!   variables, a JSON highlight export
//! - **Output**: An updated dated corpus snapshot and a run summary
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging
//! 3. Read the highlight export (or take a single lookup word)
//! 4. Run the harvest pipeline
//! 5. Report run counters

use clap::{Arg, Command};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use wordstock::{
    config::Config,
    dictionary::EntryAssembler,
    errors::{HarvestError, Result},
    fetch::HttpPageFetcher,
    lemma::PassthroughLemmatizer,
    pipeline::{HarvestPipeline, Highlight},
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("wordstock")
        .version("1.0.0")
        .about("Builds a personal vocabulary corpus from reading highlights")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("highlights")
                .value_name("HIGHLIGHTS")
                .help("JSON highlight export to harvest"),
        )
        .arg(
            Arg::new("word")
                .short('w')
                .long("word")
                .value_name("WORD")
                .help("Resolve a single word and print the entry as JSON"),
        )
        .arg(
            Arg::new("corpus-dir")
                .long("corpus-dir")
                .value_name("DIR")
                .help("Corpus snapshot directory (overrides configuration)"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Resolve and merge but write no snapshot and touch no flashcards")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").ok_or_else(|| {
        HarvestError::Config {
            message: "missing config path".to_string(),
        }
    })?;
    let mut config = Config::from_file(config_path)?;

    if let Some(dir) = matches.get_one::<String>("corpus-dir") {
        config.snapshot.corpus_dir = dir.into();
    }
    config.validate()?;

    init_logging(&config)?;
    info!("Configuration loaded from: {}", config_path);

    let fetcher = HttpPageFetcher::new(&config.dictionary)?;

    if let Some(word) = matches.get_one::<String>("word") {
        let mut assembler = EntryAssembler::new(config.dictionary.clone(), fetcher);
        let entry = assembler.resolve_query(word).await;
        println!("{}", serde_json::to_string_pretty(&entry)?);
        return Ok(());
    }

    let Some(highlights_path) = matches.get_one::<String>("highlights") else {
        return Err(HarvestError::Config {
            message: "either a highlight export or --word is required".to_string(),
        });
    };
    let highlights = load_highlights(highlights_path)?;
    info!("Loaded {} highlights from {}", highlights.len(), highlights_path);

    let mut pipeline =
        HarvestPipeline::new(config, fetcher).with_dry_run(matches.get_flag("dry-run"));
    let stats = pipeline
        .run(highlights, &PassthroughLemmatizer, None)
        .await?;

    info!(
        "Harvest finished: {} processed, {} resolved, {} need manual attention, corpus {}",
        stats.processed, stats.resolved, stats.placeholders, stats.corpus_size
    );
    Ok(())
}

/// Read a highlight export: a JSON array of highlight objects.
fn load_highlights(path: &str) -> Result<Vec<Highlight>> {
    let body = std::fs::read_to_string(path).map_err(|e| HarvestError::InvalidHighlightFile {
        file: path.to_string(),
        details: e.to_string(),
    })?;
    serde_json::from_str(&body).map_err(|e| HarvestError::InvalidHighlightFile {
        file: path.to_string(),
        details: e.to_string(),
    })
}

/// Initialize the logging system based on configuration
fn init_logging(config: &Config) -> Result<()> {
    let log_level: tracing::Level =
        config.logging.level.parse().map_err(|_| HarvestError::Config {
            message: format!("Invalid log level: {}", config.logging.level),
        })?;
    let filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);

    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .json()
                    .with_filter(filter),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_filter(filter),
            )
            .init();
    }

    info!("Logging initialized with level: {}", config.logging.level);
    Ok(())
}
