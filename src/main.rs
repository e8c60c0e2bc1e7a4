//! Dayfare - day-dining itinerary planner
//!
//! CLI entry point: wires the geocoding, candidate, and LLM collaborators
//! into the planner and prints the result.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use dayfare::calendar;
use dayfare::candidates::{AreaQuery, CandidateFilters, CandidateSource, OverpassSource};
use dayfare::cli::{Cli, Command, OutputFormat};
use dayfare::config::Config;
use dayfare::geocode::{NominatimGeocoder, Resolver};
use dayfare::llm::create_client;
use dayfare::pipeline::Planner;
use dayfare::presentation::{LlmNarrator, Narrator, render_plain};

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dayfare")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to a log file, keeping stdout clean for the plan itself
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("dayfare.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "Dayfare loaded config: area={}, model={}",
        config.geocode.area_hint, config.llm.model
    );

    match cli.command {
        Command::Plan {
            calendar,
            narrate,
            format,
        } => cmd_plan(&config, &calendar, narrate, format).await,
        Command::Extract { calendar, format } => cmd_extract(&calendar, format),
        Command::Candidates { format } => cmd_candidates(&config, format).await,
    }
}

/// Run the full planning pipeline and print the itinerary
async fn cmd_plan(config: &Config, calendar_path: &Path, narrate: bool, format: OutputFormat) -> Result<()> {
    config.validate()?;

    let calendar_text = fs::read_to_string(calendar_path)
        .context(format!("Failed to read calendar file {}", calendar_path.display()))?;

    let geocoder = Arc::new(NominatimGeocoder::from_config(&config.geocode)?);
    let source = Arc::new(OverpassSource::from_config(&config.candidates)?);
    let llm = create_client(&config.llm)?;

    let planner = Planner::new(config.clone(), geocoder, source, llm.clone());
    let outcome = planner.run(&calendar_text).await;

    // Per-item issues are informational: the run may have completed anyway
    if !outcome.context.issues().is_empty() {
        eprintln!("Issues during planning:");
        for issue in outcome.context.issues() {
            eprintln!("  - {}", issue);
        }
    }

    match outcome.result {
        Ok(()) => {
            let itinerary = outcome
                .context
                .itinerary
                .as_ref()
                .ok_or_else(|| eyre::eyre!("run completed without an itinerary"))?;

            match format {
                OutputFormat::Text => println!("{}", render_plain(itinerary)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(itinerary)?),
            }

            if narrate {
                let narrator = LlmNarrator::new(llm);
                match narrator.narrate(itinerary).await {
                    Ok(narration) => println!("\n{}", narration),
                    // Narration is presentation only; the plan above stands
                    Err(e) => eprintln!("Narration unavailable: {}", e),
                }
            }
            Ok(())
        }
        Err(e) => {
            if let Some(partial) = &outcome.context.itinerary {
                eprintln!("Partial itinerary before the failure:");
                eprintln!("{}", render_plain(partial));
            }
            Err(e).context("planning run failed")
        }
    }
}

/// Parse a calendar file and print what was extracted
fn cmd_extract(calendar_path: &Path, format: OutputFormat) -> Result<()> {
    let calendar_text = fs::read_to_string(calendar_path)
        .context(format!("Failed to read calendar file {}", calendar_path.display()))?;

    let parsed = calendar::extract(&calendar_text);

    match format {
        OutputFormat::Text => {
            for commitment in &parsed.commitments {
                println!("{}", calendar::render_line(commitment));
            }
            for issue in &parsed.issues {
                eprintln!("skipped: {}", issue);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&parsed.commitments)?);
        }
    }

    Ok(())
}

/// Fetch and list dining candidates for the configured area
async fn cmd_candidates(config: &Config, format: OutputFormat) -> Result<()> {
    let geocoder = Arc::new(NominatimGeocoder::from_config(&config.geocode)?);
    let resolver = Resolver::new(geocoder, config.geocode.max_retries);

    let center = resolver
        .resolve(&config.geocode.area_hint)
        .await
        .map_err(|e| eyre::eyre!("Could not locate area '{}': {}", config.geocode.area_hint, e))?;

    let source = OverpassSource::from_config(&config.candidates)?;
    let area = AreaQuery {
        center,
        radius_m: config.candidates.radius_m,
    };
    let filters = CandidateFilters {
        cuisine: config.candidates.cuisine.clone(),
        price: config.candidates.price,
    };
    let mut candidates = source.fetch(&area, &filters).await?;
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    match format {
        OutputFormat::Text => {
            println!("{} candidates near {}:", candidates.len(), config.geocode.area_hint);
            for c in &candidates {
                println!("  {:<12} {:.2}  {} ({})", c.id, c.score, c.name, c.category);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
    }

    Ok(())
}
