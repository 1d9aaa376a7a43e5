use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod config;
mod db;
mod engine;
mod error;
mod fixtures;

use config::{Command, Config, RecordArgs};
use db::models::{OutcomeRecord, OutcomeResult, Sport};
use db::Database;
use engine::PredictionEngine;
use fixtures::{ApiFootball, FixtureSource, OddsApi, SimulatedFixtures, WithFallback};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    config.validate()?;

    let db = Database::open(&config.database_path)?;
    info!("Database opened: {}", config.database_path);
    let engine = PredictionEngine::new(db);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    // Live sources give up and fall back within one provider timeout; the
    // overall poll allows for the fallback on top
    let timeout = Duration::from_secs(config.provider_timeout_secs) * 2;

    match &config.command {
        Command::Generate => {
            let sources = build_sources(&config)?;
            generate_and_store(&engine, &sources, timeout, &mut rng).await?;
        }
        Command::Record(args) => {
            let state = record(&engine, args)?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::Stats => {
            let stats = engine.get_statistics()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Run { interval_secs } => {
            let sources = build_sources(&config)?;
            let mut interval = tokio::time::interval(Duration::from_secs(*interval_secs));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            info!("Scheduled generation every {}s (Ctrl-C to stop)", interval_secs);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let pass = generate_and_store(&engine, &sources, timeout, &mut rng);
                        if let Err(e) = pass.await {
                            error!("Generation pass failed: {:#}", e);
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutting down");
                        break;
                    }
                }
            }
        }
        Command::Rebuild => {
            let state = engine.rebuild()?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}

/// One provider per sport: the live API when a key is configured, falling
/// back to the simulated slate when it fails; otherwise the simulated slate.
fn build_sources(config: &Config) -> Result<Vec<Arc<dyn FixtureSource>>> {
    let timeout = Duration::from_secs(config.provider_timeout_secs);
    let mut sources: Vec<Arc<dyn FixtureSource>> = Vec::new();

    let soccer = Arc::new(SimulatedFixtures::new(Sport::Soccer));
    match config.football_api_key.as_deref() {
        Some(key) => {
            let live = ApiFootball::new(
                key,
                &config.football_api_url,
                config.max_fixtures_per_source,
                timeout,
            )?;
            sources.push(Arc::new(WithFallback::new(Arc::new(live), soccer, timeout)));
        }
        None => {
            info!("FOOTBALL_API_KEY not set, using simulated soccer fixtures");
            sources.push(soccer);
        }
    }

    let nba = Arc::new(SimulatedFixtures::new(Sport::Basketball));
    match config.odds_api_key.as_deref() {
        Some(key) => {
            let live = OddsApi::new(
                key,
                &config.odds_api_url,
                config.max_fixtures_per_source,
                timeout,
            )?;
            sources.push(Arc::new(WithFallback::new(Arc::new(live), nba, timeout)));
        }
        None => {
            info!("ODDS_API_KEY not set, using simulated NBA fixtures");
            sources.push(nba);
        }
    }

    Ok(sources)
}

async fn generate_and_store(
    engine: &PredictionEngine<Database>,
    sources: &[Arc<dyn FixtureSource>],
    timeout: Duration,
    rng: &mut StdRng,
) -> Result<()> {
    let predictions = engine.generate_daily(sources, timeout, rng).await?;
    let ids = engine.save_predictions(&predictions)?;
    let rows: Vec<serde_json::Value> = ids
        .iter()
        .zip(&predictions)
        .map(|(id, p)| serde_json::json!({ "id": id, "prediction": p }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    info!("Stored {} prediction(s)", ids.len());
    Ok(())
}

fn record(
    engine: &PredictionEngine<Database>,
    args: &RecordArgs,
) -> Result<engine::weights::WeightState> {
    let result: OutcomeResult = args.result.parse()?;

    if let Some(id) = args.prediction_id {
        return Ok(engine.record_prediction_result(id, result)?);
    }

    let outcome = OutcomeRecord {
        id: None,
        fixture_id: args.fixture_id.clone().context("--fixture-id is required")?,
        predicted_label: args.label.clone().context("--label is required")?,
        confidence: args.confidence.context("--confidence is required")?,
        factors: args.factors.clone(),
        result,
        recorded_at: Utc::now(),
    };
    Ok(engine.record_outcome(&outcome)?)
}
