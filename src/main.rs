use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;

use brawl_pipeline::api_client::BrawlStarsClient;
use brawl_pipeline::config::{self, PipelineConfig, flag_value};
use brawl_pipeline::ingest::DEFAULT_MEMBER_DELAY;
use brawl_pipeline::logging;
use brawl_pipeline::pipeline::run_unified;

fn main() -> Result<()> {
    logging::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let delay = match flag_value(&args, "delay") {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .with_context(|| format!("invalid --delay {raw:?}"))?,
        None => DEFAULT_MEMBER_DELAY,
    };

    let pipeline = PipelineConfig::load(&config::config_dir())?;
    let client = BrawlStarsClient::from_env()?;
    let layout = config::data_layout();
    let today = config::today();

    let report = run_unified(
        &client,
        &layout,
        &pipeline,
        today,
        delay,
        Local::now().naive_local(),
    )?;

    println!("Pipeline run complete ({today})");
    println!("Data root: {}", layout.root().display());
    println!(
        "Players: {}/{} ingested, {} failed",
        report.players.successful, report.players.total, report.players.failed
    );
    println!(
        "Clubs: {}/{} ingested, {} failed",
        report.clubs.successful, report.clubs.total, report.clubs.failed
    );
    for (kind, partitions) in &report.raw {
        println!("raw {kind}: {partitions} partition(s)");
    }
    println!(
        "processed: {}",
        report
            .processed
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    for (name, path) in &report.gold.written {
        println!("gold {name}: {}", path.display());
    }
    let errors = report
        .players
        .errors
        .iter()
        .chain(&report.clubs.errors)
        .chain(&report.gold.errors)
        .collect::<Vec<_>>();
    if !errors.is_empty() {
        println!("errors: {}", errors.len());
        for err in errors.iter().take(10) {
            println!(" - {err}");
        }
    }
    Ok(())
}
