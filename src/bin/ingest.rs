use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use brawl_pipeline::api_client::BrawlStarsClient;
use brawl_pipeline::config::{self, PipelineConfig, flag_value};
use brawl_pipeline::ingest::{DEFAULT_MEMBER_DELAY, IngestContext, mode_names, run_batch, runner_for};
use brawl_pipeline::logging;
use brawl_pipeline::tag::TagKind;

fn main() -> Result<()> {
    logging::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mode = flag_value(&args, "mode").ok_or_else(|| {
        anyhow!("missing --mode (one of {})", mode_names().join(", "))
    })?;
    let runner = runner_for(&mode)?;
    let delay = parse_delay(&args)?;
    let date = match flag_value(&args, "date") {
        Some(raw) => config::parse_date_arg(&raw)?,
        None => config::today(),
    };

    let tags = match flag_value(&args, "tag") {
        Some(tag) => vec![tag],
        None => {
            let pipeline = PipelineConfig::load(&config::config_dir())?;
            match runner.tag_kind() {
                TagKind::Player => pipeline.default_player_tags,
                TagKind::Club => pipeline.default_club_tags,
            }
        }
    };
    if tags.is_empty() {
        return Err(anyhow!("no tags given and none configured for mode {mode}"));
    }

    let client = BrawlStarsClient::from_env()?;
    let layout = config::data_layout();
    let ctx = IngestContext {
        source: &client,
        layout: &layout,
        date,
        delay,
    };
    let summary = run_batch(runner.as_ref(), &ctx, &tags);

    println!("Ingest complete ({mode}, {date})");
    println!("Data root: {}", layout.root().display());
    println!(
        "Entities: {}/{} succeeded, {} failed",
        summary.successful, summary.total, summary.failed
    );
    if !summary.errors.is_empty() {
        println!("  errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(10) {
            println!("   - {err}");
        }
    }
    Ok(())
}

fn parse_delay(args: &[String]) -> Result<Duration> {
    let Some(raw) = flag_value(args, "delay") else {
        return Ok(DEFAULT_MEMBER_DELAY);
    };
    let secs = raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("invalid --delay {raw:?}"))?;
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid --delay {raw:?}"))
}
