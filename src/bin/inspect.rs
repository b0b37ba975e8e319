use anyhow::{Context, Result, anyhow};

use brawl_pipeline::config::{self, flag_value};
use brawl_pipeline::entity::{DATE_COLUMN, Entity};
use brawl_pipeline::frame::string_column;
use brawl_pipeline::logging;
use brawl_pipeline::paths::DataKind;

const DEFAULT_DAYS: u32 = 7;

fn main() -> Result<()> {
    logging::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let entity = match (flag_value(&args, "player"), flag_value(&args, "club")) {
        (Some(tag), None) => Entity::player(&tag)?,
        (None, Some(tag)) => Entity::club(&tag)?,
        _ => return Err(anyhow!("pass exactly one of --player TAG or --club TAG")),
    };
    let days = match flag_value(&args, "days") {
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .with_context(|| format!("invalid --days {raw:?}"))?,
        None => DEFAULT_DAYS,
    };

    let layout = config::data_layout();
    let layer = flag_value(&args, "layer").unwrap_or_else(|| "processed".to_string());
    let base = match layer.as_str() {
        "raw" => layout.raw_dir(),
        "processed" => layout.processed_dir(),
        other => return Err(anyhow!("unknown layer {other:?} (expected raw or processed)")),
    };

    let today = config::today();
    println!("{} {} ({layer}, last {days} days)", entity.tag().kind(), entity.tag());
    for kind in DataKind::ALL {
        if kind.entity() != entity.tag().kind() {
            continue;
        }
        let history = entity.load_history(&base, kind, days, today)?;
        let dates = string_column(&history, DATE_COLUMN)?
            .iter()
            .flatten()
            .collect::<std::collections::BTreeSet<_>>();
        println!("{kind}: {} rows across {} day(s)", history.num_rows(), dates.len());
    }
    Ok(())
}
