use anyhow::{Result, anyhow};

use brawl_pipeline::config::{self, flag_value};
use brawl_pipeline::gold::process_gold_layer;
use brawl_pipeline::logging;

fn main() -> Result<()> {
    logging::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let date = match flag_value(&args, "date") {
        Some(raw) => config::parse_date_arg(&raw)?,
        None => config::today(),
    };

    let layout = config::data_layout();
    let summary = process_gold_layer(&layout, date);

    println!("Gold layer complete ({date})");
    for (name, path) in &summary.written {
        println!("{name}: {}", path.display());
    }
    for name in &summary.skipped {
        println!("{name}: skipped (no source data)");
    }
    for err in &summary.errors {
        println!("failed: {err}");
    }
    if summary.written.is_empty() && !summary.errors.is_empty() {
        return Err(anyhow!("no gold table could be built"));
    }
    Ok(())
}
