use anyhow::{Result, anyhow};
use chrono::Local;

use brawl_pipeline::config::{self, flag_value};
use brawl_pipeline::logging;
use brawl_pipeline::paths::DataKind;
use brawl_pipeline::raw_convert::{convert, convert_all};

fn main() -> Result<()> {
    logging::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let only_date = flag_value(&args, "date")
        .map(|raw| config::parse_date_arg(&raw))
        .transpose()?;
    let kind = flag_value(&args, "kind").unwrap_or_else(|| "all".to_string());

    let layout = config::data_layout();
    let extracted_at = Local::now().naive_local();

    let results = if kind == "all" {
        convert_all(&layout, only_date, extracted_at)
    } else {
        let kind = kind.parse::<DataKind>()?;
        [(kind, convert(&layout, kind, only_date, extracted_at))]
            .into_iter()
            .collect()
    };

    println!("Raw conversion complete");
    println!("Data root: {}", layout.root().display());
    let mut failed = 0usize;
    for (kind, result) in &results {
        match result {
            Ok(dates) => println!("{kind}: {} partition(s)", dates.len()),
            Err(err) => {
                failed += 1;
                println!("{kind}: failed: {err:#}");
            }
        }
    }
    if failed == results.len() {
        return Err(anyhow!("every raw conversion failed"));
    }
    Ok(())
}
