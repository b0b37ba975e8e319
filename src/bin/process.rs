use anyhow::Result;

use brawl_pipeline::config::{self, flag_value};
use brawl_pipeline::logging;
use brawl_pipeline::silver::run_mode;

fn main() -> Result<()> {
    logging::load_dotenv();
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mode = flag_value(&args, "mode").unwrap_or_else(|| "all".to_string());
    let date = match flag_value(&args, "date") {
        Some(raw) => config::parse_date_arg(&raw)?,
        None => config::today(),
    };

    let layout = config::data_layout();
    let results = run_mode(&layout, &mode, date)?;

    println!("Processing complete ({mode}, {date})");
    for (kind, result) in results {
        match result {
            Ok(Some(path)) => println!("{kind}: {}", path.display()),
            Ok(None) => println!("{kind}: no raw partition"),
            Err(err) => println!("{kind}: failed: {err:#}"),
        }
    }
    Ok(())
}
