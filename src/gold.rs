use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::dimensions::all_dimensions;
use crate::fact_matches::{FACT_TABLE, process_fact_matches};
use crate::paths::DataLayout;

#[derive(Debug, Default)]
pub struct GoldSummary {
    /// Tables written, by name.
    pub written: Vec<(String, PathBuf)>,
    /// Tables skipped because there was nothing to build from.
    pub skipped: Vec<String>,
    pub errors: Vec<String>,
}

impl GoldSummary {
    fn record(&mut self, name: &str, result: anyhow::Result<Option<PathBuf>>) {
        match result {
            Ok(Some(path)) => self.written.push((name.to_string(), path)),
            Ok(None) => self.skipped.push(name.to_string()),
            Err(err) => {
                error!(table = name, error = %format!("{err:#}"), "gold table failed");
                self.errors.push(format!("{name}: {err:#}"));
            }
        }
    }
}

/// Builds the fact table, then every dimension. A failing table is logged
/// and recorded; the others still run.
pub fn process_gold_layer(layout: &DataLayout, date: NaiveDate) -> GoldSummary {
    info!(%date, "processing gold layer");
    let mut summary = GoldSummary::default();

    summary.record(FACT_TABLE, process_fact_matches(layout, date));
    for dim in all_dimensions() {
        let result = dim.process(layout, date);
        summary.record(dim.name(), result);
    }

    info!(
        written = summary.written.len(),
        skipped = summary.skipped.len(),
        failed = summary.errors.len(),
        "gold layer complete"
    );
    summary
}
