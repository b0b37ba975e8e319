use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::types::Date32Type;
use arrow_array::{Date32Array, RecordBatch, StringArray};
use arrow_schema::DataType;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::frame::{
    self, TIMESTAMP, from_micros, left_join, select, string_column, timestamp_column, with_column,
};
use crate::parquet_io::{read_batch_if_exists, remove_partition, write_batch};
use crate::paths::{DataKind, DataLayout};
use crate::tag::strip_marker;

pub const FACT_TABLE: &str = "fact_matches";

const FACT_COLUMNS: &[(&str, DataType)] = &[
    ("match_id", DataType::Utf8),
    ("battle_time", TIMESTAMP),
    ("battle_time_date", DataType::Date32),
    ("player_tag", DataType::Utf8),
    ("club_tag", DataType::Utf8),
    ("map_name", DataType::Utf8),
    ("battle_mode", DataType::Utf8),
    ("battle_result", DataType::Utf8),
];

pub fn empty_fact_batch() -> RecordBatch {
    RecordBatch::new_empty(frame::schema(FACT_COLUMNS))
}

/// `{tag without #}-{YYYYMMDD}-{map}` with spaces and hyphens in the map name
/// replaced by underscores. The date comes from the battle time, or from
/// `run_date` when the battle time is unknown.
///
/// Two battles by the same player on the same map and day share an id.
pub fn match_id(
    player_tag: &str,
    battle_time: Option<NaiveDateTime>,
    map_name: &str,
    run_date: NaiveDate,
) -> String {
    let day = battle_time.map(|ts| ts.date()).unwrap_or(run_date);
    let map = map_name.replace([' ', '-'], "_");
    format!("{}-{}-{map}", strip_marker(player_tag), day.format("%Y%m%d"))
}

/// Joins cleaned battles to cleaned players for the club tag and derives the
/// fact columns.
pub fn build_fact_batch(
    battles: &RecordBatch,
    players: &RecordBatch,
    run_date: NaiveDate,
) -> Result<RecordBatch> {
    let clubs = select(players, &["tag", "club_tag"])?;
    let joined = left_join(battles, &clubs, "player_tag", "tag", &["club_tag"])?;

    let times = timestamp_column(&joined, "battle_time")?
        .iter()
        .map(|ts| ts.and_then(from_micros))
        .collect::<Vec<_>>();
    let ids = string_column(&joined, "player_tag")?
        .iter()
        .zip(string_column(&joined, "map_name")?.iter())
        .zip(&times)
        .map(|((tag, map), ts)| {
            Some(match_id(
                tag.unwrap_or_default(),
                *ts,
                map.unwrap_or_default(),
                run_date,
            ))
        })
        .collect::<StringArray>();
    let days = times
        .iter()
        .map(|ts| ts.map(|ts| Date32Type::from_naive_date(ts.date())))
        .collect::<Date32Array>();

    let fact = with_column(&joined, "match_id", Arc::new(ids))?;
    let fact = with_column(&fact, "battle_time_date", Arc::new(days))?;
    let names = FACT_COLUMNS.iter().map(|(name, _)| *name).collect::<Vec<_>>();
    select(&fact, &names)
}

/// Loads the processed partitions for `date` and builds the fact table. A
/// missing input yields an empty batch.
pub fn build_fact_matches(layout: &DataLayout, date: NaiveDate) -> Result<RecordBatch> {
    let battles_path = layout.processed_path(DataKind::Battlelog, date);
    let players_path = layout.processed_path(DataKind::Player, date);

    let Some(battles) = read_batch_if_exists(&battles_path)? else {
        warn!(path = %battles_path.display(), "battle log data not found");
        return Ok(empty_fact_batch());
    };
    let Some(players) = read_batch_if_exists(&players_path)? else {
        warn!(path = %players_path.display(), "player data not found");
        return Ok(empty_fact_batch());
    };

    let fact = build_fact_batch(&battles, &players, date)
        .with_context(|| format!("build {FACT_TABLE} for {date}"))?;
    info!(rows = fact.num_rows(), "built {FACT_TABLE}");
    Ok(fact)
}

/// Builds and writes `cleaned/fact_matches/{date}/fact_matches.parquet`.
/// When there are no rows nothing is written and any partition from an
/// earlier run is removed.
pub fn process_fact_matches(layout: &DataLayout, date: NaiveDate) -> Result<Option<PathBuf>> {
    info!(%date, "processing {FACT_TABLE}");
    let fact = build_fact_matches(layout, date)?;
    let out = layout.cleaned_path(FACT_TABLE, date);
    if fact.num_rows() == 0 {
        warn!(%date, "no {FACT_TABLE} rows to save");
        if remove_partition(&out)? {
            info!(path = %out.display(), "removed stale {FACT_TABLE} partition");
        }
        return Ok(None);
    }
    write_batch(&out, &fact)?;
    info!(path = %out.display(), rows = fact.num_rows(), "saved {FACT_TABLE}");
    Ok(Some(out))
}
