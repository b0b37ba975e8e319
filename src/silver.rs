use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use arrow_array::{RecordBatch, TimestampMicrosecondArray};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::frame::{drop_columns, filter, micros, rename, string_column, with_column};
use crate::parquet_io::{read_batch_if_exists, write_batch};
use crate::paths::{DataKind, DataLayout};

/// Format of `battleTime` as the API sends it, e.g. `20250713T061819.000Z`.
pub const BATTLE_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.fZ";
const FALLBACK_TIME_FORMATS: &[&str] = &["%Y%m%dT%H%M%SZ", "%Y-%m-%dT%H:%M:%S%.fZ"];

const PLAYER_DROPPED: &[&str] = &["name_color", "best_robo_rumble_time", "best_time_as_big_brawler"];
const CLUB_DROPPED: &[&str] = &["badge_id"];
const CLUB_MEMBERS_DROPPED: &[&str] = &["name_color", "icon_id"];

pub fn parse_battle_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    std::iter::once(BATTLE_TIME_FORMAT)
        .chain(FALLBACK_TIME_FORMATS.iter().copied())
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn is_noise_battle(battle_type: Option<&str>, result: Option<&str>) -> bool {
    battle_type == Some("friendly") || result == Some("unknown")
}

/// The cleaning rules for one data kind, applied to an in-memory batch.
pub fn clean_batch(kind: DataKind, batch: &RecordBatch) -> Result<RecordBatch> {
    match kind {
        DataKind::Player => drop_columns(batch, PLAYER_DROPPED),
        DataKind::Battlelog => clean_battles(batch),
        DataKind::Club => drop_columns(batch, CLUB_DROPPED),
        DataKind::ClubMembers => drop_columns(batch, CLUB_MEMBERS_DROPPED),
    }
}

/// Drops noise battles, parses `battle_time` (unparseable values become
/// null) and renames `event_map` to `map_name`.
fn clean_battles(batch: &RecordBatch) -> Result<RecordBatch> {
    let keep = string_column(batch, "battle_type")?
        .iter()
        .zip(string_column(batch, "battle_result")?.iter())
        .map(|(battle_type, result)| !is_noise_battle(battle_type, result))
        .collect::<Vec<_>>();
    let kept = filter(batch, keep)?;

    let times = string_column(&kept, "battle_time")?
        .iter()
        .map(|raw| raw.and_then(parse_battle_time).map(micros))
        .collect::<TimestampMicrosecondArray>();
    let parsed = with_column(&kept, "battle_time", Arc::new(times))?;
    rename(&parsed, "event_map", "map_name")
}

/// Cleans the raw partition of `kind` for `date` into the processed layer.
/// Returns `None` when there is no raw partition to clean.
pub fn clean(layout: &DataLayout, kind: DataKind, date: NaiveDate) -> Result<Option<PathBuf>> {
    let input = layout.raw_path(kind, date);
    let Some(raw) = read_batch_if_exists(&input)? else {
        warn!(%kind, %date, path = %input.display(), "raw partition not found");
        return Ok(None);
    };

    let rows_in = raw.num_rows();
    let cleaned = clean_batch(kind, &raw).with_context(|| format!("clean {kind} for {date}"))?;
    let output = layout.processed_path(kind, date);
    write_batch(&output, &cleaned)?;
    info!(
        %kind,
        %date,
        rows_in,
        rows_out = cleaned.num_rows(),
        path = %output.display(),
        "wrote processed partition"
    );
    Ok(Some(output))
}

const PROCESSING_MODES: &[(&str, &[DataKind])] = &[
    ("player", &[DataKind::Player]),
    ("battlelog", &[DataKind::Battlelog]),
    ("club", &[DataKind::Club]),
    ("club_members", &[DataKind::ClubMembers]),
    ("all", &DataKind::ALL),
];

pub fn mode_kinds(mode: &str) -> Result<&'static [DataKind]> {
    PROCESSING_MODES
        .iter()
        .find(|(name, _)| *name == mode)
        .map(|(_, kinds)| *kinds)
        .ok_or_else(|| {
            let names = PROCESSING_MODES
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>();
            anyhow!("unknown processing mode {mode:?} (expected one of {})", names.join(", "))
        })
}

/// Cleans every kind the mode covers. One kind failing does not stop the
/// others; its error is logged and reported in the result.
pub fn run_mode(
    layout: &DataLayout,
    mode: &str,
    date: NaiveDate,
) -> Result<Vec<(DataKind, Result<Option<PathBuf>>)>> {
    let kinds = mode_kinds(mode)?;
    Ok(kinds
        .iter()
        .map(|&kind| {
            let result = clean(layout, kind, date);
            if let Err(err) = &result {
                warn!(%kind, %date, error = %format!("{err:#}"), "processing failed");
            }
            (kind, result)
        })
        .collect())
}
