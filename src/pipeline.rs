use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{error, info, warn};

use crate::api_client::SnapshotSource;
use crate::config::PipelineConfig;
use crate::gold::{GoldSummary, process_gold_layer};
use crate::ingest::{
    IngestContext, IngestSummary, PlayerRunner, ingest_club, pause_between, run_batch,
};
use crate::paths::{DataKind, DataLayout};
use crate::raw_convert::convert_all;
use crate::silver;
use crate::tag::{Tag, normalize_tag};

#[derive(Debug, Default)]
pub struct PipelineReport {
    pub players: IngestSummary,
    pub clubs: IngestSummary,
    pub raw: BTreeMap<DataKind, usize>,
    pub processed: Vec<DataKind>,
    pub gold: GoldSummary,
}

/// Config player tags followed by `member_tags`, each tag once.
pub fn collect_player_tags(config: &PipelineConfig, member_tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    config
        .default_player_tags
        .iter()
        .chain(member_tags)
        .map(|raw| normalize_tag(raw.trim()))
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// Ingests every configured club (profile and member list) and returns the
/// tally with the member tags of every club that succeeded. A failed club
/// contributes no members.
fn ingest_clubs(ctx: &IngestContext<'_>, club_tags: &[String]) -> (IngestSummary, Vec<String>) {
    let mut summary = IngestSummary::default();
    let mut members = Vec::new();
    for (i, raw) in club_tags.iter().enumerate() {
        let result = Tag::club(raw)
            .map_err(anyhow::Error::from)
            .and_then(|club| ingest_club(ctx, &club));
        match result {
            Ok(tags) => {
                info!(club = %raw, members = tags.len(), "club ingested");
                summary.merge(IngestSummary::success());
                members.extend(tags);
            }
            Err(err) => {
                error!(club = %raw, error = %format!("{err:#}"), "club ingest failed");
                summary.merge(IngestSummary::failure(raw, &err));
            }
        }
        pause_between(ctx.delay, i, club_tags.len());
    }
    (summary, members)
}

/// Ingests every club and player for `date`, then rebuilds that date's raw,
/// processed and cleaned partitions. Clubs go first so their member lists,
/// fetched once, extend the player batch.
pub fn run_unified(
    source: &dyn SnapshotSource,
    layout: &DataLayout,
    config: &PipelineConfig,
    date: NaiveDate,
    delay: Duration,
    extracted_at: NaiveDateTime,
) -> Result<PipelineReport> {
    let ctx = IngestContext {
        source,
        layout,
        date,
        delay,
    };
    let mut report = PipelineReport::default();

    let (clubs, member_tags) = ingest_clubs(&ctx, &config.default_club_tags);
    report.clubs = clubs;
    let player_tags = collect_player_tags(config, &member_tags);
    info!(players = player_tags.len(), "ingesting players");
    report.players = run_batch(&PlayerRunner, &ctx, &player_tags);

    for (kind, result) in convert_all(layout, Some(date), extracted_at) {
        let dates: BTreeSet<NaiveDate> = result.unwrap_or_else(|err| {
            warn!(%kind, error = %format!("{err:#}"), "raw conversion failed");
            BTreeSet::new()
        });
        report.raw.insert(kind, dates.len());
    }

    for (kind, result) in silver::run_mode(layout, "all", date)? {
        if let Ok(Some(_)) = result {
            report.processed.push(kind);
        }
    }

    report.gold = process_gold_layer(layout, date);
    Ok(report)
}
