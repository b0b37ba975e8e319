use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::api_client::SnapshotSource;
use crate::models::{BattleLog, ClubMembers, Snapshot, validate};
use crate::paths::{DataKind, DataLayout};
use crate::tag::{Tag, TagKind};

pub const DEFAULT_MEMBER_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl IngestSummary {
    pub fn success() -> Self {
        Self {
            total: 1,
            successful: 1,
            ..Self::default()
        }
    }

    pub fn failure(label: &str, err: &anyhow::Error) -> Self {
        Self {
            total: 1,
            failed: 1,
            errors: vec![format!("{label}: {err:#}")],
            ..Self::default()
        }
    }

    pub fn merge(&mut self, other: IngestSummary) {
        self.total += other.total;
        self.successful += other.successful;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }
}

/// Everything a runner needs besides the tag it was asked to ingest.
pub struct IngestContext<'a> {
    pub source: &'a dyn SnapshotSource,
    pub layout: &'a DataLayout,
    pub date: NaiveDate,
    pub delay: Duration,
}

/// Sleeps for `delay` after item `index` of `len`, except after the last one.
/// Every loop that issues rate-limited calls per entity goes through here.
pub fn pause_between(delay: Duration, index: usize, len: usize) {
    if index + 1 < len && !delay.is_zero() {
        thread::sleep(delay);
    }
}

/// Writes one snapshot document, replacing any earlier one for the same
/// entity, kind and date.
pub fn save_snapshot(
    layout: &DataLayout,
    kind: DataKind,
    tag: &Tag,
    date: NaiveDate,
    doc: &Value,
) -> Result<PathBuf> {
    let path = layout.snapshot_path(kind, tag, date);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(doc).context("serialize snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("swap {}", path.display()))?;
    Ok(path)
}

/// Fetches and validates one document. Fetch errors always propagate; an
/// invalid or empty battle log is replaced by an explicit empty log.
pub fn fetch_snapshot(source: &dyn SnapshotSource, kind: DataKind, tag: &Tag) -> Result<Value> {
    let doc = source
        .fetch(kind, tag)
        .with_context(|| format!("fetch {kind} for {tag}"))?;

    if kind == DataKind::Battlelog {
        return Ok(match BattleLog::from_value(&doc) {
            Ok(log) if log.items.is_empty() => {
                warn!(%tag, "battle log is empty, storing an empty record");
                BattleLog::empty_document()
            }
            Ok(_) => doc,
            Err(err) => {
                warn!(%tag, error = %err, "battle log failed validation, storing an empty record");
                BattleLog::empty_document()
            }
        });
    }

    validate(kind, &doc).with_context(|| format!("validate {kind} for {tag}"))?;
    Ok(doc)
}

fn ingest_kind(ctx: &IngestContext<'_>, kind: DataKind, tag: &Tag) -> Result<Value> {
    let doc = fetch_snapshot(ctx.source, kind, tag)?;
    let path = save_snapshot(ctx.layout, kind, tag, ctx.date, &doc)?;
    info!(%tag, %kind, path = %path.display(), "saved snapshot");
    Ok(doc)
}

/// Player profile plus battle log.
pub fn ingest_player(ctx: &IngestContext<'_>, tag: &Tag) -> Result<()> {
    ingest_kind(ctx, DataKind::Player, tag)?;
    ingest_kind(ctx, DataKind::Battlelog, tag)?;
    Ok(())
}

/// Club profile plus member list. Returns the raw member tags in list order.
pub fn ingest_club(ctx: &IngestContext<'_>, tag: &Tag) -> Result<Vec<String>> {
    ingest_kind(ctx, DataKind::Club, tag)?;
    let members = ingest_kind(ctx, DataKind::ClubMembers, tag)?;
    let members = ClubMembers::from_value(&members)?;
    Ok(members.items.into_iter().map(|m| m.tag).collect())
}

/// Club, members, then every member's profile and battle log. A failing
/// member is tallied and the loop moves on; the club itself failing aborts.
pub fn ingest_club_with_members(ctx: &IngestContext<'_>, tag: &Tag) -> Result<IngestSummary> {
    let member_tags = ingest_club(ctx, tag)?;
    info!(club = %tag, members = member_tags.len(), "ingesting club members");

    let mut summary = IngestSummary {
        total: member_tags.len(),
        ..IngestSummary::default()
    };
    for (i, raw) in member_tags.iter().enumerate() {
        info!(member = %raw, "member {}/{}", i + 1, member_tags.len());
        let result = Tag::player(raw)
            .map_err(anyhow::Error::from)
            .and_then(|member| ingest_player(ctx, &member));
        match result {
            Ok(()) => summary.successful += 1,
            Err(err) => {
                error!(member = %raw, error = %format!("{err:#}"), "member ingest failed");
                summary.failed += 1;
                summary.errors.push(format!("{raw}: {err:#}"));
            }
        }
        pause_between(ctx.delay, i, member_tags.len());
    }
    Ok(summary)
}

/// One ingestion mode. Runners never fail outright: entity failures are
/// reported through the summary.
pub trait IngestRunner {
    fn tag_kind(&self) -> TagKind;
    fn run(&self, ctx: &IngestContext<'_>, tag: &Tag) -> IngestSummary;
}

pub struct PlayerRunner;
pub struct ClubRunner;
pub struct ClubWithMembersRunner;

impl IngestRunner for PlayerRunner {
    fn tag_kind(&self) -> TagKind {
        TagKind::Player
    }

    fn run(&self, ctx: &IngestContext<'_>, tag: &Tag) -> IngestSummary {
        info!(%tag, "ingesting player");
        match ingest_player(ctx, tag) {
            Ok(()) => IngestSummary::success(),
            Err(err) => {
                error!(%tag, error = %format!("{err:#}"), "player ingest failed");
                IngestSummary::failure(tag.as_str(), &err)
            }
        }
    }
}

impl IngestRunner for ClubRunner {
    fn tag_kind(&self) -> TagKind {
        TagKind::Club
    }

    fn run(&self, ctx: &IngestContext<'_>, tag: &Tag) -> IngestSummary {
        info!(%tag, "ingesting club");
        match ingest_club(ctx, tag) {
            Ok(members) => {
                info!(%tag, members = members.len(), "club ingested");
                IngestSummary::success()
            }
            Err(err) => {
                error!(%tag, error = %format!("{err:#}"), "club ingest failed");
                IngestSummary::failure(tag.as_str(), &err)
            }
        }
    }
}

impl IngestRunner for ClubWithMembersRunner {
    fn tag_kind(&self) -> TagKind {
        TagKind::Club
    }

    fn run(&self, ctx: &IngestContext<'_>, tag: &Tag) -> IngestSummary {
        info!(%tag, "ingesting club with members");
        match ingest_club_with_members(ctx, tag) {
            Ok(summary) => summary,
            Err(err) => {
                error!(%tag, error = %format!("{err:#}"), "club ingest failed");
                IngestSummary::failure(tag.as_str(), &err)
            }
        }
    }
}

type RunnerCtor = fn() -> Box<dyn IngestRunner>;

const RUNNERS: &[(&str, RunnerCtor)] = &[
    ("player", || Box::new(PlayerRunner)),
    ("club", || Box::new(ClubRunner)),
    ("club-players", || Box::new(ClubWithMembersRunner)),
];

pub fn mode_names() -> Vec<&'static str> {
    RUNNERS.iter().map(|(name, _)| *name).collect()
}

pub fn runner_for(mode: &str) -> Result<Box<dyn IngestRunner>> {
    RUNNERS
        .iter()
        .find(|(name, _)| *name == mode)
        .map(|(_, ctor)| ctor())
        .ok_or_else(|| {
            anyhow!(
                "unknown ingest mode {mode:?} (expected one of {})",
                mode_names().join(", ")
            )
        })
}

/// Runs `runner` over every raw tag, folding the per-tag summaries and
/// waiting `ctx.delay` between tags. Tags that fail validation are counted
/// as failures and make no calls, so no wait follows them.
pub fn run_batch(
    runner: &dyn IngestRunner,
    ctx: &IngestContext<'_>,
    raw_tags: &[String],
) -> IngestSummary {
    let mut total = IngestSummary::default();
    for (i, raw) in raw_tags.iter().enumerate() {
        let summary = match Tag::parse(runner.tag_kind(), raw) {
            Ok(tag) => {
                let summary = runner.run(ctx, &tag);
                pause_between(ctx.delay, i, raw_tags.len());
                summary
            }
            Err(err) => {
                warn!(tag = %raw, error = %err, "skipping invalid tag");
                IngestSummary::failure(raw, &anyhow::Error::from(err))
            }
        };
        total.merge(summary);
    }
    total
}
