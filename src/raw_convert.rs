use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use arrow_array::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::flatten::{self, flatten};
use crate::frame::concat;
use crate::parquet_io::write_batch;
use crate::paths::{DataKind, DataLayout};
use crate::tag::{Tag, parse_date_dir};

/// One ingested document found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub tag: Tag,
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Lists every `{tag}/{date}/{kind}.json` under the kind's ingested entity
/// directory, grouped by date with tags in sorted order.
pub fn discover(
    layout: &DataLayout,
    kind: DataKind,
) -> Result<BTreeMap<NaiveDate, Vec<SnapshotFile>>> {
    let entity_dir = layout.ingested_entity_dir(kind.entity());
    let mut by_date: BTreeMap<NaiveDate, Vec<SnapshotFile>> = BTreeMap::new();
    if !entity_dir.is_dir() {
        return Ok(by_date);
    }

    for tag_dir in sorted_subdirs(&entity_dir)? {
        let Some(name) = tag_dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let tag = match Tag::parse(kind.entity(), name) {
            Ok(tag) => tag,
            Err(err) => {
                warn!(dir = %tag_dir.display(), error = %err, "skipping directory with invalid tag");
                continue;
            }
        };
        for date_dir in sorted_subdirs(&tag_dir)? {
            let Some(date) = date_dir
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_date_dir)
            else {
                continue;
            };
            let path = date_dir.join(kind.json_file());
            if path.is_file() {
                by_date.entry(date).or_default().push(SnapshotFile {
                    tag: tag.clone(),
                    date,
                    path,
                });
            }
        }
    }
    Ok(by_date)
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn flatten_file(
    kind: DataKind,
    file: &SnapshotFile,
    extracted_at: NaiveDateTime,
) -> Result<RecordBatch> {
    let raw = fs::read_to_string(&file.path)
        .with_context(|| format!("read {}", file.path.display()))?;
    let doc: Value = serde_json::from_str(&raw)
        .with_context(|| format!("parse {}", file.path.display()))?;
    flatten(kind, &doc, &file.tag, extracted_at)
}

/// Rebuilds `raw/{entity}/{date}/{kind}.parquet` for every date that has
/// ingested documents (or just `only_date`). Each partition is the union of
/// all entities' rows for that date and replaces whatever was there. A
/// document that cannot be read or flattened is logged and left out.
pub fn convert(
    layout: &DataLayout,
    kind: DataKind,
    only_date: Option<NaiveDate>,
    extracted_at: NaiveDateTime,
) -> Result<BTreeSet<NaiveDate>> {
    let mut written = BTreeSet::new();
    for (date, files) in discover(layout, kind)? {
        if only_date.is_some_and(|d| d != date) {
            continue;
        }

        let mut parts = Vec::with_capacity(files.len());
        for file in &files {
            match flatten_file(kind, file, extracted_at) {
                Ok(batch) if batch.num_rows() == 0 => {
                    debug!(tag = %file.tag, %kind, %date, "document has no rows");
                }
                Ok(batch) => parts.push(batch),
                Err(err) => {
                    warn!(path = %file.path.display(), error = %format!("{err:#}"), "skipping unreadable document");
                }
            }
        }

        let batch = concat(&flatten::schema(kind), &parts)
            .with_context(|| format!("combine {kind} rows for {date}"))?;
        let out = layout.raw_path(kind, date);
        write_batch(&out, &batch).with_context(|| format!("write {}", out.display()))?;
        info!(%kind, %date, rows = batch.num_rows(), path = %out.display(), "wrote raw partition");
        written.insert(date);
    }

    if written.is_empty() {
        warn!(%kind, "no ingested documents to convert");
    }
    Ok(written)
}

/// Runs [`convert`] for every data kind. A kind that fails is logged and the
/// rest still run.
pub fn convert_all(
    layout: &DataLayout,
    only_date: Option<NaiveDate>,
    extracted_at: NaiveDateTime,
) -> BTreeMap<DataKind, Result<BTreeSet<NaiveDate>>> {
    DataKind::ALL
        .into_iter()
        .map(|kind| {
            let result = convert(layout, kind, only_date, extracted_at);
            if let Err(err) = &result {
                warn!(%kind, error = %format!("{err:#}"), "raw conversion failed");
            }
            (kind, result)
        })
        .collect()
}
