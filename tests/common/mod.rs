#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use arrow_array::{Array, RecordBatch};
use arrow_array::cast::AsArray;
use arrow_array::types::{Date32Type, Int64Type};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use brawl_pipeline::api_client::SnapshotSource;
use brawl_pipeline::frame;
use brawl_pipeline::ingest::save_snapshot;
use brawl_pipeline::paths::{DataKind, DataLayout};
use brawl_pipeline::tag::Tag;

pub const PLAYER: &str = "#PC0PPLRU";
pub const LONE_PLAYER: &str = "#QQQQQQQQ";
pub const CLUB: &str = "#2YGRLQ9P";

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

pub fn fixture_json(name: &str) -> Value {
    serde_json::from_str(&read_fixture(name)).expect("fixture should be valid json")
}

pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 14).expect("valid date")
}

pub fn extracted_at(hour: u32) -> NaiveDateTime {
    run_date().and_hms_opt(hour, 0, 0).expect("valid time")
}

/// Serves canned documents; anything not registered is a fetch error.
/// Every request is recorded, served or not.
#[derive(Default)]
pub struct FixtureSource {
    docs: HashMap<(DataKind, String), Value>,
    requests: RefCell<Vec<(DataKind, String)>>,
}

impl FixtureSource {
    pub fn with(mut self, kind: DataKind, tag: &str, doc: Value) -> Self {
        self.docs.insert((kind, tag.to_string()), doc);
        self
    }

    /// Both players, their battle logs (the lone player has an empty one)
    /// and the club with its members.
    pub fn standard() -> Self {
        Self::default()
            .with(DataKind::Player, PLAYER, fixture_json("player.json"))
            .with(DataKind::Battlelog, PLAYER, fixture_json("battlelog.json"))
            .with(DataKind::Player, LONE_PLAYER, fixture_json("player_no_club.json"))
            .with(DataKind::Battlelog, LONE_PLAYER, serde_json::json!({"items": []}))
            .with(DataKind::Club, CLUB, fixture_json("club.json"))
            .with(DataKind::ClubMembers, CLUB, fixture_json("club_members.json"))
    }

    /// How many times `kind` was requested for `tag`.
    pub fn requests(&self, kind: DataKind, tag: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|(k, t)| *k == kind && t == tag)
            .count()
    }
}

impl SnapshotSource for FixtureSource {
    fn fetch(&self, kind: DataKind, tag: &Tag) -> Result<Value> {
        self.requests
            .borrow_mut()
            .push((kind, tag.as_str().to_string()));
        self.docs
            .get(&(kind, tag.as_str().to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("http 404 Not Found for {kind} {tag}"))
    }
}

/// Writes the standard documents straight into the ingested layer for
/// `run_date()`, as if both players and the club had just been ingested.
pub fn seed_ingested(layout: &DataLayout) {
    let source = FixtureSource::standard();
    for ((kind, raw), doc) in &source.docs {
        let tag = Tag::parse(kind.entity(), raw).expect("fixture tag is valid");
        save_snapshot(layout, *kind, &tag, run_date(), doc).expect("snapshot saved");
    }
}

pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    frame::column_names(batch)
}

pub fn strs(batch: &RecordBatch, name: &str) -> Vec<Option<String>> {
    frame::string_column(batch, name)
        .expect("utf8 column")
        .iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

pub fn str_at(batch: &RecordBatch, name: &str, row: usize) -> Option<String> {
    strs(batch, name).swap_remove(row)
}

pub fn ints(batch: &RecordBatch, name: &str) -> Vec<Option<i64>> {
    frame::column(batch, name)
        .expect("column present")
        .as_primitive::<Int64Type>()
        .iter()
        .collect()
}

pub fn bools(batch: &RecordBatch, name: &str) -> Vec<Option<bool>> {
    frame::column(batch, name)
        .expect("column present")
        .as_boolean()
        .iter()
        .collect()
}

pub fn timestamps(batch: &RecordBatch, name: &str) -> Vec<Option<NaiveDateTime>> {
    let col = frame::timestamp_column(batch, name).expect("timestamp column");
    (0..col.len())
        .map(|i| col.value_as_datetime(i).filter(|_| col.is_valid(i)))
        .collect()
}

pub fn dates(batch: &RecordBatch, name: &str) -> Vec<Option<NaiveDate>> {
    let col = frame::column(batch, name)
        .expect("column present")
        .as_primitive::<Date32Type>();
    (0..col.len())
        .map(|i| col.value_as_date(i).filter(|_| col.is_valid(i)))
        .collect()
}
