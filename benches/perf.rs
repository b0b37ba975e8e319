use arrow_array::RecordBatch;
use chrono::NaiveDate;
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::Value;
use std::hint::black_box;

use brawl_pipeline::fact_matches::build_fact_batch;
use brawl_pipeline::flatten::flatten;
use brawl_pipeline::models::{BattleLog, PlayerSnapshot, Snapshot};
use brawl_pipeline::paths::DataKind;
use brawl_pipeline::silver::clean_batch;
use brawl_pipeline::tag::Tag;

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 14).unwrap()
}

fn owner() -> Tag {
    Tag::player("#PC0PPLRU").unwrap()
}

/// The fixture battle log repeated until it holds `copies * 4` battles.
fn large_battle_log(copies: usize) -> Value {
    let doc: Value = serde_json::from_str(BATTLELOG_JSON).unwrap();
    let items = doc["items"].as_array().cloned().unwrap_or_default();
    let repeated = std::iter::repeat_n(items, copies).flatten().collect::<Vec<_>>();
    serde_json::json!({ "items": repeated })
}

fn bench_snapshot_validate(c: &mut Criterion) {
    let player: Value = serde_json::from_str(PLAYER_JSON).unwrap();
    let battles: Value = serde_json::from_str(BATTLELOG_JSON).unwrap();
    c.bench_function("snapshot_validate", |b| {
        b.iter(|| {
            let p = PlayerSnapshot::from_value(black_box(&player)).unwrap();
            let log = BattleLog::from_value(black_box(&battles)).unwrap();
            black_box((p.brawlers.len(), log.items.len()));
        })
    });
}

fn bench_battlelog_flatten(c: &mut Criterion) {
    let doc = large_battle_log(25);
    let owner = owner();
    let at = run_date().and_hms_opt(9, 0, 0).unwrap();
    c.bench_function("battlelog_flatten", |b| {
        b.iter(|| {
            let batch = flatten(DataKind::Battlelog, black_box(&doc), &owner, at).unwrap();
            black_box(batch.num_rows());
        })
    });
}

fn bench_fact_build(c: &mut Criterion) {
    let owner = owner();
    let at = run_date().and_hms_opt(9, 0, 0).unwrap();
    let raw = flatten(DataKind::Battlelog, &large_battle_log(25), &owner, at).unwrap();
    let battles = clean_batch(DataKind::Battlelog, &raw).unwrap();
    let player_doc: Value = serde_json::from_str(PLAYER_JSON).unwrap();
    let players: RecordBatch = clean_batch(
        DataKind::Player,
        &flatten(DataKind::Player, &player_doc, &owner, at).unwrap(),
    )
    .unwrap();

    c.bench_function("fact_build", |b| {
        b.iter(|| {
            let fact = build_fact_batch(black_box(&battles), &players, run_date()).unwrap();
            black_box(fact.num_rows());
        })
    });
}

criterion_group!(
    perf,
    bench_snapshot_validate,
    bench_battlelog_flatten,
    bench_fact_build
);
criterion_main!(perf);

static PLAYER_JSON: &str = include_str!("../tests/fixtures/player.json");
static BATTLELOG_JSON: &str = include_str!("../tests/fixtures/battlelog.json");
