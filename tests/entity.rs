mod common;

use std::sync::Arc;

use arrow_array::{Int64Array, RecordBatch, StringArray};
use arrow_schema::DataType;
use chrono::NaiveDate;

use brawl_pipeline::entity::{DATE_COLUMN, Entity};
use brawl_pipeline::frame::{has_column, schema};
use brawl_pipeline::parquet_io::write_batch;
use brawl_pipeline::paths::{DataKind, DataLayout, date_partition};
use brawl_pipeline::raw_convert::convert_all;

use common::{CLUB, LONE_PLAYER, PLAYER, column_names, extracted_at, run_date, seed_ingested, strs};

fn raw_layout(root: &std::path::Path) -> DataLayout {
    let layout = DataLayout::new(root);
    seed_ingested(&layout);
    for (kind, result) in convert_all(&layout, None, extracted_at(9)) {
        result.unwrap_or_else(|err| panic!("raw {kind}: {err:#}"));
    }
    layout
}

#[test]
fn player_history_keeps_only_that_player() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = raw_layout(dir.path());

    let player = Entity::player(PLAYER).expect("valid tag");
    let history = player
        .load_history(&layout.raw_dir(), DataKind::Player, 7, run_date())
        .expect("loads");
    assert_eq!(history.num_rows(), 1);
    assert_eq!(strs(&history, "tag"), vec![Some(PLAYER.to_string())]);
    assert_eq!(strs(&history, DATE_COLUMN), vec![Some("2025-07-14".to_string())]);

    let battles = player
        .load_history(&layout.raw_dir(), DataKind::Battlelog, 7, run_date())
        .expect("loads");
    assert_eq!(battles.num_rows(), 4);
}

#[test]
fn history_window_skips_missing_days() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = raw_layout(dir.path());
    let later = NaiveDate::from_ymd_opt(2025, 7, 16).expect("valid date");

    let club = Entity::club(CLUB).expect("valid tag");
    let members = club
        .load_history(&layout.raw_dir(), DataKind::ClubMembers, 3, later)
        .expect("loads");
    assert_eq!(members.num_rows(), 2);
    assert!(strs(&members, DATE_COLUMN)
        .iter()
        .all(|d| d.as_deref() == Some("2025-07-14")));

    // Two days is not far enough back to reach the only partition.
    let short = club
        .load_history(&layout.raw_dir(), DataKind::ClubMembers, 2, later)
        .expect("loads");
    assert_eq!(short.num_rows(), 0);
}

#[test]
fn player_without_battles_gets_typed_empty_history() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = raw_layout(dir.path());

    let lone = Entity::player(LONE_PLAYER).expect("valid tag");
    let battles = lone
        .load_history(&layout.raw_dir(), DataKind::Battlelog, 7, run_date())
        .expect("loads");
    assert_eq!(battles.num_rows(), 0);
    assert!(has_column(&battles, "battle_mode"));

    let nothing = lone
        .load_history(&dir.path().join("missing"), DataKind::Player, 7, run_date())
        .expect("loads");
    assert_eq!(nothing.num_rows(), 0);
    let schema = nothing.schema();
    let date = schema.field_with_name(DATE_COLUMN).expect("date column");
    assert_eq!(date.data_type(), &DataType::Utf8);
}

#[test]
fn partition_without_owner_column_is_attributed_to_the_entity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = dir.path();
    let foreign = RecordBatch::try_new(
        schema(&[("name", DataType::Utf8), ("trophies", DataType::Int64)]),
        vec![
            Arc::new(StringArray::from(vec!["Tiny", "Tiny"])),
            Arc::new(Int64Array::from(vec![1200, 1250])),
        ],
    )
    .expect("valid batch");
    write_batch(&date_partition(base, DataKind::Player, run_date()), &foreign).expect("write");

    let player = Entity::player(PLAYER).expect("valid tag");
    let history = player
        .load_history(base, DataKind::Player, 1, run_date())
        .expect("loads");
    assert_eq!(column_names(&history), vec!["name", "trophies", "tag", DATE_COLUMN]);
    assert_eq!(strs(&history, "tag"), vec![Some(PLAYER.to_string()); 2]);
    assert_eq!(strs(&history, DATE_COLUMN), vec![Some("2025-07-14".to_string()); 2]);
}

#[test]
fn kind_must_match_entity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = DataLayout::new(dir.path());

    let club = Entity::club(CLUB).expect("valid tag");
    assert!(club
        .load_history(&layout.raw_dir(), DataKind::Battlelog, 7, run_date())
        .is_err());
    assert!(Entity::player("#bad").is_err());
}
