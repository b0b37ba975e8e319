mod common;

use std::sync::Arc;

use arrow_array::{RecordBatch, StringArray};
use brawl_pipeline::flatten::flatten;
use brawl_pipeline::frame::{TIMESTAMP, has_column, with_column};
use brawl_pipeline::parquet_io::{read_batch, write_batch};
use brawl_pipeline::paths::{DataKind, DataLayout};
use brawl_pipeline::silver::{clean, clean_batch, run_mode};
use brawl_pipeline::tag::Tag;

use common::{
    CLUB, PLAYER, column_names, extracted_at, fixture_json, run_date, str_at, strs, timestamps,
};

fn raw_battles() -> RecordBatch {
    let owner = Tag::player(PLAYER).expect("valid tag");
    flatten(
        DataKind::Battlelog,
        &fixture_json("battlelog.json"),
        &owner,
        extracted_at(9),
    )
    .expect("fixture flattens")
}

#[test]
fn battlelog_drops_friendlies_and_unknown_results() {
    let cleaned = clean_batch(DataKind::Battlelog, &raw_battles()).expect("cleans");
    let modes = strs(&cleaned, "battle_mode").into_iter().flatten().collect::<Vec<_>>();
    assert_eq!(modes, vec!["brawlBall", "soloShowdown"]);
    assert!(strs(&cleaned, "battle_type")
        .iter()
        .all(|t| t.as_deref() != Some("friendly")));
    assert!(strs(&cleaned, "battle_result")
        .iter()
        .all(|r| r.as_deref() != Some("unknown")));
}

#[test]
fn battlelog_parses_time_and_renames_map() {
    let cleaned = clean_batch(DataKind::Battlelog, &raw_battles()).expect("cleans");
    let schema = cleaned.schema();
    let battle_time = schema.field_with_name("battle_time").expect("column");
    assert_eq!(battle_time.data_type(), &TIMESTAMP);
    assert!(!has_column(&cleaned, "event_map"));

    assert_eq!(str_at(&cleaned, "map_name", 0).as_deref(), Some("Center Stage"));
    let expected = run_date().and_hms_opt(6, 18, 19).expect("valid time");
    assert_eq!(timestamps(&cleaned, "battle_time")[0], Some(expected));
}

#[test]
fn unparseable_battle_time_becomes_null() {
    let raw = raw_battles();
    let garbage = StringArray::from(vec!["not a time"; raw.num_rows()]);
    let raw = with_column(&raw, "battle_time", Arc::new(garbage)).expect("column replaced");
    let cleaned = clean_batch(DataKind::Battlelog, &raw).expect("cleans");
    assert!(cleaned.num_rows() > 0);
    assert!(timestamps(&cleaned, "battle_time").iter().all(Option::is_none));
}

#[test]
fn entity_tables_drop_noise_columns() {
    let owner = Tag::player(PLAYER).expect("valid tag");
    let player = flatten(DataKind::Player, &fixture_json("player.json"), &owner, extracted_at(9))
        .expect("flattens");
    let cleaned = clean_batch(DataKind::Player, &player).expect("cleans");
    for gone in ["name_color", "best_robo_rumble_time", "best_time_as_big_brawler"] {
        assert!(!has_column(&cleaned, gone), "{gone}");
    }
    assert!(has_column(&cleaned, "club_tag"));

    let club = Tag::club(CLUB).expect("valid tag");
    let members = flatten(
        DataKind::ClubMembers,
        &fixture_json("club_members.json"),
        &club,
        extracted_at(9),
    )
    .expect("flattens");
    let cleaned = clean_batch(DataKind::ClubMembers, &members).expect("cleans");
    assert_eq!(
        column_names(&cleaned),
        vec!["club_tag", "tag", "name", "role", "trophies", "extracted_at"]
    );

    let club_row = flatten(DataKind::Club, &fixture_json("club.json"), &club, extracted_at(9))
        .expect("flattens");
    let cleaned = clean_batch(DataKind::Club, &club_row).expect("cleans");
    assert!(!has_column(&cleaned, "badge_id"));
}

#[test]
fn clean_writes_processed_partition() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = DataLayout::new(dir.path());
    write_batch(&layout.raw_path(DataKind::Battlelog, run_date()), &raw_battles()).expect("seed");

    let out = clean(&layout, DataKind::Battlelog, run_date())
        .expect("cleans")
        .expect("partition written");
    assert_eq!(out, layout.processed_path(DataKind::Battlelog, run_date()));
    assert_eq!(read_batch(&out).expect("read").num_rows(), 2);
}

#[test]
fn missing_raw_partition_is_not_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let layout = DataLayout::new(dir.path());
    assert_eq!(clean(&layout, DataKind::Club, run_date()).expect("no error"), None);

    let results = run_mode(&layout, "all", run_date()).expect("known mode");
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|(_, r)| matches!(r, Ok(None))));
    assert!(run_mode(&layout, "dims", run_date()).is_err());
}
