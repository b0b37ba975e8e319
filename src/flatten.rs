//! Snapshot document to flat rows, one fixed schema per data kind.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{
    ArrayRef, BooleanArray, Int64Array, RecordBatch, StringArray, TimestampMicrosecondArray,
};
use arrow_schema::{DataType, SchemaRef};
use chrono::NaiveDateTime;
use serde_json::Value;

use crate::frame::{self, TIMESTAMP, micros};
use crate::models::{BattleDetails, BattleLog, ClubMembers, ClubSnapshot, PlayerSnapshot, Snapshot};
use crate::paths::DataKind;
use crate::tag::{Tag, normalize_tag};

use DataType::{Boolean, Int64, Utf8};

const PLAYER_COLUMNS: &[(&str, DataType)] = &[
    ("tag", Utf8),
    ("name", Utf8),
    ("name_color", Utf8),
    ("trophies", Int64),
    ("highest_trophies", Int64),
    ("exp_level", Int64),
    ("exp_points", Int64),
    ("three_vs_three_victories", Int64),
    ("solo_victories", Int64),
    ("duo_victories", Int64),
    ("best_robo_rumble_time", Int64),
    ("best_time_as_big_brawler", Int64),
    ("club_name", Utf8),
    ("club_tag", Utf8),
    ("total_brawlers", Int64),
    ("maxed_brawlers", Int64),
    ("total_brawler_trophies", Int64),
    ("extracted_at", TIMESTAMP),
];

const BATTLELOG_COLUMNS: &[(&str, DataType)] = &[
    ("battle_time", Utf8),
    ("event_id", Int64),
    ("event_mode", Utf8),
    ("event_map", Utf8),
    ("battle_mode", Utf8),
    ("battle_type", Utf8),
    ("battle_result", Utf8),
    ("battle_rank", Int64),
    ("battle_duration", Int64),
    ("player_tag", Utf8),
    ("player_name", Utf8),
    ("brawler_name", Utf8),
    ("brawler_power", Int64),
    ("brawler_trophies", Int64),
    ("team_size", Int64),
    ("opponent_count", Int64),
    ("is_star_player", Boolean),
    ("extracted_at", TIMESTAMP),
];

const CLUB_COLUMNS: &[(&str, DataType)] = &[
    ("tag", Utf8),
    ("name", Utf8),
    ("description", Utf8),
    ("type", Utf8),
    ("badge_id", Int64),
    ("required_trophies", Int64),
    ("trophies", Int64),
    ("member_count", Int64),
    ("extracted_at", TIMESTAMP),
];

const CLUB_MEMBER_COLUMNS: &[(&str, DataType)] = &[
    ("club_tag", Utf8),
    ("tag", Utf8),
    ("name", Utf8),
    ("name_color", Utf8),
    ("role", Utf8),
    ("trophies", Int64),
    ("icon_id", Int64),
    ("extracted_at", TIMESTAMP),
];

pub fn columns(kind: DataKind) -> &'static [(&'static str, DataType)] {
    match kind {
        DataKind::Player => PLAYER_COLUMNS,
        DataKind::Battlelog => BATTLELOG_COLUMNS,
        DataKind::Club => CLUB_COLUMNS,
        DataKind::ClubMembers => CLUB_MEMBER_COLUMNS,
    }
}

pub fn schema(kind: DataKind) -> SchemaRef {
    frame::schema(columns(kind))
}

/// Empty batch with the flattened schema of `kind`.
pub fn empty_batch(kind: DataKind) -> RecordBatch {
    RecordBatch::new_empty(schema(kind))
}

/// Flattens one document owned by `owner`. Battle logs yield one row per
/// battle and member lists one row per member; an empty list yields no rows.
pub fn flatten(
    kind: DataKind,
    doc: &Value,
    owner: &Tag,
    extracted_at: NaiveDateTime,
) -> Result<RecordBatch> {
    let at = micros(extracted_at);
    let columns = match kind {
        DataKind::Player => player_columns(&PlayerSnapshot::from_value(doc)?, at),
        DataKind::Battlelog => battle_columns(&BattleLog::from_value(doc)?, owner, at),
        DataKind::Club => club_columns(&ClubSnapshot::from_value(doc)?, at),
        DataKind::ClubMembers => member_columns(&ClubMembers::from_value(doc)?, owner, at),
    };
    RecordBatch::try_new(schema(kind), columns)
        .with_context(|| format!("flatten {kind} for {owner}"))
}

fn extracted_column(at: i64, len: usize) -> ArrayRef {
    Arc::new(TimestampMicrosecondArray::from(vec![at; len]))
}

fn player_columns(p: &PlayerSnapshot, at: i64) -> Vec<ArrayRef> {
    let club = p.club.clone().unwrap_or_default();
    vec![
        Arc::new(StringArray::from(vec![p.tag.as_str()])),
        Arc::new(StringArray::from(vec![p.name.as_str()])),
        Arc::new(StringArray::from(vec![p.name_color.as_deref()])),
        Arc::new(Int64Array::from(vec![p.trophies])),
        Arc::new(Int64Array::from(vec![p.highest_trophies])),
        Arc::new(Int64Array::from(vec![p.exp_level])),
        Arc::new(Int64Array::from(vec![p.exp_points])),
        Arc::new(Int64Array::from(vec![p.three_vs_three_victories])),
        Arc::new(Int64Array::from(vec![p.solo_victories])),
        Arc::new(Int64Array::from(vec![p.duo_victories])),
        Arc::new(Int64Array::from(vec![p.best_robo_rumble_time])),
        Arc::new(Int64Array::from(vec![p.best_time_as_big_brawler])),
        Arc::new(StringArray::from(vec![club.name])),
        Arc::new(StringArray::from(vec![club.tag])),
        Arc::new(Int64Array::from(vec![p.brawlers.len() as i64])),
        Arc::new(Int64Array::from(vec![p.maxed_brawlers()])),
        Arc::new(Int64Array::from(vec![p.total_brawler_trophies()])),
        extracted_column(at, 1),
    ]
}

/// Where the owner sat in one battle.
#[derive(Default)]
struct Seat {
    name: Option<String>,
    brawler_name: Option<String>,
    brawler_power: Option<i64>,
    brawler_trophies: Option<i64>,
    team_size: i64,
    opponent_count: i64,
}

fn find_seat(battle: &BattleDetails, owner: &str) -> Seat {
    let is_owner = |tag: &str| normalize_tag(tag) == owner;

    let mut seat = Seat {
        opponent_count: battle.participants().count() as i64,
        ..Seat::default()
    };

    let found = battle
        .teams
        .iter()
        .flatten()
        .find_map(|team| {
            team.iter()
                .find(|p| is_owner(&p.tag))
                .map(|p| (p, team.len() as i64))
        })
        .or_else(|| {
            battle
                .players
                .iter()
                .flatten()
                .find(|p| is_owner(&p.tag))
                .map(|p| (p, 1))
        });

    if let Some((player, team_size)) = found {
        seat.name = Some(player.name.clone());
        if let Some(b) = &player.brawler {
            seat.brawler_name = Some(b.name.clone());
            seat.brawler_power = Some(b.power);
            seat.brawler_trophies = Some(b.trophies);
        }
        seat.team_size = team_size;
        seat.opponent_count -= team_size;
    }
    seat
}

fn battle_columns(log: &BattleLog, owner: &Tag, at: i64) -> Vec<ArrayRef> {
    let battles = &log.items;
    let seats = battles
        .iter()
        .map(|item| find_seat(&item.battle, owner.as_str()))
        .collect::<Vec<_>>();
    let is_star = battles
        .iter()
        .map(|item| {
            Some(
                item.battle
                    .star_player
                    .as_ref()
                    .is_some_and(|s| normalize_tag(&s.tag) == owner.as_str()),
            )
        })
        .collect::<BooleanArray>();

    vec![
        Arc::new(battles.iter().map(|b| Some(b.battle_time.as_str())).collect::<StringArray>()),
        Arc::new(battles.iter().map(|b| b.event.id).collect::<Int64Array>()),
        Arc::new(battles.iter().map(|b| b.event.mode.as_deref()).collect::<StringArray>()),
        Arc::new(battles.iter().map(|b| b.event.map.as_deref()).collect::<StringArray>()),
        Arc::new(battles.iter().map(|b| b.battle.mode.as_deref()).collect::<StringArray>()),
        Arc::new(battles.iter().map(|b| b.battle.battle_type.as_deref()).collect::<StringArray>()),
        Arc::new(battles.iter().map(|b| b.battle.result.as_deref()).collect::<StringArray>()),
        Arc::new(battles.iter().map(|b| b.battle.rank).collect::<Int64Array>()),
        Arc::new(battles.iter().map(|b| b.battle.duration).collect::<Int64Array>()),
        frame::repeat_str(owner.as_str(), battles.len()),
        Arc::new(seats.iter().map(|s| s.name.as_deref()).collect::<StringArray>()),
        Arc::new(seats.iter().map(|s| s.brawler_name.as_deref()).collect::<StringArray>()),
        Arc::new(seats.iter().map(|s| s.brawler_power).collect::<Int64Array>()),
        Arc::new(seats.iter().map(|s| s.brawler_trophies).collect::<Int64Array>()),
        Arc::new(seats.iter().map(|s| Some(s.team_size)).collect::<Int64Array>()),
        Arc::new(seats.iter().map(|s| Some(s.opponent_count)).collect::<Int64Array>()),
        Arc::new(is_star),
        extracted_column(at, battles.len()),
    ]
}

fn club_columns(c: &ClubSnapshot, at: i64) -> Vec<ArrayRef> {
    vec![
        Arc::new(StringArray::from(vec![c.tag.as_str()])),
        Arc::new(StringArray::from(vec![c.name.as_str()])),
        Arc::new(StringArray::from(vec![c.description.as_deref()])),
        Arc::new(StringArray::from(vec![c.club_type.as_str()])),
        Arc::new(Int64Array::from(vec![c.badge_id])),
        Arc::new(Int64Array::from(vec![c.required_trophies])),
        Arc::new(Int64Array::from(vec![c.trophies])),
        Arc::new(Int64Array::from(vec![c.members.len() as i64])),
        extracted_column(at, 1),
    ]
}

fn member_columns(members: &ClubMembers, owner: &Tag, at: i64) -> Vec<ArrayRef> {
    let items = &members.items;
    vec![
        frame::repeat_str(owner.as_str(), items.len()),
        Arc::new(items.iter().map(|m| Some(m.tag.as_str())).collect::<StringArray>()),
        Arc::new(items.iter().map(|m| Some(m.name.as_str())).collect::<StringArray>()),
        Arc::new(items.iter().map(|m| m.name_color.as_deref()).collect::<StringArray>()),
        Arc::new(items.iter().map(|m| Some(m.role.as_str())).collect::<StringArray>()),
        Arc::new(items.iter().map(|m| Some(m.trophies)).collect::<Int64Array>()),
        Arc::new(items.iter().map(|m| Some(m.icon.id)).collect::<Int64Array>()),
        extracted_column(at, items.len()),
    ]
}
