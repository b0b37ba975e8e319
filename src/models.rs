//! Typed views of the four snapshot documents the API returns.
//!
//! Unknown fields are ignored here; the ingestion stage persists the
//! document exactly as received, so these types only decide whether a
//! document is acceptable and give the flattener something typed to read.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::paths::DataKind;

pub const MAX_BRAWLER_POWER: i64 = 11;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("{kind} document does not match the expected shape: {source}")]
    Shape {
        kind: DataKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("{kind} document field {field} = {value} violates {rule}")]
    Range {
        kind: DataKind,
        field: String,
        value: i64,
        rule: &'static str,
    },
}

pub trait Snapshot: DeserializeOwned {
    const KIND: DataKind;

    /// Value range checks beyond what the shape enforces.
    fn check(&self) -> Result<(), SnapshotError> {
        Ok(())
    }

    fn from_value(value: &Value) -> Result<Self, SnapshotError> {
        let parsed = Self::deserialize(value).map_err(|source| SnapshotError::Shape {
            kind: Self::KIND,
            source,
        })?;
        parsed.check()?;
        Ok(parsed)
    }
}

/// Checks a raw document against the schema of `kind`.
pub fn validate(kind: DataKind, value: &Value) -> Result<(), SnapshotError> {
    match kind {
        DataKind::Player => PlayerSnapshot::from_value(value).map(drop),
        DataKind::Battlelog => BattleLog::from_value(value).map(drop),
        DataKind::Club => ClubSnapshot::from_value(value).map(drop),
        DataKind::ClubMembers => ClubMembers::from_value(value).map(drop),
    }
}

fn at_least(kind: DataKind, field: &str, value: i64, min: i64) -> Result<(), SnapshotError> {
    if value < min {
        return Err(SnapshotError::Range {
            kind,
            field: field.to_string(),
            value,
            rule: if min == 0 { ">= 0" } else { ">= 1" },
        });
    }
    Ok(())
}

fn check_power(kind: DataKind, field: &str, power: i64) -> Result<(), SnapshotError> {
    if !(1..=MAX_BRAWLER_POWER).contains(&power) {
        return Err(SnapshotError::Range {
            kind,
            field: field.to_string(),
            value: power,
            rule: "1..=11",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub name_color: Option<String>,
    pub trophies: i64,
    pub highest_trophies: i64,
    pub exp_level: i64,
    pub exp_points: i64,
    #[serde(default, rename = "3vs3Victories")]
    pub three_vs_three_victories: Option<i64>,
    #[serde(default)]
    pub solo_victories: Option<i64>,
    #[serde(default)]
    pub duo_victories: Option<i64>,
    #[serde(default)]
    pub best_robo_rumble_time: Option<i64>,
    #[serde(default)]
    pub best_time_as_big_brawler: Option<i64>,
    #[serde(default)]
    pub club: Option<ClubRef>,
    #[serde(default)]
    pub brawlers: Vec<Brawler>,
}

/// The API sends `"club": {}` for players without a club.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClubRef {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brawler {
    pub id: i64,
    pub name: String,
    pub power: i64,
    pub rank: i64,
    pub trophies: i64,
    pub highest_trophies: i64,
}

impl PlayerSnapshot {
    pub fn maxed_brawlers(&self) -> i64 {
        self.brawlers
            .iter()
            .filter(|b| b.power == MAX_BRAWLER_POWER)
            .count() as i64
    }

    pub fn total_brawler_trophies(&self) -> i64 {
        self.brawlers.iter().map(|b| b.trophies).sum()
    }
}

impl Snapshot for PlayerSnapshot {
    const KIND: DataKind = DataKind::Player;

    fn check(&self) -> Result<(), SnapshotError> {
        let kind = Self::KIND;
        at_least(kind, "trophies", self.trophies, 0)?;
        at_least(kind, "highestTrophies", self.highest_trophies, 0)?;
        at_least(kind, "expLevel", self.exp_level, 1)?;
        at_least(kind, "expPoints", self.exp_points, 0)?;
        for (i, b) in self.brawlers.iter().enumerate() {
            check_power(kind, &format!("brawlers[{i}].power"), b.power)?;
            at_least(kind, &format!("brawlers[{i}].rank"), b.rank, 0)?;
            at_least(kind, &format!("brawlers[{i}].trophies"), b.trophies, 0)?;
            at_least(
                kind,
                &format!("brawlers[{i}].highestTrophies"),
                b.highest_trophies,
                0,
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BattleLog {
    #[serde(default)]
    pub items: Vec<Battle>,
}

impl BattleLog {
    pub fn empty_document() -> Value {
        serde_json::json!({ "items": [] })
    }
}

impl Snapshot for BattleLog {
    const KIND: DataKind = DataKind::Battlelog;

    fn check(&self) -> Result<(), SnapshotError> {
        let kind = Self::KIND;
        for (i, battle) in self.items.iter().enumerate() {
            for p in battle.battle.participants() {
                if let Some(b) = &p.brawler {
                    check_power(kind, &format!("items[{i}].brawler.power"), b.power)?;
                    at_least(kind, &format!("items[{i}].brawler.trophies"), b.trophies, 0)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battle {
    pub battle_time: String,
    #[serde(default)]
    pub event: BattleEvent,
    pub battle: BattleDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BattleEvent {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub map: Option<String>,
}

/// Team modes carry `teams` and a `result`; showdown modes carry a flat
/// `players` list and the owner's `rank` instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleDetails {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, rename = "type")]
    pub battle_type: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub rank: Option<i64>,
    #[serde(default)]
    pub star_player: Option<BattlePlayer>,
    #[serde(default)]
    pub teams: Option<Vec<Vec<BattlePlayer>>>,
    #[serde(default)]
    pub players: Option<Vec<BattlePlayer>>,
}

impl BattleDetails {
    pub fn participants(&self) -> impl Iterator<Item = &BattlePlayer> {
        self.teams
            .iter()
            .flatten()
            .flatten()
            .chain(self.players.iter().flatten())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BattlePlayer {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub brawler: Option<BrawlerInBattle>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrawlerInBattle {
    pub id: i64,
    pub name: String,
    pub power: i64,
    pub trophies: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubSnapshot {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub club_type: String,
    pub badge_id: i64,
    pub required_trophies: i64,
    pub trophies: i64,
    #[serde(default)]
    pub members: Vec<ClubMember>,
}

impl Snapshot for ClubSnapshot {
    const KIND: DataKind = DataKind::Club;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubMember {
    pub tag: String,
    pub name: String,
    #[serde(default)]
    pub name_color: Option<String>,
    pub role: String,
    pub trophies: i64,
    pub icon: PlayerIcon,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerIcon {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClubMembers {
    #[serde(default)]
    pub items: Vec<ClubMember>,
}

impl Snapshot for ClubMembers {
    const KIND: DataKind = DataKind::ClubMembers;
}
