use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;

use crate::tag::{Tag, TagKind, date_dir_name};

pub const DEFAULT_DATA_ROOT: &str = "data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataKind {
    Player,
    Battlelog,
    Club,
    ClubMembers,
}

impl DataKind {
    pub const ALL: [DataKind; 4] = [
        DataKind::Player,
        DataKind::Battlelog,
        DataKind::Club,
        DataKind::ClubMembers,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DataKind::Player => "player",
            DataKind::Battlelog => "battlelog",
            DataKind::Club => "club",
            DataKind::ClubMembers => "club_members",
        }
    }

    /// Which entity owns documents of this kind.
    pub fn entity(self) -> TagKind {
        match self {
            DataKind::Player | DataKind::Battlelog => TagKind::Player,
            DataKind::Club | DataKind::ClubMembers => TagKind::Club,
        }
    }

    pub fn json_file(self) -> String {
        format!("{}.json", self.name())
    }

    pub fn parquet_file(self) -> String {
        format!("{}.parquet", self.name())
    }

    /// Column holding the owning entity's tag in flattened rows.
    pub fn owner_column(self) -> &'static str {
        match self {
            DataKind::Player | DataKind::Club => "tag",
            DataKind::Battlelog => "player_tag",
            DataKind::ClubMembers => "club_tag",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        DataKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s.trim())
            .ok_or_else(|| anyhow!("unknown data kind: {s}"))
    }
}

/// Directory layout of every pipeline layer under one data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ingested_dir(&self) -> PathBuf {
        self.root.join("ingested")
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn cleaned_dir(&self) -> PathBuf {
        self.root.join("cleaned")
    }

    /// `ingested/{player|club}`, the parent of every tag directory.
    pub fn ingested_entity_dir(&self, entity: TagKind) -> PathBuf {
        self.ingested_dir().join(entity.label())
    }

    /// `ingested/{player|club}/{tag}/{date}/{kind}.json`
    pub fn snapshot_path(&self, kind: DataKind, tag: &Tag, date: NaiveDate) -> PathBuf {
        tag.partition_path(
            &self.ingested_entity_dir(kind.entity()),
            date,
            &kind.json_file(),
        )
    }

    /// `raw/{player|club}/{date}/{kind}.parquet`
    pub fn raw_path(&self, kind: DataKind, date: NaiveDate) -> PathBuf {
        date_partition(&self.raw_dir(), kind, date)
    }

    /// `processed/{player|club}/{date}/{kind}.parquet`
    pub fn processed_path(&self, kind: DataKind, date: NaiveDate) -> PathBuf {
        date_partition(&self.processed_dir(), kind, date)
    }

    /// `cleaned/{table}/{date}/{table}.parquet`
    pub fn cleaned_path(&self, table: &str, date: NaiveDate) -> PathBuf {
        self.cleaned_dir()
            .join(table)
            .join(date_dir_name(date))
            .join(format!("{table}.parquet"))
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_ROOT)
    }
}

/// `{base}/{player|club}/{date}/{kind}.parquet`, the shape shared by raw,
/// processed and the entity history loader.
pub fn date_partition(base: &Path, kind: DataKind, date: NaiveDate) -> PathBuf {
    base.join(kind.entity().label())
        .join(date_dir_name(date))
        .join(kind.parquet_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 14).expect("valid date")
    }

    #[test]
    fn layer_paths() {
        let layout = DataLayout::new("/tmp/bs");
        let tag = Tag::player("PC0PPLRU").expect("valid tag");
        assert_eq!(
            layout.snapshot_path(DataKind::Battlelog, &tag, d()),
            PathBuf::from("/tmp/bs/ingested/player/#PC0PPLRU/2025-07-14/battlelog.json")
        );
        assert_eq!(
            layout.raw_path(DataKind::ClubMembers, d()),
            PathBuf::from("/tmp/bs/raw/club/2025-07-14/club_members.parquet")
        );
        assert_eq!(
            layout.processed_path(DataKind::Player, d()),
            PathBuf::from("/tmp/bs/processed/player/2025-07-14/player.parquet")
        );
        assert_eq!(
            layout.cleaned_path("fact_matches", d()),
            PathBuf::from("/tmp/bs/cleaned/fact_matches/2025-07-14/fact_matches.parquet")
        );
    }

    #[test]
    fn data_kind_round_trips_names() {
        for kind in DataKind::ALL {
            assert_eq!(kind.name().parse::<DataKind>().ok(), Some(kind));
        }
        assert!("brawlers".parse::<DataKind>().is_err());
    }
}
