use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use arrow_array::types::Date32Type;
use arrow_array::{Date32Array, RecordBatch};
use arrow_schema::DataType;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::frame::{left_join, null_column, rename, select, unique_by, with_column};
use crate::parquet_io::{read_batch_if_exists, remove_partition, write_batch};
use crate::paths::{DataKind, DataLayout};

pub const PROCESS_DATE_COLUMN: &str = "_process_date";

/// One dimension table of the gold layer. Implementors say where their
/// source lives and how to reshape it; [`DimensionProcessor::process`] does
/// the loading, stamping and writing.
pub trait DimensionProcessor {
    fn name(&self) -> &'static str;

    /// Processed-layer data kind the dimension is built from.
    fn source_kind(&self) -> DataKind;

    fn source_path(&self, layout: &DataLayout, date: NaiveDate) -> PathBuf {
        layout.processed_path(self.source_kind(), date)
    }

    fn output_path(&self, layout: &DataLayout, date: NaiveDate) -> PathBuf {
        layout.cleaned_path(self.name(), date)
    }

    fn build(
        &self,
        layout: &DataLayout,
        date: NaiveDate,
        source: &RecordBatch,
    ) -> Result<RecordBatch>;

    /// Loads the source partition, builds the dimension, stamps every row
    /// with the processing date and writes it. Returns `None` without
    /// writing when the source is missing or nothing is left to save; a
    /// partition from an earlier run is removed in that case.
    fn process(&self, layout: &DataLayout, date: NaiveDate) -> Result<Option<PathBuf>> {
        let name = self.name();
        info!(dimension = name, %date, "processing dimension");
        let out = self.output_path(layout, date);

        let source_path = self.source_path(layout, date);
        let dim = match read_batch_if_exists(&source_path)? {
            None => {
                warn!(dimension = name, path = %source_path.display(), "source data not found");
                None
            }
            Some(source) if source.num_rows() == 0 => {
                warn!(dimension = name, "no source rows available");
                None
            }
            Some(source) => Some(self.build(layout, date, &source)?),
        };

        let Some(dim) = dim.filter(|dim| dim.num_rows() > 0) else {
            if remove_partition(&out)? {
                info!(dimension = name, path = %out.display(), "removed stale partition");
            }
            return Ok(None);
        };

        let stamp = Date32Array::from(vec![Date32Type::from_naive_date(date); dim.num_rows()]);
        let dim = with_column(&dim, PROCESS_DATE_COLUMN, Arc::new(stamp))?;
        write_batch(&out, &dim)?;
        info!(dimension = name, rows = dim.num_rows(), path = %out.display(), "saved dimension");
        Ok(Some(out))
    }
}

pub struct DimPlayers;
pub struct DimClubs;
pub struct DimGameModes;
pub struct DimMaps;

const DIM_PLAYER_SOURCE_COLUMNS: &[&str] = &[
    "tag",
    "name",
    "club_tag",
    "trophies",
    "highest_trophies",
    "exp_level",
    "exp_points",
];

const DIM_PLAYER_COLUMNS: &[&str] = &[
    "tag",
    "name",
    "club_tag",
    "club_role",
    "trophies",
    "highest_trophies",
    "exp_level",
    "exp_points",
];

const DIM_CLUB_COLUMNS: &[&str] = &[
    "tag",
    "name",
    "description",
    "trophies",
    "required_trophies",
    "member_count",
];

impl DimensionProcessor for DimPlayers {
    fn name(&self) -> &'static str {
        "dim_players"
    }

    fn source_kind(&self) -> DataKind {
        DataKind::Player
    }

    /// One row per player tag, with the player's role taken from the same
    /// day's club member lists. Players without a membership row get a null
    /// role; so does everyone when the member partition is missing.
    fn build(
        &self,
        layout: &DataLayout,
        date: NaiveDate,
        source: &RecordBatch,
    ) -> Result<RecordBatch> {
        let players = unique_by(&select(source, DIM_PLAYER_SOURCE_COLUMNS)?, "tag")?;

        let members_path = layout.processed_path(DataKind::ClubMembers, date);
        let with_role = match read_batch_if_exists(&members_path)? {
            Some(members) => {
                let roles = rename(&select(&members, &["tag", "role"])?, "role", "club_role")?;
                left_join(&players, &roles, "tag", "tag", &["club_role"])?
            }
            None => {
                warn!(
                    path = %members_path.display(),
                    "club member data not found, roles left empty"
                );
                let roles = null_column(&DataType::Utf8, players.num_rows());
                with_column(&players, "club_role", roles)?
            }
        };
        let dim = select(&with_role, DIM_PLAYER_COLUMNS)?;
        info!(rows = dim.num_rows(), "built dim_players");
        Ok(dim)
    }
}

impl DimensionProcessor for DimClubs {
    fn name(&self) -> &'static str {
        "dim_clubs"
    }

    fn source_kind(&self) -> DataKind {
        DataKind::Club
    }

    fn build(
        &self,
        _layout: &DataLayout,
        _date: NaiveDate,
        source: &RecordBatch,
    ) -> Result<RecordBatch> {
        unique_by(&select(source, DIM_CLUB_COLUMNS)?, "tag")
    }
}

impl DimensionProcessor for DimGameModes {
    fn name(&self) -> &'static str {
        "dim_game_modes"
    }

    fn source_kind(&self) -> DataKind {
        DataKind::Battlelog
    }

    fn build(
        &self,
        _layout: &DataLayout,
        _date: NaiveDate,
        source: &RecordBatch,
    ) -> Result<RecordBatch> {
        unique_by(&select(source, &["battle_mode"])?, "battle_mode")
    }
}

impl DimensionProcessor for DimMaps {
    fn name(&self) -> &'static str {
        "dim_maps"
    }

    fn source_kind(&self) -> DataKind {
        DataKind::Battlelog
    }

    fn build(
        &self,
        _layout: &DataLayout,
        _date: NaiveDate,
        source: &RecordBatch,
    ) -> Result<RecordBatch> {
        unique_by(&select(source, &["map_name"])?, "map_name")
    }
}

/// Every dimension, in the order the gold layer builds them.
pub fn all_dimensions() -> Vec<Box<dyn DimensionProcessor>> {
    vec![
        Box::new(DimPlayers),
        Box::new(DimClubs),
        Box::new(DimGameModes),
        Box::new(DimMaps),
    ]
}

pub fn dimension_for(name: &str) -> Result<Box<dyn DimensionProcessor>> {
    all_dimensions()
        .into_iter()
        .find(|dim| dim.name() == name)
        .ok_or_else(|| anyhow!("unknown dimension {name:?}"))
}
