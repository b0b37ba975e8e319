use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow_array::RecordBatch;
use arrow_schema::DataType;
use chrono::{Days, NaiveDate};
use tracing::info;

use crate::flatten::empty_batch;
use crate::frame::{self, concat, filter, has_column, null_column, repeat_str, with_column};
use crate::parquet_io::read_batch_if_exists;
use crate::paths::{DataKind, date_partition};
use crate::tag::{Tag, TagKind, date_dir_name};

pub const DATE_COLUMN: &str = "date";

/// A player or club whose history can be read back out of a columnar layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    tag: Tag,
}

impl Entity {
    pub fn new(tag: Tag) -> Self {
        Self { tag }
    }

    pub fn player(raw: &str) -> Result<Self> {
        Ok(Self::new(Tag::parse(TagKind::Player, raw)?))
    }

    pub fn club(raw: &str) -> Result<Self> {
        Ok(Self::new(Tag::parse(TagKind::Club, raw)?))
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    /// Reads `{base_dir}/{player|club}/{date}/{kind}.parquet` for `today` and
    /// the `days - 1` days before it, keeps this entity's rows and tags each
    /// row with its partition date. Missing days are logged and skipped; no
    /// data at all gives an empty batch. A partition without the owner column
    /// (one written by another tool) is taken to belong to this entity and
    /// gets the column added.
    pub fn load_history(
        &self,
        base_dir: &Path,
        kind: DataKind,
        days: u32,
        today: NaiveDate,
    ) -> Result<RecordBatch> {
        if kind.entity() != self.tag.kind() {
            bail!("{kind} data does not belong to {} {}", self.tag.kind(), self.tag);
        }

        let owner = kind.owner_column();
        let mut parts = Vec::new();
        for offset in 0..days {
            let Some(date) = today.checked_sub_days(Days::new(offset.into())) else {
                break;
            };
            let path = date_partition(base_dir, kind, date);
            let Some(batch) = read_batch_if_exists(&path)? else {
                info!(
                    tag = %self.tag,
                    %kind,
                    %date,
                    path = %path.display(),
                    "no partition for date"
                );
                continue;
            };

            let batch = if has_column(&batch, owner) {
                let keep = frame::string_column(&batch, owner)?
                    .iter()
                    .map(|tag| tag == Some(self.tag.as_str()))
                    .collect::<Vec<_>>();
                filter(&batch, keep)?
            } else {
                with_column(&batch, owner, repeat_str(self.tag.as_str(), batch.num_rows()))?
            };
            let day = date_dir_name(date);
            parts.push(with_column(&batch, DATE_COLUMN, repeat_str(&day, batch.num_rows()))?);
        }

        let Some(first) = parts.first() else {
            info!(tag = %self.tag, %kind, days, "no history found");
            let empty = empty_batch(kind);
            return with_column(&empty, DATE_COLUMN, null_column(&DataType::Utf8, 0));
        };
        concat(&first.schema(), &parts)
            .with_context(|| format!("combine {kind} history for {}", self.tag))
    }
}
