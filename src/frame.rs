//! Column operations on Arrow record batches shared by every pipeline layer.
//!
//! Each layer reads a Parquet partition into one [`RecordBatch`], reshapes it
//! with the helpers below (all built on the `arrow-select` kernels) and
//! writes it back out. Every column is nullable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use arrow_array::cast::AsArray;
use arrow_array::types::TimestampMicrosecondType;
use arrow_array::{
    Array, ArrayRef, BooleanArray, RecordBatch, StringArray, TimestampMicrosecondArray, UInt32Array,
};
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow_select::concat::concat_batches;
use arrow_select::filter::filter_record_batch;
use arrow_select::take::take;
use chrono::{DateTime, NaiveDateTime};

/// Naive (zone-less) microsecond timestamps, used for every time column.
pub const TIMESTAMP: DataType = DataType::Timestamp(TimeUnit::Microsecond, None);

pub fn micros(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

pub fn from_micros(value: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(value).map(|ts| ts.naive_utc())
}

pub fn schema(columns: &[(&str, DataType)]) -> SchemaRef {
    Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, ty)| Field::new(*name, ty.clone(), true))
            .collect::<Vec<_>>(),
    ))
}

pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

pub fn has_column(batch: &RecordBatch, name: &str) -> bool {
    batch.schema().index_of(name).is_ok()
}

pub fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("missing column {name:?}"))
}

pub fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    column(batch, name)?
        .as_string_opt::<i32>()
        .ok_or_else(|| anyhow!("column {name:?} is not utf8"))
}

pub fn timestamp_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a TimestampMicrosecondArray> {
    column(batch, name)?
        .as_primitive_opt::<TimestampMicrosecondType>()
        .ok_or_else(|| anyhow!("column {name:?} is not a microsecond timestamp"))
}

pub fn select(batch: &RecordBatch, names: &[&str]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let indices = names
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .with_context(|| format!("select column {name:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(batch.project(&indices)?)
}

/// Drops the named columns; names that are not present are ignored.
pub fn drop_columns(batch: &RecordBatch, names: &[&str]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let keep = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !names.contains(&f.name().as_str()))
        .map(|(i, _)| i)
        .collect::<Vec<_>>();
    Ok(batch.project(&keep)?)
}

pub fn rename(batch: &RecordBatch, from: &str, to: &str) -> Result<RecordBatch> {
    let schema = batch.schema();
    let idx = schema
        .index_of(from)
        .with_context(|| format!("rename column {from:?}"))?;
    let fields = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| {
            if i == idx {
                Arc::new(f.as_ref().clone().with_name(to))
            } else {
                Arc::clone(f)
            }
        })
        .collect::<Vec<_>>();
    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        batch.columns().to_vec(),
    )?)
}

/// Adds `array` as column `name`, or replaces the column of that name.
pub fn with_column(batch: &RecordBatch, name: &str, array: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields = schema.fields().iter().cloned().collect::<Vec<_>>();
    let mut columns = batch.columns().to_vec();
    let field = Arc::new(Field::new(name, array.data_type().clone(), true));
    match schema.index_of(name) {
        Ok(idx) => {
            fields[idx] = field;
            columns[idx] = array;
        }
        Err(_) => {
            fields.push(field);
            columns.push(array);
        }
    }
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .with_context(|| format!("add column {name:?}"))
}

/// Keeps the rows where `keep` is true.
pub fn filter(batch: &RecordBatch, keep: impl IntoIterator<Item = bool>) -> Result<RecordBatch> {
    let mask = BooleanArray::from(keep.into_iter().collect::<Vec<_>>());
    Ok(filter_record_batch(batch, &mask)?)
}

fn take_rows(batch: &RecordBatch, indices: &UInt32Array) -> Result<RecordBatch> {
    let columns = batch
        .columns()
        .iter()
        .map(|col| take(col.as_ref(), indices, None))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RecordBatch::try_new(batch.schema(), columns)?)
}

/// Keeps the first row for every distinct non-null value of the utf8 column
/// `key`. Rows whose key is null are dropped.
pub fn unique_by(batch: &RecordBatch, key: &str) -> Result<RecordBatch> {
    let keys = string_column(batch, key)?;
    let mut seen = HashSet::new();
    let indices = keys
        .iter()
        .enumerate()
        .filter_map(|(i, k)| k.filter(|k| seen.insert(*k)).map(|_| i as u32))
        .collect::<Vec<_>>();
    take_rows(batch, &UInt32Array::from(indices))
}

/// Left join on utf8 keys: every left row is kept once, and `right_cols` come
/// from the first right row with an equal key, or are null when none matches.
pub fn left_join(
    left: &RecordBatch,
    right: &RecordBatch,
    left_key: &str,
    right_key: &str,
    right_cols: &[&str],
) -> Result<RecordBatch> {
    for name in right_cols {
        if has_column(left, name) {
            bail!("left join would duplicate column {name:?}");
        }
    }

    let mut first_match: HashMap<&str, u32> = HashMap::new();
    for (i, key) in string_column(right, right_key)?.iter().enumerate() {
        if let Some(key) = key {
            first_match.entry(key).or_insert(i as u32);
        }
    }
    let indices = string_column(left, left_key)?
        .iter()
        .map(|key| key.and_then(|k| first_match.get(k).copied()))
        .collect::<Vec<_>>();

    let picked = take_rows(&select(right, right_cols)?, &UInt32Array::from(indices))?;
    let mut joined = left.clone();
    for (field, array) in picked.schema().fields().iter().zip(picked.columns()) {
        joined = with_column(&joined, field.name(), Arc::clone(array))?;
    }
    Ok(joined)
}

/// Row-wise union of batches that share `schema`.
pub fn concat(schema: &SchemaRef, batches: &[RecordBatch]) -> Result<RecordBatch> {
    concat_batches(schema, batches).context("concatenate batches")
}

/// A column of `len` copies of `value`.
pub fn repeat_str(value: &str, len: usize) -> ArrayRef {
    Arc::new(StringArray::from(vec![value; len]))
}

pub fn null_column(ty: &DataType, len: usize) -> ArrayRef {
    arrow_array::new_null_array(ty, len)
}
