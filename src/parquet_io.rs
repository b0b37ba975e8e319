use std::fs::{self, File};
use std::path::Path;

use anyhow::{Context, Result};
use arrow_array::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::frame::concat;

/// Writes `batch` to `path`, replacing any previous file. The data lands in a
/// sibling temp file first and is renamed into place, so readers never see a
/// half-written partition.
pub fn write_batch(path: &Path, batch: &RecordBatch) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
    }

    let tmp = path.with_extension("parquet.tmp");
    let file = File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), Some(props)).context("open parquet writer")?;
    writer.write(batch).context("write parquet batch")?;
    writer.close().context("close parquet writer")?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

/// Reads a whole partition into a single batch.
pub fn read_batch(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("open parquet reader {}", path.display()))?;
    let schema = builder.schema().clone();
    let batches = builder
        .build()
        .context("build parquet reader")?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("read {}", path.display()))?;
    concat(&schema, &batches)
}

/// Reads a partition if it exists; `Ok(None)` means the file is absent.
pub fn read_batch_if_exists(path: &Path) -> Result<Option<RecordBatch>> {
    if !path.exists() {
        return Ok(None);
    }
    read_batch(path).map(Some)
}

/// Removes a partition file left by an earlier run. Returns whether one was
/// there.
pub fn remove_partition(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("remove {}", path.display()))?;
    Ok(true)
}
