//! Shard range to columnar table conversion. Reads an inclusive range of
//! shard files, concatenates their records verbatim and writes one Parquet
//! file; fields pass through untransformed.

use crate::paths::shard_path;
use crate::progress::make_count_progress;
use crate::util::read_json_array;
use anyhow::{anyhow, Context, Result};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::json::reader::infer_json_schema_from_iterator;
use arrow::json::ReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct MergeReport {
    pub rows: usize,
    pub columns: usize,
    pub shards_read: usize,
    pub output: PathBuf,
}

fn null_to_utf8(data_type: &DataType) -> DataType {
    match data_type {
        DataType::Null => DataType::Utf8,
        DataType::List(item) => DataType::List(Arc::new(Field::new(
            item.name(),
            null_to_utf8(item.data_type()),
            true,
        ))),
        DataType::Struct(members) => DataType::Struct(
            members
                .iter()
                .map(|member| {
                    Arc::new(Field::new(
                        member.name(),
                        null_to_utf8(member.data_type()),
                        member.is_nullable(),
                    ))
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Concatenate shards `start..=end` into one Parquet file at `output`.
/// Missing shards in the range are skipped with a warning; a range that
/// yields no records at all is an error.
pub fn merge_shards(
    data_dir: &Path,
    start: u32,
    end: u32,
    output: &Path,
    show_progress: bool,
) -> Result<MergeReport> {
    if start > end {
        return Err(anyhow!("shard range is inverted: {start} > {end}"));
    }

    let pb = if show_progress {
        Some(make_count_progress(
            u64::from(end) - u64::from(start) + 1,
            "Merge: read shards",
        ))
    } else {
        None
    };

    let mut records = Vec::new();
    let mut shards_read = 0usize;
    for index in start..=end {
        let path = shard_path(data_dir, index);
        if !path.exists() {
            tracing::warn!(shard = index, path = %path.display(), "shard file missing, skipping");
            if let Some(pb) = &pb {
                pb.inc(1);
            }
            continue;
        }
        let mut rows = read_json_array(&path)?;
        tracing::info!(shard = index, rows = rows.len(), "shard loaded");
        records.append(&mut rows);
        shards_read += 1;
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_with_message("Merge: shards read");
    }

    if records.is_empty() {
        return Err(anyhow!(
            "no records found in shards {start}..={end} under {}",
            data_dir.display()
        ));
    }

    let inferred = infer_json_schema_from_iterator(records.iter().map(Ok::<_, ArrowError>))
        .context("infer schema from records")?;
    // A column (or list item, or struct member) that is null or empty in
    // every record infers as the null type, which the Parquet writer
    // refuses; store such slots as nullable strings.
    let fields: Vec<Field> = inferred
        .fields()
        .iter()
        .map(|field| {
            Field::new(
                field.name(),
                null_to_utf8(field.data_type()),
                field.is_nullable(),
            )
        })
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let mut decoder = ReaderBuilder::new(schema.clone())
        .build_decoder()
        .context("build record decoder")?;
    decoder.serialize(&records).context("decode records")?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
    }
    let file = File::create(output).with_context(|| format!("create {}", output.display()))?;
    let props = WriterProperties::builder().build();
    let mut writer =
        ArrowWriter::try_new(file, schema.clone(), Some(props)).context("create parquet writer")?;
    let mut rows_written = 0usize;
    while let Some(batch) = decoder.flush().context("finish record decode")? {
        writer.write(&batch).context("write record batch")?;
        rows_written += batch.num_rows();
    }
    writer.close().context("close parquet writer")?;

    tracing::info!(
        rows = rows_written,
        columns = schema.fields().len(),
        output = %output.display(),
        "parquet written"
    );
    Ok(MergeReport {
        rows: rows_written,
        columns: schema.fields().len(),
        shards_read,
        output: output.to_path_buf(),
    })
}
