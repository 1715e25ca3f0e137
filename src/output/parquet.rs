//! Parquet serialization of record tables.
//!
//! Every table becomes an Arrow `RecordBatch` and is written as a single
//! ZSTD-compressed Parquet file.

use crate::aggregator::metadata::MetadataTable;
use crate::reader::schema::{CounterTable, Segment};
use crate::utils::error::OutputError;
use arrow::array::{
    ArrayRef, Float64Array, Float64Builder, Int64Array, Int64Builder, StringBuilder, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::debug;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Writer settings shared by every output file
pub fn writer_properties() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .build()
}

/// Write one batch to `path`, replacing any existing file
pub fn write_batch(path: &Path, batch: &RecordBatch) -> Result<(), OutputError> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(writer_properties()))?;
    writer.write(batch)?;
    writer.close()?;

    debug!("Wrote {} rows to {}", batch.num_rows(), path.display());
    Ok(())
}

/// Single-row batch of integer counters: `id`, `rank`, then one column per counter
pub fn counter_batch(
    rank: i64,
    id: u64,
    table: &CounterTable<i64>,
) -> Result<RecordBatch, OutputError> {
    counter_batch_of(rank, id, table, DataType::Int64, |v| {
        Arc::new(Int64Array::from(vec![v]))
    })
}

/// Single-row batch of float counters: `id`, `rank`, then one column per counter
pub fn fcounter_batch(
    rank: i64,
    id: u64,
    table: &CounterTable<f64>,
) -> Result<RecordBatch, OutputError> {
    counter_batch_of(rank, id, table, DataType::Float64, |v| {
        Arc::new(Float64Array::from(vec![v]))
    })
}

fn counter_batch_of<T: Copy>(
    rank: i64,
    id: u64,
    table: &CounterTable<T>,
    data_type: DataType,
    column: impl Fn(T) -> ArrayRef,
) -> Result<RecordBatch, OutputError> {
    let mut fields = Vec::with_capacity(table.len() + 2);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(table.len() + 2);

    fields.push(Field::new("id", DataType::UInt64, false));
    columns.push(Arc::new(UInt64Array::from(vec![id])));
    fields.push(Field::new("rank", DataType::Int64, false));
    columns.push(Arc::new(Int64Array::from(vec![rank])));

    for (name, value) in table.iter() {
        fields.push(Field::new(name, data_type.clone(), false));
        columns.push(column(value));
    }

    Ok(RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns,
    )?)
}

pub fn segment_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("offset", DataType::Int64, false),
        Field::new("length", DataType::Int64, false),
        Field::new("start_time", DataType::Float64, false),
        Field::new("end_time", DataType::Float64, false),
    ]))
}

/// One row per traced operation
pub fn segment_batch(segments: &[Segment]) -> Result<RecordBatch, OutputError> {
    let mut offset_builder = Int64Builder::with_capacity(segments.len());
    let mut length_builder = Int64Builder::with_capacity(segments.len());
    let mut start_builder = Float64Builder::with_capacity(segments.len());
    let mut end_builder = Float64Builder::with_capacity(segments.len());

    for segment in segments {
        offset_builder.append_value(segment.offset);
        length_builder.append_value(segment.length);
        start_builder.append_value(segment.start_time);
        end_builder.append_value(segment.end_time);
    }

    Ok(RecordBatch::try_new(
        segment_schema(),
        vec![
            Arc::new(offset_builder.finish()),
            Arc::new(length_builder.finish()),
            Arc::new(start_builder.finish()),
            Arc::new(end_builder.finish()),
        ],
    )?)
}

/// Schema for metadata.parquet
pub fn metadata_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("job_name", DataType::Utf8, false),
        Field::new("run_time", DataType::Float64, false),
        Field::new("start_time_nsec", DataType::Int64, false),
        Field::new("start_time_sec", DataType::Int64, false),
        Field::new("end_time_nsec", DataType::Int64, false),
        Field::new("end_time_sec", DataType::Int64, false),
        Field::new("jobid", DataType::Int64, false),
        Field::new("uid", DataType::Int64, false),
        Field::new("log_ver", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("nprocs", DataType::Int64, false),
        Field::new("exe", DataType::Utf8, false),
    ]))
}

/// One row per job, indexed by the generated job name
pub fn metadata_batch(table: &MetadataTable) -> Result<RecordBatch, OutputError> {
    let rows = table.rows();

    let mut name_builder = StringBuilder::with_capacity(rows.len(), rows.len() * 16);
    let mut run_time_builder = Float64Builder::with_capacity(rows.len());
    let mut start_nsec_builder = Int64Builder::with_capacity(rows.len());
    let mut start_sec_builder = Int64Builder::with_capacity(rows.len());
    let mut end_nsec_builder = Int64Builder::with_capacity(rows.len());
    let mut end_sec_builder = Int64Builder::with_capacity(rows.len());
    let mut jobid_builder = Int64Builder::with_capacity(rows.len());
    let mut uid_builder = Int64Builder::with_capacity(rows.len());
    let mut log_ver_builder = StringBuilder::with_capacity(rows.len(), rows.len() * 8);
    let mut metadata_builder = StringBuilder::with_capacity(rows.len(), rows.len() * 64);
    let mut nprocs_builder = Int64Builder::with_capacity(rows.len());
    let mut exe_builder = StringBuilder::with_capacity(rows.len(), rows.len() * 64);

    for row in rows {
        name_builder.append_value(&row.name);
        run_time_builder.append_value(row.run_time);
        start_nsec_builder.append_value(row.start_time_nsec);
        start_sec_builder.append_value(row.start_time_sec);
        end_nsec_builder.append_value(row.end_time_nsec);
        end_sec_builder.append_value(row.end_time_sec);
        jobid_builder.append_value(row.jobid);
        uid_builder.append_value(row.uid);
        log_ver_builder.append_value(&row.log_ver);
        metadata_builder.append_value(&row.metadata);
        nprocs_builder.append_value(row.nprocs);
        exe_builder.append_value(&row.exe);
    }

    Ok(RecordBatch::try_new(
        metadata_schema(),
        vec![
            Arc::new(name_builder.finish()),
            Arc::new(run_time_builder.finish()),
            Arc::new(start_nsec_builder.finish()),
            Arc::new(start_sec_builder.finish()),
            Arc::new(end_nsec_builder.finish()),
            Arc::new(end_sec_builder.finish()),
            Arc::new(jobid_builder.finish()),
            Arc::new(uid_builder.finish()),
            Arc::new(log_ver_builder.finish()),
            Arc::new(metadata_builder.finish()),
            Arc::new(nprocs_builder.finish()),
            Arc::new(exe_builder.finish()),
        ],
    )?)
}
