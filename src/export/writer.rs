//! Parquet writer for materialised tables.
//!
//! A [`TableData`] is turned into a single Arrow `RecordBatch` (one array per
//! column buffer) and written with `ArrowWriter`. The writer splits the batch
//! into row groups of `max_row_group_size` rows.

use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BinaryArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int16Array,
    Int32Array, Int64Array, StringArray, Time64MicrosecondArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression as ParquetCompressionCodec;
use parquet::file::properties::WriterProperties;
use thiserror::Error;

use crate::db::types::{ColumnBuffer, ColumnKind, TableData};

/// Days between 0001-01-01 (CE) and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Errors that can occur while writing a Parquet file.
#[derive(Error, Debug)]
pub enum ParquetWriteError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(String),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(String),
}

impl From<arrow::error::ArrowError> for ParquetWriteError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ParquetWriteError::Arrow(err.to_string())
    }
}

impl From<parquet::errors::ParquetError> for ParquetWriteError {
    fn from(err: parquet::errors::ParquetError) -> Self {
        ParquetWriteError::Parquet(err.to_string())
    }
}

/// Compression codec for written files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParquetCompression {
    None,
    #[default]
    Snappy,
    Gzip,
    Lz4,
    Zstd,
}

impl ParquetCompression {
    fn to_codec(self) -> ParquetCompressionCodec {
        match self {
            ParquetCompression::None => ParquetCompressionCodec::UNCOMPRESSED,
            ParquetCompression::Snappy => ParquetCompressionCodec::SNAPPY,
            ParquetCompression::Gzip => ParquetCompressionCodec::GZIP(Default::default()),
            ParquetCompression::Lz4 => ParquetCompressionCodec::LZ4,
            ParquetCompression::Zstd => ParquetCompressionCodec::ZSTD(Default::default()),
        }
    }
}

impl FromStr for ParquetCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "uncompressed" => Ok(ParquetCompression::None),
            "snappy" => Ok(ParquetCompression::Snappy),
            "gzip" => Ok(ParquetCompression::Gzip),
            "lz4" => Ok(ParquetCompression::Lz4),
            "zstd" => Ok(ParquetCompression::Zstd),
            other => Err(format!("unknown parquet compression '{}'", other)),
        }
    }
}

/// Options for Parquet output.
#[derive(Debug, Clone)]
pub struct ParquetOptions {
    /// Compression type (default: Snappy)
    pub compression: ParquetCompression,
    /// Maximum rows per row group (default: 1024 * 1024)
    pub max_row_group_size: usize,
}

impl Default for ParquetOptions {
    fn default() -> Self {
        Self {
            compression: ParquetCompression::default(),
            max_row_group_size: 1024 * 1024,
        }
    }
}

impl ParquetOptions {
    #[must_use]
    pub fn with_compression(mut self, compression: ParquetCompression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn with_max_row_group_size(mut self, rows: usize) -> Self {
        self.max_row_group_size = rows.max(1);
        self
    }

    fn writer_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression.to_codec())
            .set_max_row_group_size(self.max_row_group_size)
            .build()
    }
}

/// Arrow type used for a column kind
pub fn arrow_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Boolean => DataType::Boolean,
        ColumnKind::Int16 => DataType::Int16,
        ColumnKind::Int32 => DataType::Int32,
        ColumnKind::Int64 => DataType::Int64,
        ColumnKind::Float32 => DataType::Float32,
        ColumnKind::Float64 => DataType::Float64,
        ColumnKind::Text => DataType::Utf8,
        ColumnKind::Binary => DataType::Binary,
        ColumnKind::Date => DataType::Date32,
        ColumnKind::Time => DataType::Time64(TimeUnit::Microsecond),
        ColumnKind::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
        ColumnKind::TimestampTz => DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
    }
}

/// Arrow schema of a table; every column is nullable
pub fn arrow_schema(data: &TableData) -> SchemaRef {
    let fields: Vec<Field> = data
        .columns
        .iter()
        .map(|c| Field::new(&c.name, arrow_type(c.kind), true))
        .collect();
    Arc::new(Schema::new(fields))
}

/// Converts a materialised table into one record batch
pub fn table_to_record_batch(data: &TableData) -> Result<RecordBatch, ParquetWriteError> {
    let schema = arrow_schema(data);
    let arrays: Vec<ArrayRef> = data.buffers.iter().map(buffer_to_array).collect();

    let options = RecordBatchOptions::new().with_row_count(Some(data.num_rows()));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

fn buffer_to_array(buffer: &ColumnBuffer) -> ArrayRef {
    match buffer {
        ColumnBuffer::Boolean(v) => Arc::new(BooleanArray::from(v.clone())),
        ColumnBuffer::Int16(v) => Arc::new(Int16Array::from(v.clone())),
        ColumnBuffer::Int32(v) => Arc::new(Int32Array::from(v.clone())),
        ColumnBuffer::Int64(v) => Arc::new(Int64Array::from(v.clone())),
        ColumnBuffer::Float32(v) => Arc::new(Float32Array::from(v.clone())),
        ColumnBuffer::Float64(v) => Arc::new(Float64Array::from(v.clone())),
        ColumnBuffer::Text(v) => Arc::new(v.iter().map(|s| s.as_deref()).collect::<StringArray>()),
        ColumnBuffer::Binary(v) => {
            Arc::new(v.iter().map(|b| b.as_deref()).collect::<BinaryArray>())
        }
        ColumnBuffer::Date(v) => Arc::new(Date32Array::from(
            v.iter().map(|d| d.map(days_since_epoch)).collect::<Vec<_>>(),
        )),
        ColumnBuffer::Time(v) => Arc::new(Time64MicrosecondArray::from(
            v.iter().map(|t| t.map(micros_since_midnight)).collect::<Vec<_>>(),
        )),
        ColumnBuffer::Timestamp(v) => Arc::new(TimestampMicrosecondArray::from(
            v.iter()
                .map(|ts| ts.map(|ts| ts.and_utc().timestamp_micros()))
                .collect::<Vec<_>>(),
        )),
        ColumnBuffer::TimestampTz(v) => Arc::new(
            TimestampMicrosecondArray::from(
                v.iter()
                    .map(|ts| ts.map(|ts| ts.timestamp_micros()))
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC"),
        ),
    }
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn micros_since_midnight(time: NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * 1_000_000 + (time.nanosecond() / 1_000) as i64
}

/// Writes a table to `path`, replacing any existing file.
///
/// Returns the number of rows written.
pub fn write_parquet(
    data: &TableData,
    path: &Path,
    options: &ParquetOptions,
) -> Result<u64, ParquetWriteError> {
    let batch = table_to_record_batch(data)?;
    let file = File::create(path)?;

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(options.writer_properties()))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(batch.num_rows() as u64)
}
