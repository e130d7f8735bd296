//! Export module: reads schema tables and writes them as Parquet files

pub mod exporter;
pub mod writer;

pub use exporter::export_schema;
pub use writer::{ParquetCompression, ParquetOptions};
