//! PostgreSQL → Parquet → S3 export
//!
//! Batch job in three sequential steps:
//!
//! 1. **Connect** to PostgreSQL with explicit credentials.
//! 2. **Export** every table of a schema to `{OUTPUT_DIR}/{table}.parquet`,
//!    optionally restricted to the tables listed in `TABLES`.
//! 3. **Upload** every `*.parquet` file of the output directory to
//!    `s3://{S3_BUCKET}/{S3_FOLDER}/{filename}`.
//!
//! The first failure stops the job. Files already written or uploaded are
//! left in place.

mod cli;
mod db;
mod export;
mod storage;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create Tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(cli::run()) {
        tracing::error!("Export failed: {:#}", e);
        std::process::exit(1);
    }
}
