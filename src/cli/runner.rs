//! CLI runner - headless export execution

use anyhow::{Context, Result};
use std::time::Instant;

use super::config::CliConfig;
use crate::db::PostgresConnection;
use crate::export::export_schema;
use crate::storage::{upload_directory, S3Client};

/// Run the export in CLI mode
pub async fn run() -> Result<()> {
    let start_time = Instant::now();

    // Parse configuration from environment
    let config = CliConfig::from_env()
        .context("Error parsing configuration from environment")?;
    let conn_config = config.connection_config();

    tracing::info!("===========================================");
    tracing::info!("PostgreSQL → Parquet → S3 export (CLI Mode)");
    tracing::info!("===========================================");
    tracing::info!("");
    tracing::info!("Source: {} (schema '{}')", conn_config.display_url(), config.pg_schema);
    tracing::info!("Output: {}", config.output_dir.display());
    if config.s3_enabled {
        tracing::info!("Target: s3://{}/{}", config.s3_bucket, config.s3_folder);
    } else {
        tracing::info!("Target: upload disabled");
    }
    tracing::info!("Compression: {:?}", config.compression);
    if !config.tables.is_empty() {
        tracing::info!("Tables filter: {:?}", config.tables);
    }
    tracing::info!("");

    // Phase 1: connect
    tracing::info!("Phase 1: Connecting to PostgreSQL...");
    let postgres = PostgresConnection::connect(&conn_config).await?;
    postgres.test_connection().await
        .context("Failed to verify PostgreSQL connection")?;
    tracing::info!("Connected successfully!");

    // Phase 2: export
    tracing::info!("Phase 2: Exporting tables to Parquet...");
    let summary = export_schema(
        &postgres,
        &config.pg_schema,
        &config.tables,
        &config.output_dir,
        &config.parquet_options(),
    )
    .await
    .context("Failed to export tables")?;
    for exported in &summary.tables {
        tracing::info!(
            "  - {} ({} rows) -> {}",
            exported.table.full_name(),
            exported.rows,
            exported.path.display()
        );
    }
    tracing::info!(
        "Exported {} tables ({} rows)",
        summary.tables.len(),
        summary.total_rows()
    );
    tracing::info!("");

    // Phase 3: upload
    if config.s3_enabled {
        tracing::info!("Phase 3: Uploading Parquet files to S3...");
        let s3 = S3Client::new(&config.s3_config()).await?;
        let uploaded = upload_directory(&s3, &config.s3_folder, &config.output_dir)
            .await
            .context("Failed to upload files to S3")?;
        for upload in &uploaded {
            tracing::info!(
                "  - s3://{}/{} ({} bytes)",
                upload.bucket,
                upload.key,
                upload.size_bytes
            );
        }
        let total_bytes: u64 = uploaded.iter().map(|u| u.size_bytes).sum();
        tracing::info!(
            "Uploaded {} files ({} bytes) to s3://{}",
            uploaded.len(),
            total_bytes,
            s3.bucket()
        );
    } else {
        tracing::info!("S3 upload disabled, files left in {}", config.output_dir.display());
    }

    let elapsed = start_time.elapsed();
    tracing::info!("");
    tracing::info!("===========================================");
    tracing::info!("Export completed in {:.2?}", elapsed);
    tracing::info!("===========================================");

    Ok(())
}
