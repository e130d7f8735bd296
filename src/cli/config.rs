//! CLI configuration from environment variables

use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::db::ConnectionConfig;
use crate::export::{ParquetCompression, ParquetOptions};
use crate::storage::S3Config;

/// CLI configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct CliConfig {
    // PostgreSQL
    pub pg_host: String,
    pub pg_port: String,
    pub pg_database: String,
    pub pg_user: String,
    pub pg_password: String,
    pub pg_schema: String,

    // Tables filter (comma-separated, empty = all)
    pub tables: Vec<String>,

    // Parquet output
    pub output_dir: PathBuf,
    pub compression: ParquetCompression,
    pub row_group_size: usize,

    // S3
    pub s3_enabled: bool,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_region: String,
    pub s3_bucket: String,
    pub s3_folder: String,
}

impl CliConfig {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{} is required", key));
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let s3_enabled = parse_flag(&optional("S3_ENABLED", "true"))
            .context("S3_ENABLED must be true or false")?;

        let config = Self {
            // PostgreSQL (required)
            pg_host: required("PG_HOST")?,
            pg_port: optional("PG_PORT", "5432"),
            pg_database: required("PG_DATABASE")?,
            pg_user: required("PG_USER")?,
            pg_password: required("PG_PASSWORD")?,
            pg_schema: optional("PG_SCHEMA", "public"),

            tables: optional("TABLES", "")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),

            output_dir: PathBuf::from(optional("OUTPUT_DIR", "./parquet")),
            compression: optional("PARQUET_COMPRESSION", "snappy")
                .parse::<ParquetCompression>()
                .map_err(|e: String| anyhow!(e))
                .context("PARQUET_COMPRESSION is invalid")?,
            row_group_size: optional("PARQUET_ROW_GROUP_SIZE", "1048576")
                .parse::<usize>()
                .context("PARQUET_ROW_GROUP_SIZE must be a number")?,

            // S3 (required only when uploads are enabled)
            s3_enabled,
            aws_access_key_id: lookup("AWS_ACCESS_KEY_ID").unwrap_or_default(),
            aws_secret_access_key: lookup("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
            aws_region: optional("AWS_REGION", "us-east-1"),
            s3_bucket: lookup("S3_BUCKET").unwrap_or_default(),
            s3_folder: optional("S3_FOLDER", ""),
        };

        if config.s3_enabled {
            for (key, value) in [
                ("AWS_ACCESS_KEY_ID", &config.aws_access_key_id),
                ("AWS_SECRET_ACCESS_KEY", &config.aws_secret_access_key),
                ("S3_BUCKET", &config.s3_bucket),
            ] {
                if value.trim().is_empty() {
                    return Err(anyhow!("{} is required when S3_ENABLED=true", key));
                }
            }
        }

        Ok(config)
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(
            self.pg_user.clone(),
            self.pg_password.clone(),
            self.pg_host.clone(),
            self.pg_port.clone(),
            self.pg_database.clone(),
        )
    }

    pub fn parquet_options(&self) -> ParquetOptions {
        ParquetOptions::default()
            .with_compression(self.compression)
            .with_max_row_group_size(self.row_group_size)
    }

    pub fn s3_config(&self) -> S3Config {
        S3Config {
            access_key_id: self.aws_access_key_id.clone(),
            secret_access_key: self.aws_secret_access_key.clone(),
            region: self.aws_region.clone(),
            bucket: self.s3_bucket.clone(),
        }
    }
}

/// Boolean env flag: true/false, 1/0, yes/no, on/off (case-insensitive)
fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(anyhow!("unrecognised flag value '{}'", other)),
    }
}
