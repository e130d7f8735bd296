//! Schema exporter: one Parquet file per table

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::writer::{write_parquet, ParquetOptions};
use crate::db::{TableRef, TableSource};

/// A table written to disk
#[derive(Debug, Clone)]
pub struct ExportedTable {
    pub table: TableRef,
    pub path: PathBuf,
    pub rows: u64,
}

/// Result of exporting a schema
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub tables: Vec<ExportedTable>,
}

impl ExportSummary {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Output file for a table.
///
/// Path separators in the table name are replaced with `_` so the file
/// always lands directly inside `output_dir`.
pub fn parquet_path(output_dir: &Path, table_name: &str) -> PathBuf {
    let file_stem: String = table_name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    output_dir.join(format!("{}.parquet", file_stem))
}

/// Keeps the discovered tables named in `filter` (case-insensitive).
///
/// An empty filter keeps everything. Names in the filter that were not
/// discovered are logged and skipped.
pub fn select_tables(discovered: Vec<TableRef>, filter: &[String]) -> Vec<TableRef> {
    if filter.is_empty() {
        return discovered;
    }

    for wanted in filter {
        if !discovered.iter().any(|t| t.name.eq_ignore_ascii_case(wanted)) {
            tracing::warn!("Table '{}' not found in schema, skipping", wanted);
        }
    }

    discovered
        .into_iter()
        .filter(|t| filter.iter().any(|wanted| t.name.eq_ignore_ascii_case(wanted)))
        .collect()
}

/// Exports the tables of `schema` to `{output_dir}/{table}.parquet`.
///
/// Tables are written in discovery order. The first failure stops the
/// export; files written before it are left in place.
pub async fn export_schema<S: TableSource + ?Sized>(
    source: &S,
    schema: &str,
    tables: &[String],
    output_dir: &Path,
    options: &ParquetOptions,
) -> Result<ExportSummary> {
    let discovered = source
        .list_tables(schema)
        .await
        .with_context(|| format!("Error listing tables of schema '{}'", schema))?;
    tracing::info!("Found {} tables in schema '{}'", discovered.len(), schema);

    let selected = select_tables(discovered, tables);
    if selected.is_empty() {
        tracing::warn!("No tables to export!");
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Error creating output directory {}", output_dir.display()))?;

    let mut summary = ExportSummary::default();

    for table in selected {
        let data = source
            .read_table(&table)
            .await
            .with_context(|| format!("Error reading table {}", table.full_name()))?;

        let path = parquet_path(output_dir, &table.name);
        let rows = write_parquet(&data, &path, options)
            .with_context(|| format!("Error writing {}", path.display()))?;

        tracing::debug!("Wrote {} rows of {} to {}", rows, table.full_name(), path.display());

        summary.tables.push(ExportedTable { table, path, rows });
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::{ColumnBuffer, ColumnInfo, TableData};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;
    use tokio_postgres::types::Type;

    /// In-memory schema: table name -> ids
    struct FakeSource {
        tables: Vec<(String, Vec<i64>)>,
        fail_on: Option<String>,
        reads: Mutex<Vec<String>>,
    }

    impl FakeSource {
        fn new(tables: &[(&str, Vec<i64>)]) -> Self {
            Self {
                tables: tables
                    .iter()
                    .map(|(name, ids)| (name.to_string(), ids.clone()))
                    .collect(),
                fail_on: None,
                reads: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TableSource for FakeSource {
        async fn list_tables(&self, schema: &str) -> Result<Vec<TableRef>> {
            Ok(self
                .tables
                .iter()
                .map(|(name, _)| TableRef::new(schema, name.clone()))
                .collect())
        }

        async fn read_table(&self, table: &TableRef) -> Result<TableData> {
            self.reads.lock().unwrap().push(table.name.clone());
            if self.fail_on.as_deref() == Some(table.name.as_str()) {
                anyhow::bail!("relation \"{}\" is broken", table.name);
            }
            let ids = self
                .tables
                .iter()
                .find(|(name, _)| *name == table.name)
                .map(|(_, ids)| ids.clone())
                .unwrap_or_default();

            Ok(TableData {
                columns: vec![ColumnInfo::from_pg_type("id", &Type::INT8)],
                buffers: vec![ColumnBuffer::Int64(ids.into_iter().map(Some).collect())],
            })
        }
    }

    fn parquet_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_one_file_per_table() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("nested").join("out");
        let source = FakeSource::new(&[
            ("orders", vec![1, 2, 3]),
            ("customers", vec![10]),
            ("empty", vec![]),
        ]);

        let summary = export_schema(&source, "public", &[], &out, &ParquetOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.tables.len(), 3);
        assert_eq!(summary.total_rows(), 4);
        assert_eq!(
            parquet_files(&out),
            vec!["customers.parquet", "empty.parquet", "orders.parquet"]
        );
        // Discovery order is kept
        assert_eq!(*source.reads.lock().unwrap(), vec!["orders", "customers", "empty"]);
    }

    #[tokio::test]
    async fn test_filter_restricts_tables() {
        let dir = tempdir().unwrap();
        let source = FakeSource::new(&[("orders", vec![1]), ("customers", vec![2]), ("audit", vec![])]);
        let filter = vec!["ORDERS".to_string(), "missing".to_string()];

        let summary = export_schema(&source, "public", &filter, dir.path(), &ParquetOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.tables.len(), 1);
        assert_eq!(summary.tables[0].table.name, "orders");
        assert_eq!(parquet_files(dir.path()), vec!["orders.parquet"]);
    }

    #[tokio::test]
    async fn test_existing_directory_is_reused() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("orders.parquet"), b"stale").unwrap();
        let source = FakeSource::new(&[("orders", vec![7, 8])]);

        let summary = export_schema(&source, "public", &[], dir.path(), &ParquetOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.tables[0].rows, 2);
        let bytes = std::fs::read(dir.path().join("orders.parquet")).unwrap();
        assert_eq!(&bytes[..4], b"PAR1");
    }

    #[tokio::test]
    async fn test_first_failure_aborts_remaining_tables() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::new(&[("a", vec![1]), ("b", vec![2]), ("c", vec![3])]);
        source.fail_on = Some("b".to_string());

        let err = export_schema(&source, "public", &[], dir.path(), &ParquetOptions::default())
            .await
            .unwrap_err();

        assert!(format!("{:#}", err).contains("public.b"));
        assert_eq!(*source.reads.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(parquet_files(dir.path()), vec!["a.parquet"]);
    }

    #[test]
    fn test_parquet_path() {
        let path = parquet_path(Path::new("/tmp/out"), "orders");
        assert_eq!(path, PathBuf::from("/tmp/out/orders.parquet"));
    }

    #[test]
    fn test_parquet_path_escapes_separators() {
        let out = Path::new("/tmp/out");
        assert_eq!(parquet_path(out, "a/b"), PathBuf::from("/tmp/out/a_b.parquet"));
        assert_eq!(parquet_path(out, "../x"), PathBuf::from("/tmp/out/.._x.parquet"));
        assert_eq!(parquet_path(out, "c\\d"), PathBuf::from("/tmp/out/c_d.parquet"));
        assert_eq!(parquet_path(out, "..").parent(), Some(out));
    }

    #[tokio::test]
    async fn test_table_names_with_separators_stay_in_output_dir() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let source = FakeSource::new(&[("a/b", vec![1]), ("../escape", vec![2])]);

        let summary = export_schema(&source, "public", &[], &out, &ParquetOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.tables.len(), 2);
        assert_eq!(parquet_files(&out), vec![".._escape.parquet", "a_b.parquet"]);
        assert!(!dir.path().join("escape.parquet").exists());
        for exported in &summary.tables {
            assert_eq!(exported.path.parent(), Some(out.as_path()));
        }
    }
}
