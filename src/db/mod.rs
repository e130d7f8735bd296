pub mod postgres;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

pub use postgres::PostgresConnection;
pub use types::*;

/// Read side of the export: schema introspection and full-table reads
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Tables of `schema`, in the order the database returns them
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableRef>>;

    /// Whole table materialised in memory
    async fn read_table(&self, table: &TableRef) -> Result<TableData>;
}
