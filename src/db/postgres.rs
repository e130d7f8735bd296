//! PostgreSQL connection: schema introspection and full-table reads

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};

use super::types::{ColumnBuffer, ColumnInfo, ConnectionConfig, TableData, TableRef};
use super::TableSource;

pub struct PostgresConnection {
    client: Client,
}

impl PostgresConnection {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(&config.connection_url(), NoTls)
            .await
            .with_context(|| {
                format!("Error connecting to PostgreSQL at {}", config.display_url())
            })?;

        // The connection object drives the socket; it must run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    /// Checks the connection
    pub async fn test_connection(&self) -> Result<()> {
        self.client.query("SELECT 1", &[]).await?;
        Ok(())
    }

    /// Lists the base tables of a schema
    pub async fn get_tables(&self, schema: &str) -> Result<Vec<TableRef>> {
        let query = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = self
            .client
            .query(query, &[&schema])
            .await
            .with_context(|| format!("Error listing tables of schema '{}'", schema))?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get(0)?;
            tables.push(TableRef::new(schema, name));
        }

        Ok(tables)
    }

    /// Column descriptors of a table, taken from the declared types of `SELECT *`
    pub async fn get_columns(&self, table: &TableRef) -> Result<Vec<ColumnInfo>> {
        let statement = self
            .client
            .prepare(&format!("SELECT * FROM {}", table.quoted()))
            .await
            .with_context(|| format!("Error describing table {}", table.full_name()))?;

        Ok(statement
            .columns()
            .iter()
            .map(|c| ColumnInfo::from_pg_type(c.name(), c.type_()))
            .collect())
    }

    /// Reads every row of a table into memory
    pub async fn read_rows(&self, table: &TableRef) -> Result<TableData> {
        let columns = self.get_columns(table).await?;

        let select_list = columns
            .iter()
            .map(ColumnInfo::select_expr)
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!("SELECT {} FROM {}", select_list, table.quoted());

        let rows = self
            .client
            .query(&query, &[])
            .await
            .with_context(|| format!("Error reading table {}", table.full_name()))?;

        let mut data = TableData::empty(columns, rows.len());
        let TableData { columns, buffers } = &mut data;
        for row in &rows {
            for (idx, buffer) in buffers.iter_mut().enumerate() {
                push_value(buffer, row, idx).with_context(|| {
                    format!(
                        "Error decoding column '{}' of {}",
                        columns[idx].name,
                        table.full_name()
                    )
                })?;
            }
        }

        Ok(data)
    }
}

#[async_trait]
impl TableSource for PostgresConnection {
    async fn list_tables(&self, schema: &str) -> Result<Vec<TableRef>> {
        self.get_tables(schema).await
    }

    async fn read_table(&self, table: &TableRef) -> Result<TableData> {
        self.read_rows(table).await
    }
}

/// Decodes one cell into the column buffer
fn push_value(buffer: &mut ColumnBuffer, row: &Row, idx: usize) -> Result<(), tokio_postgres::Error> {
    match buffer {
        ColumnBuffer::Boolean(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::Int16(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::Int32(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::Int64(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::Float32(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::Float64(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::Text(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::Binary(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::Date(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::Time(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::Timestamp(v) => v.push(row.try_get(idx)?),
        ColumnBuffer::TimestampTz(v) => v.push(row.try_get(idx)?),
    }
    Ok(())
}
