//! SQL Server catalog introspection.

use super::connection::Session;
use crate::Result;
use crate::connectors::helpers::{CatalogRow, group_catalog_rows};
use crate::error::ScanError;
use crate::models::{EngineKind, TableDescriptor};

const CATALOG_QUERY: &str = r#"
    SELECT
        c.TABLE_SCHEMA,
        c.TABLE_NAME,
        c.COLUMN_NAME,
        c.DATA_TYPE,
        CAST(CASE WHEN c.IS_NULLABLE = 'YES' THEN 1 ELSE 0 END AS INT) AS is_nullable,
        CAST(c.ORDINAL_POSITION AS INT) AS ordinal_position,
        CAST((
            SELECT SUM(p.rows)
            FROM sys.partitions p
            WHERE p.object_id = OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME))
                AND p.index_id IN (0, 1)
        ) AS BIGINT) AS estimated_rows
    FROM INFORMATION_SCHEMA.COLUMNS c
    JOIN INFORMATION_SCHEMA.TABLES t
        ON t.TABLE_SCHEMA = c.TABLE_SCHEMA
        AND t.TABLE_NAME = c.TABLE_NAME
        AND t.TABLE_TYPE = 'BASE TABLE'
    WHERE c.TABLE_SCHEMA NOT IN ('sys', 'INFORMATION_SCHEMA')
"#;

const ORDER_CLAUSE: &str = " ORDER BY c.TABLE_SCHEMA, c.TABLE_NAME, c.ORDINAL_POSITION";

fn text(row: &tiberius::Row, index: usize, field: &str) -> Result<String> {
    row.try_get::<&str, _>(index)
        .map_err(|e| ScanError::introspection_failed(format!("Failed to parse {}", field), e))?
        .map(str::to_string)
        .ok_or_else(|| ScanError::configuration(format!("Catalog returned NULL {}", field)))
}

/// Lists base tables with their `sys.partitions` row estimates.
pub(super) async fn list_tables(
    client: &mut Session,
    schema: Option<&str>,
) -> Result<Vec<TableDescriptor>> {
    let stream = match schema {
        Some(schema) => {
            let sql = format!("{} AND c.TABLE_SCHEMA = @P1{}", CATALOG_QUERY, ORDER_CLAUSE);
            client.query(sql, &[&schema]).await
        }
        None => {
            let sql = format!("{}{}", CATALOG_QUERY, ORDER_CLAUSE);
            client.query(sql, &[]).await
        }
    }
    .map_err(|e| ScanError::introspection_failed("Failed to read INFORMATION_SCHEMA.COLUMNS", e))?;

    let rows = stream
        .into_first_result()
        .await
        .map_err(|e| ScanError::introspection_failed("Failed to read catalog rows", e))?;

    let mut catalog = Vec::with_capacity(rows.len());
    for row in &rows {
        catalog.push(CatalogRow {
            schema: text(row, 0, "TABLE_SCHEMA")?,
            table: text(row, 1, "TABLE_NAME")?,
            column: text(row, 2, "COLUMN_NAME")?,
            declared_type: text(row, 3, "DATA_TYPE")?,
            nullable: row.try_get::<i32, _>(4).ok().flatten().is_none_or(|v| v != 0),
            ordinal_position: row
                .try_get::<i32, _>(5)
                .ok()
                .flatten()
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(0),
            estimated_rows: row.try_get::<i64, _>(6).ok().flatten(),
        });
    }

    let tables = group_catalog_rows(EngineKind::SqlServer, catalog);
    tracing::info!("Discovered {} SQL Server tables", tables.len());
    Ok(tables)
}
