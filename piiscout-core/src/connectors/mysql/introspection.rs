//! MySQL catalog introspection.

use crate::Result;
use crate::connectors::helpers::{CatalogRow, group_catalog_rows};
use crate::error::ScanError;
use crate::models::{EngineKind, TableDescriptor};
use sqlx::{MySqlPool, Row};

const CATALOG_QUERY: &str = r#"
    SELECT
        CAST(c.TABLE_SCHEMA AS CHAR) AS table_schema,
        CAST(c.TABLE_NAME AS CHAR) AS table_name,
        CAST(c.COLUMN_NAME AS CHAR) AS column_name,
        CAST(c.COLUMN_TYPE AS CHAR) AS data_type,
        CAST(c.IS_NULLABLE = 'YES' AS SIGNED) AS is_nullable,
        CAST(c.ORDINAL_POSITION AS SIGNED) AS ordinal_position,
        CAST(t.TABLE_ROWS AS SIGNED) AS estimated_rows
    FROM INFORMATION_SCHEMA.COLUMNS c
    JOIN INFORMATION_SCHEMA.TABLES t
        ON t.TABLE_SCHEMA = c.TABLE_SCHEMA
        AND t.TABLE_NAME = c.TABLE_NAME
        AND t.TABLE_TYPE = 'BASE TABLE'
    WHERE c.TABLE_SCHEMA = COALESCE(?, DATABASE())
    ORDER BY c.TABLE_SCHEMA, c.TABLE_NAME, c.ORDINAL_POSITION
"#;

/// Lists base tables of one schema with their `TABLE_ROWS` estimates.
pub(super) async fn list_tables(
    pool: &MySqlPool,
    schema: Option<&str>,
) -> Result<Vec<TableDescriptor>> {
    let rows = sqlx::query(CATALOG_QUERY)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| ScanError::introspection_failed("Failed to read INFORMATION_SCHEMA.COLUMNS", e))?;

    let mut catalog = Vec::with_capacity(rows.len());
    for row in rows {
        catalog.push(CatalogRow {
            schema: row
                .try_get("table_schema")
                .map_err(|e| ScanError::introspection_failed("Failed to parse TABLE_SCHEMA", e))?,
            table: row
                .try_get("table_name")
                .map_err(|e| ScanError::introspection_failed("Failed to parse TABLE_NAME", e))?,
            column: row
                .try_get("column_name")
                .map_err(|e| ScanError::introspection_failed("Failed to parse COLUMN_NAME", e))?,
            declared_type: row
                .try_get("data_type")
                .map_err(|e| ScanError::introspection_failed("Failed to parse COLUMN_TYPE", e))?,
            nullable: row.try_get::<i64, _>("is_nullable").map_or(true, |v| v != 0),
            ordinal_position: row
                .try_get::<i64, _>("ordinal_position")
                .ok()
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(0),
            estimated_rows: row.try_get::<Option<i64>, _>("estimated_rows").ok().flatten(),
        });
    }

    let tables = group_catalog_rows(EngineKind::MySQL, catalog);
    tracing::info!("Discovered {} MySQL tables", tables.len());
    Ok(tables)
}
