//! PostgreSQL catalog introspection.

use crate::Result;
use crate::connectors::helpers::{CatalogRow, group_catalog_rows};
use crate::error::ScanError;
use crate::models::{EngineKind, TableDescriptor};
use sqlx::{PgPool, Row};

const CATALOG_QUERY: &str = r#"
    SELECT
        c.table_schema::text AS table_schema,
        c.table_name::text AS table_name,
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        (c.is_nullable = 'YES') AS is_nullable,
        c.ordinal_position::int4 AS ordinal_position,
        cls.reltuples::int8 AS estimated_rows
    FROM information_schema.columns c
    JOIN information_schema.tables t
        ON t.table_schema = c.table_schema
        AND t.table_name = c.table_name
        AND t.table_type = 'BASE TABLE'
    LEFT JOIN pg_namespace ns ON ns.nspname = c.table_schema
    LEFT JOIN pg_class cls ON cls.relnamespace = ns.oid AND cls.relname = c.table_name
    WHERE c.table_schema NOT IN ('information_schema', 'pg_catalog')
        AND c.table_schema NOT LIKE 'pg_toast%'
        AND c.table_schema NOT LIKE 'pg_temp%'
        AND ($1::text IS NULL OR c.table_schema = $1)
        AND has_table_privilege(quote_ident(c.table_schema) || '.' || quote_ident(c.table_name), 'SELECT')
    ORDER BY c.table_schema, c.table_name, c.ordinal_position
"#;

/// Lists readable base tables with their columns and `reltuples` estimates.
pub(super) async fn list_tables(
    pool: &PgPool,
    schema: Option<&str>,
) -> Result<Vec<TableDescriptor>> {
    let rows = sqlx::query(CATALOG_QUERY)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(|e| ScanError::introspection_failed("Failed to read information_schema.columns", e))?;

    let mut catalog = Vec::with_capacity(rows.len());
    for row in rows {
        catalog.push(CatalogRow {
            schema: row
                .try_get("table_schema")
                .map_err(|e| ScanError::introspection_failed("Failed to parse table_schema", e))?,
            table: row
                .try_get("table_name")
                .map_err(|e| ScanError::introspection_failed("Failed to parse table_name", e))?,
            column: row
                .try_get("column_name")
                .map_err(|e| ScanError::introspection_failed("Failed to parse column_name", e))?,
            declared_type: row
                .try_get("data_type")
                .map_err(|e| ScanError::introspection_failed("Failed to parse data_type", e))?,
            nullable: row.try_get("is_nullable").unwrap_or(true),
            ordinal_position: row
                .try_get::<i32, _>("ordinal_position")
                .ok()
                .and_then(|p| u32::try_from(p).ok())
                .unwrap_or(0),
            estimated_rows: row.try_get::<Option<i64>, _>("estimated_rows").ok().flatten(),
        });
    }

    let tables = group_catalog_rows(EngineKind::PostgreSQL, catalog);
    tracing::info!("Discovered {} PostgreSQL tables", tables.len());
    Ok(tables)
}
