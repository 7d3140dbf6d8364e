//! Helper utilities shared by the engine connectors.

use crate::models::{ColumnDescriptor, ColumnKind, EngineKind, TableDescriptor};

/// Quotes an identifier for the given engine, escaping embedded quotes.
pub fn quote_ident(engine: EngineKind, ident: &str) -> String {
    match engine {
        EngineKind::MySQL => format!("`{}`", ident.replace('`', "``")),
        EngineKind::SqlServer => format!("[{}]", ident.replace(']', "]]")),
        EngineKind::PostgreSQL | EngineKind::Synthetic => {
            format!("\"{}\"", ident.replace('"', "\"\""))
        }
    }
}

/// Quotes `schema.table` for the given engine.
pub fn quote_table(engine: EngineKind, table: &TableDescriptor) -> String {
    format!(
        "{}.{}",
        quote_ident(engine, &table.schema),
        quote_ident(engine, &table.name)
    )
}

/// Maps a declared catalog type to a coarse column kind.
pub fn classify_declared_type(engine: EngineKind, declared_type: &str) -> ColumnKind {
    let lower = declared_type.trim().to_ascii_lowercase();
    // Strip length/precision modifiers: varchar(255) -> varchar
    let base = lower.split('(').next().unwrap_or("").trim();

    if engine == EngineKind::SqlServer && base == "bit" {
        return ColumnKind::Boolean;
    }
    if engine == EngineKind::MySQL && lower.starts_with("tinyint(1)") {
        return ColumnKind::Boolean;
    }

    match base {
        "char" | "character" | "varchar" | "character varying" | "text" | "tinytext"
        | "mediumtext" | "longtext" | "nchar" | "nvarchar" | "ntext" | "citext" | "name"
        | "bpchar" | "enum" | "set" | "json" | "jsonb" | "xml" | "sysname" => ColumnKind::Text,
        "smallint" | "integer" | "int" | "int2" | "int4" | "int8" | "bigint" | "tinyint"
        | "mediumint" | "decimal" | "numeric" | "real" | "double precision" | "double"
        | "float" | "float4" | "float8" | "money" | "smallmoney" | "serial" | "bigserial" => {
            ColumnKind::Numeric
        }
        "date" | "time" | "timestamp" | "timestamptz" | "datetime" | "datetime2"
        | "smalldatetime" | "datetimeoffset" | "interval" | "year" => ColumnKind::Temporal,
        "timestamp with time zone" | "timestamp without time zone" | "time with time zone"
        | "time without time zone" => ColumnKind::Temporal,
        "boolean" | "bool" => ColumnKind::Boolean,
        "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary"
        | "image" | "bit varying" | "geometry" | "geography" | "rowversion" => {
            ColumnKind::Binary
        }
        _ => ColumnKind::Other,
    }
}

/// One row of a `information_schema.columns`-style catalog query.
#[derive(Debug, Clone)]
pub struct CatalogRow {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub declared_type: String,
    pub nullable: bool,
    pub ordinal_position: u32,
    /// Raw engine estimate; negative values mean "unknown"
    pub estimated_rows: Option<i64>,
}

/// Groups column-level catalog rows into table descriptors.
///
/// Rows must arrive ordered by schema, table and ordinal position. Tables keep
/// their first-appearance order as `declaration_index`.
pub fn group_catalog_rows(engine: EngineKind, rows: Vec<CatalogRow>) -> Vec<TableDescriptor> {
    let mut tables: Vec<TableDescriptor> = Vec::new();

    for row in rows {
        let is_same_table = tables
            .last()
            .is_some_and(|t| t.schema == row.schema && t.name == row.table);

        if !is_same_table {
            let mut table = TableDescriptor::new(&row.schema, &row.table, tables.len());
            table.estimated_rows = row
                .estimated_rows
                .and_then(|estimate| u64::try_from(estimate).ok());
            tables.push(table);
        }

        let kind = classify_declared_type(engine, &row.declared_type);
        if let Some(table) = tables.last_mut() {
            table.columns.push(ColumnDescriptor::new(
                row.column,
                row.declared_type,
                kind,
                row.nullable,
                row.ordinal_position,
            ));
        }
    }

    tables
}

/// Converts a driver error into a message safe for reports.
///
/// Only the first line is kept and long messages are truncated, so that
/// driver errors echoing statement text cannot carry sampled values along.
pub fn sanitize_driver_message(message: &str) -> String {
    const MAX_LEN: usize = 160;
    let first_line = message.lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= MAX_LEN {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(MAX_LEN).collect();
        format!("{}...", truncated)
    }
}
