//! Unit tests for the SQL Server connector.

use super::*;
use crate::models::{ColumnDescriptor, ColumnKind};

fn patients_table(rows: Option<u64>) -> TableDescriptor {
    let mut table = TableDescriptor::new("dbo", "patients", 0);
    table.estimated_rows = rows;
    table
        .columns
        .push(ColumnDescriptor::new("diagnosis", "nvarchar", ColumnKind::Text, true, 1));
    table
        .columns
        .push(ColumnDescriptor::new("scan", "varbinary", ColumnKind::Binary, true, 2));
    table
        .columns
        .push(ColumnDescriptor::new("active", "bit", ColumnKind::Boolean, false, 3));
    table
}

#[test]
fn test_first_n_query_uses_top() {
    let (sql, plan) =
        build_sample_query(&patients_table(Some(1_000)), 100, OffsetStrategy::FirstN).unwrap();
    assert_eq!(
        sql,
        "SELECT TOP (@P1) CAST([diagnosis] AS NVARCHAR(MAX)) AS [diagnosis], CAST([active] AS NVARCHAR(MAX)) AS [active] FROM [dbo].[patients]"
    );
    assert!(plan.is_none());
}

#[test]
fn test_scatter_query_uses_tablesample() {
    let (sql, plan) = build_sample_query(
        &patients_table(Some(1_000_000)),
        500,
        OffsetStrategy::Scatter { seed: 12 },
    )
    .unwrap();
    assert!(sql.contains("TABLESAMPLE (0.0500 PERCENT) REPEATABLE (12)"));
    assert!(plan.is_some());
}

#[test]
fn test_scatter_percent_matches_row_limit() {
    let (sql, plan) = build_sample_query(
        &patients_table(Some(100_000)),
        300,
        OffsetStrategy::Scatter { seed: 3 },
    )
    .unwrap();
    assert!((plan.unwrap().sample_percent - 0.3).abs() < 1e-9);
    assert!(sql.starts_with("SELECT TOP (@P1) "));
    assert!(sql.ends_with("TABLESAMPLE (0.3000 PERCENT) REPEATABLE (3)"));
}

#[test]
fn test_brackets_are_escaped() {
    let mut table = TableDescriptor::new("dbo", "a]b", 0);
    table
        .columns
        .push(ColumnDescriptor::new("c]d", "nvarchar", ColumnKind::Text, true, 1));
    let (sql, _) = build_sample_query(&table, 10, OffsetStrategy::FirstN).unwrap();
    assert!(sql.contains("[c]]d]"));
    assert!(sql.contains("[dbo].[a]]b]"));
}
