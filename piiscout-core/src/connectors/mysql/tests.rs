//! Unit tests for the MySQL connector.

use super::*;
use crate::models::{ColumnDescriptor, ColumnKind};

fn customers_table(rows: Option<u64>) -> TableDescriptor {
    let mut table = TableDescriptor::new("shop", "customers", 0);
    table.estimated_rows = rows;
    table
        .columns
        .push(ColumnDescriptor::new("name", "varchar(80)", ColumnKind::Text, false, 1));
    table
        .columns
        .push(ColumnDescriptor::new("photo", "longblob", ColumnKind::Binary, true, 2));
    table
        .columns
        .push(ColumnDescriptor::new("phone", "varchar(20)", ColumnKind::Text, true, 3));
    table
}

#[test]
fn test_first_n_query() {
    let (sql, plan) =
        build_sample_query(&customers_table(Some(10_000)), 100, OffsetStrategy::FirstN).unwrap();
    assert_eq!(
        sql,
        "SELECT CAST(`name` AS CHAR), CAST(`phone` AS CHAR) FROM `shop`.`customers` LIMIT ?"
    );
    assert!(plan.is_none());
}

#[test]
fn test_scatter_query_uses_row_number_modulo() {
    let (sql, plan) = build_sample_query(
        &customers_table(Some(10_000)),
        300,
        OffsetStrategy::Scatter { seed: 5 },
    )
    .unwrap();
    assert!(sql.contains("ROW_NUMBER() OVER ()"));
    assert!(sql.contains("MOD(piiscout_rn - 1 + ?, ?) = 0"));
    assert!(sql.ends_with("LIMIT ?"));
    let plan = plan.unwrap();
    assert_eq!(plan.stride, 34);
}

#[test]
fn test_scatter_without_estimate_reads_first_rows() {
    let (sql, plan) = build_sample_query(
        &customers_table(None),
        300,
        OffsetStrategy::Scatter { seed: 5 },
    )
    .unwrap();
    assert!(!sql.contains("ROW_NUMBER"));
    assert!(plan.is_none());
}

#[test]
fn test_backticks_are_escaped() {
    let mut table = TableDescriptor::new("shop", "we`ird", 0);
    table
        .columns
        .push(ColumnDescriptor::new("c`1", "text", ColumnKind::Text, true, 1));
    let (sql, _) = build_sample_query(&table, 10, OffsetStrategy::FirstN).unwrap();
    assert!(sql.contains("`c``1`"));
    assert!(sql.contains("`shop`.`we``ird`"));
}
