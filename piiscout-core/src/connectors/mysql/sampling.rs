//! MySQL row sampling.
//!
//! MySQL has no `TABLESAMPLE`, so `Scatter` numbers rows with
//! `ROW_NUMBER() OVER ()` and keeps every `stride`-th row starting at the
//! seeded offset. The row number doubles as the row locator.

use crate::Result;
use crate::connectors::helpers::{quote_ident, quote_table, sanitize_driver_message};
use crate::connectors::sampling::ScatterPlan;
use crate::error::ScanError;
use crate::models::{EngineKind, OffsetStrategy, RowLocator, SampleBatch, TableDescriptor};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

const ROW_NUMBER_ALIAS: &str = "piiscout_rn";

/// Builds the sampling statement for a table.
///
/// Returns `None` when the table has no sampleable columns. `FirstN` takes
/// one bound parameter (limit); scatter takes three (offset, stride, limit).
pub fn build_sample_query(
    table: &TableDescriptor,
    limit: u32,
    strategy: OffsetStrategy,
) -> Option<(String, Option<ScatterPlan>)> {
    let projection: Vec<String> = table
        .sampleable_columns()
        .map(|c| format!("CAST({} AS CHAR)", quote_ident(EngineKind::MySQL, &c.name)))
        .collect();
    if projection.is_empty() {
        return None;
    }

    let from = quote_table(EngineKind::MySQL, table);
    let plan = match strategy {
        OffsetStrategy::FirstN => None,
        OffsetStrategy::Scatter { seed } => ScatterPlan::for_table(seed, table.estimated_rows, limit),
    };

    let sql = match plan {
        Some(_) => format!(
            "SELECT {projection}, {rn} FROM (SELECT src.*, ROW_NUMBER() OVER () AS {rn} FROM {from} AS src) AS sampled WHERE MOD({rn} - 1 + ?, ?) = 0 LIMIT ?",
            projection = projection.join(", "),
            rn = ROW_NUMBER_ALIAS,
            from = from,
        ),
        None => format!("SELECT {} FROM {} LIMIT ?", projection.join(", "), from),
    };

    Some((sql, plan))
}

fn row_number(row: &MySqlRow, index: usize) -> Option<u64> {
    row.try_get::<u64, _>(index)
        .ok()
        .or_else(|| row.try_get::<i64, _>(index).ok().and_then(|v| u64::try_from(v).ok()))
}

pub(super) async fn sample_rows(
    pool: &MySqlPool,
    table: &TableDescriptor,
    limit: u32,
    strategy: OffsetStrategy,
) -> Result<SampleBatch> {
    let qualified = table.qualified_name();
    let columns: Vec<String> = table.sampleable_columns().map(|c| c.name.clone()).collect();
    let mut batch = SampleBatch::new(&qualified, columns, strategy);

    let Some((sql, plan)) = build_sample_query(table, limit, strategy) else {
        return Ok(batch);
    };

    tracing::debug!(
        "Sampling up to {} rows from {}.{} ({})",
        limit,
        table.schema,
        table.name,
        if plan.is_some() { "scatter" } else { "first-n" }
    );

    let mut query = sqlx::query(&sql);
    if let Some(plan) = &plan {
        query = query
            .bind(plan.stride.saturating_sub(plan.start))
            .bind(plan.stride);
    }

    let rows = query
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            let message = sanitize_driver_message(&e.to_string());
            ScanError::sampling_failed(&qualified, message, e)
        })?;

    let width = batch.columns.len();
    for row in rows.iter().take(limit as usize) {
        let index = batch.next_index();
        let locator = match plan {
            Some(plan) => row_number(row, width)
                .map(|rn| RowLocator(rn.saturating_sub(1)))
                .unwrap_or_else(|| plan.locator(index)),
            None => RowLocator(index),
        };
        let cells = (0..width)
            .map(|i| row.try_get::<Option<String>, _>(i).ok().flatten())
            .collect();
        batch.push_row(locator, cells);
    }

    Ok(batch)
}
