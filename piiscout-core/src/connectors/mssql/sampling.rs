//! SQL Server row sampling with `TOP` and `TABLESAMPLE ... REPEATABLE`.

use super::connection::Session;
use crate::Result;
use crate::connectors::helpers::{quote_ident, quote_table, sanitize_driver_message};
use crate::connectors::sampling::ScatterPlan;
use crate::error::ScanError;
use crate::models::{EngineKind, OffsetStrategy, RowLocator, SampleBatch, TableDescriptor};
use futures::TryStreamExt;

/// Builds the sampling statement for a table.
///
/// Returns `None` when the table has no sampleable columns. The statement
/// takes the row limit as `@P1`.
pub fn build_sample_query(
    table: &TableDescriptor,
    limit: u32,
    strategy: OffsetStrategy,
) -> Option<(String, Option<ScatterPlan>)> {
    let projection: Vec<String> = table
        .sampleable_columns()
        .map(|c| {
            let column = quote_ident(EngineKind::SqlServer, &c.name);
            format!("CAST({} AS NVARCHAR(MAX)) AS {}", column, column)
        })
        .collect();
    if projection.is_empty() {
        return None;
    }

    let from = quote_table(EngineKind::SqlServer, table);
    let plan = match strategy {
        OffsetStrategy::FirstN => None,
        OffsetStrategy::Scatter { seed } => ScatterPlan::for_table(seed, table.estimated_rows, limit),
    };

    let sql = match &plan {
        Some(plan) => format!(
            "SELECT TOP (@P1) {} FROM {} TABLESAMPLE ({} PERCENT) REPEATABLE ({})",
            projection.join(", "),
            from,
            plan.percent_literal(),
            plan.repeatable_seed()
        ),
        None => format!("SELECT TOP (@P1) {} FROM {}", projection.join(", "), from),
    };

    Some((sql, plan))
}

pub(super) async fn sample_rows(
    client: &mut Session,
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

    let top = i32::try_from(limit).unwrap_or(i32::MAX);
    let mut rows = client
        .query(sql, &[&top])
        .await
        .map_err(|e| {
            let message = sanitize_driver_message(&e.to_string());
            ScanError::sampling_failed(&qualified, message, e)
        })?
        .into_row_stream();

    let width = batch.columns.len();
    while batch.len() < limit as usize {
        let Some(row) = rows.try_next().await.map_err(|e| {
            let message = sanitize_driver_message(&e.to_string());
            ScanError::sampling_failed(&qualified, message, e)
        })?
        else {
            break;
        };
        let index = batch.next_index();
        let locator = plan.map_or(RowLocator(index), |p| p.locator(index));
        let cells = (0..width)
            .map(|i| {
                row.try_get::<&str, _>(i)
                    .ok()
                    .flatten()
                    .map(str::to_string)
            })
            .collect();
        batch.push_row(locator, cells);
    }

    Ok(batch)
}
