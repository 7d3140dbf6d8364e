//! PostgreSQL row sampling.
//!
//! `FirstN` reads rows in storage order. `Scatter` uses
//! `TABLESAMPLE BERNOULLI (p) REPEATABLE (seed)`, which gives the same sample
//! for the same seed as long as the table is unchanged.

use crate::Result;
use crate::connectors::helpers::{quote_ident, quote_table, sanitize_driver_message};
use crate::connectors::sampling::ScatterPlan;
use crate::error::ScanError;
use crate::models::{EngineKind, OffsetStrategy, RowLocator, SampleBatch, TableDescriptor};
use sqlx::{PgPool, Row};

/// Builds the sampling statement for a table.
///
/// Returns `None` when the table has no sampleable columns. The statement
/// takes the row limit as `$1`.
pub fn build_sample_query(
    table: &TableDescriptor,
    limit: u32,
    strategy: OffsetStrategy,
) -> Option<(String, Option<ScatterPlan>)> {
    let projection: Vec<String> = table
        .sampleable_columns()
        .map(|c| format!("{}::text", quote_ident(EngineKind::PostgreSQL, &c.name)))
        .collect();
    if projection.is_empty() {
        return None;
    }

    let from = quote_table(EngineKind::PostgreSQL, table);
    let plan = match strategy {
        OffsetStrategy::FirstN => None,
        OffsetStrategy::Scatter { seed } => ScatterPlan::for_table(seed, table.estimated_rows, limit),
    };

    let sql = match &plan {
        Some(plan) => format!(
            "SELECT {} FROM {} TABLESAMPLE BERNOULLI ({}) REPEATABLE ({}) LIMIT $1",
            projection.join(", "),
            from,
            plan.percent_literal(),
            plan.repeatable_seed()
        ),
        None => format!("SELECT {} FROM {} LIMIT $1", projection.join(", "), from),
    };

    Some((sql, plan))
}

pub(super) async fn sample_rows(
    pool: &PgPool,
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

    let rows = sqlx::query(&sql)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
        .map_err(|e| {
            let message = sanitize_driver_message(&e.to_string());
            ScanError::sampling_failed(&qualified, message, e)
        })?;

    for row in rows.iter().take(limit as usize) {
        let index = batch.next_index();
        let locator = plan.map_or(RowLocator(index), |p| p.locator(index));
        let cells = (0..batch.columns.len())
            .map(|i| row.try_get::<Option<String>, _>(i).ok().flatten())
            .collect();
        batch.push_row(locator, cells);
    }

    Ok(batch)
}
