//! Table prioritization.
//!
//! Ranks introspected tables by how likely they are to hold personal data,
//! so the planner can select the most valuable tables first and the scheduler
//! covers them before the global deadline.
//!
//! The ranking is a pure function of the schema: no randomness and no clock.
//! Repeated scans of an unchanged schema produce the same order.

use crate::hints::table_name_score;
use crate::models::{ColumnDescriptor, ColumnKind, TableDescriptor};
use serde::Serialize;
use std::sync::Arc;

/// Weight of the aggregated column hint score.
pub const COLUMN_HINT_WEIGHT: f64 = 0.6;
/// Weight of the sensitive table-name token score.
pub const TABLE_NAME_WEIGHT: f64 = 0.25;
/// Weight of the inverse size score.
pub const SIZE_WEIGHT: f64 = 0.15;

/// Added to every text column, hinted or not.
const TEXT_TYPE_BONUS: f64 = 0.05;
/// Share of each non-maximal hinted column added to the column score.
const SECONDARY_COLUMN_SHARE: f64 = 0.1;
/// Size score used when the catalog has no row estimate.
const UNKNOWN_SIZE_SCORE: f64 = 0.5;

/// The three components of a priority score, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriorityBreakdown {
    pub column_hint: f64,
    pub table_name: f64,
    pub size: f64,
}

impl PriorityBreakdown {
    /// Weighted sum of the components.
    pub fn score(&self) -> f64 {
        COLUMN_HINT_WEIGHT * self.column_hint
            + TABLE_NAME_WEIGHT * self.table_name
            + SIZE_WEIGHT * self.size
    }
}

/// A table with its position in the priority order.
#[derive(Debug, Clone)]
pub struct RankedTable {
    pub table: Arc<TableDescriptor>,
    /// 1-based position, 1 is scanned first
    pub rank: usize,
    pub priority_score: f64,
    pub breakdown: PriorityBreakdown,
}

fn column_score(column: &ColumnDescriptor) -> f64 {
    if !column.kind.is_sampleable() {
        return 0.0;
    }
    let bonus = if column.kind == ColumnKind::Text {
        TEXT_TYPE_BONUS
    } else {
        0.0
    };
    (column.name_hint_score + bonus).min(1.0)
}

/// Aggregates per-column hints: the strongest column plus a small share of
/// every other hinted column, clamped to 1.
pub fn column_hint_score(table: &TableDescriptor) -> f64 {
    let mut scores: Vec<f64> = table
        .columns
        .iter()
        .map(column_score)
        .filter(|s| *s > 0.0)
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.sort_by(|a, b| b.total_cmp(a));
    let rest: f64 = scores[1..].iter().sum();
    (scores[0] + SECONDARY_COLUMN_SHARE * rest).min(1.0)
}

/// Inverse size score: 1.0 for empty tables, decaying logarithmically.
pub fn size_score(estimated_rows: Option<u64>) -> f64 {
    match estimated_rows {
        None => UNKNOWN_SIZE_SCORE,
        Some(rows) => {
            let thousands = rows as f64 / 1000.0;
            1.0 / (1.0 + (1.0 + thousands).log10())
        }
    }
}

/// Computes the priority components for one table.
pub fn score_table(table: &TableDescriptor) -> PriorityBreakdown {
    PriorityBreakdown {
        column_hint: column_hint_score(table),
        table_name: table_name_score(&table.name),
        size: size_score(table.estimated_rows),
    }
}

/// Ranks tables by descending priority score.
///
/// Ties are broken by catalog declaration order.
///
/// # Example
/// ```rust
/// use piiscout_core::models::{ColumnDescriptor, ColumnKind, TableDescriptor};
/// use piiscout_core::prioritizer::rank_tables;
///
/// let mut audit = TableDescriptor::new("public", "audit_log", 0);
/// audit.columns.push(ColumnDescriptor::new("id", "int", ColumnKind::Numeric, false, 1));
/// let mut users = TableDescriptor::new("public", "users", 1);
/// users.columns.push(ColumnDescriptor::new("email", "text", ColumnKind::Text, true, 1));
///
/// let ranked = rank_tables(vec![audit, users]);
/// assert_eq!(ranked[0].table.name, "users");
/// assert_eq!(ranked[0].rank, 1);
/// ```
pub fn rank_tables(tables: Vec<TableDescriptor>) -> Vec<RankedTable> {
    let mut scored: Vec<(TableDescriptor, PriorityBreakdown)> = tables
        .into_iter()
        .map(|table| {
            let breakdown = score_table(&table);
            (table, breakdown)
        })
        .collect();

    scored.sort_by(|(a, a_score), (b, b_score)| {
        b_score
            .score()
            .total_cmp(&a_score.score())
            .then_with(|| a.declaration_index.cmp(&b.declaration_index))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (table, breakdown))| RankedTable {
            table: Arc::new(table),
            rank: index.saturating_add(1),
            priority_score: breakdown.score(),
            breakdown,
        })
        .collect()
}
