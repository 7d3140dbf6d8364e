//! Scan mode planning.
//!
//! Each [`ScanMode`] maps to a fixed configuration tuple. The planner turns a
//! mode into an immutable [`ScanPlan`] and resolves the plan's table selection
//! strategy against the prioritizer's ranking, producing the ordered list of
//! [`ScanTarget`]s handed to the scheduler.
//!
//! The global timeout is independent of the number of tables. Workers, not
//! rows, are the lever for staying inside the budget.

use crate::Result;
use crate::connectors::sampling::scatter_seed;
use crate::error::ScanError;
use crate::models::{OffsetStrategy, ScanMode, TableDescriptor};
use crate::prioritizer::RankedTable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default wall-clock budget for a whole scan.
pub const DEFAULT_GLOBAL_TIMEOUT: Duration = Duration::from_secs(10);
/// Default budget for sampling and classifying one table.
pub const DEFAULT_PER_TABLE_TIMEOUT: Duration = Duration::from_secs(3);
/// Upper bound for operator worker overrides.
pub const MAX_WORKERS: usize = 8;
/// Upper bound for operator timeout overrides.
pub const MAX_GLOBAL_TIMEOUT: Duration = Duration::from_secs(3600);

/// Share of the ranked list selected by the simplified strategy.
const SIMPLIFIED_FRACTION: f64 = 0.55;
/// Share of the ranked list forming the DEEP top tier.
const PRIORITY_TIER_FRACTION: f64 = 0.2;
/// Row cap multiplier for the DEEP top tier.
const PRIORITY_TIER_MULTIPLIER: u32 = 2;

/// How tables are chosen from the ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSelectionStrategy {
    /// Top fraction of the ranking, first rows only
    Simplified,
    /// Every table, scattered rows capped at the target
    Comprehensive,
    /// Every table, with a raised cap for the top-priority tier
    PriorityDeep,
}

impl std::fmt::Display for TableSelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSelectionStrategy::Simplified => write!(f, "simplified"),
            TableSelectionStrategy::Comprehensive => write!(f, "comprehensive"),
            TableSelectionStrategy::PriorityDeep => write!(f, "priority_deep"),
        }
    }
}

/// Operator overrides applied on top of a mode's defaults.
///
/// # Example
/// ```rust
/// use piiscout_core::planner::ScanOptions;
/// use std::time::Duration;
///
/// let options = ScanOptions::default()
///     .with_global_timeout(Duration::from_secs(30))
///     .with_workers(4);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub global_timeout: Option<Duration>,
    pub per_table_timeout: Option<Duration>,
    pub worker_count: Option<usize>,
}

impl ScanOptions {
    pub fn with_global_timeout(mut self, timeout: Duration) -> Self {
        self.global_timeout = Some(timeout);
        self
    }

    pub fn with_per_table_timeout(mut self, timeout: Duration) -> Self {
        self.per_table_timeout = Some(timeout);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.worker_count = Some(workers);
        self
    }

    /// Validates the overrides.
    ///
    /// # Errors
    /// Returns a configuration error for zero or oversized timeouts, a
    /// per-table timeout longer than the global one, or a worker count
    /// outside `1..=MAX_WORKERS`.
    pub fn validate(&self) -> Result<()> {
        if let Some(global) = self.global_timeout {
            if global.is_zero() {
                return Err(ScanError::configuration("Global timeout must be greater than zero"));
            }
            if global > MAX_GLOBAL_TIMEOUT {
                return Err(ScanError::configuration(format!(
                    "Global timeout cannot exceed {} seconds",
                    MAX_GLOBAL_TIMEOUT.as_secs()
                )));
            }
        }

        if let Some(per_table) = self.per_table_timeout {
            if per_table.is_zero() {
                return Err(ScanError::configuration(
                    "Per-table timeout must be greater than zero",
                ));
            }
            let global = self.global_timeout.unwrap_or(DEFAULT_GLOBAL_TIMEOUT);
            if per_table > global {
                return Err(ScanError::configuration(format!(
                    "Per-table timeout ({:?}) cannot exceed the global timeout ({:?})",
                    per_table, global
                )));
            }
        }

        if let Some(workers) = self.worker_count
            && !(1..=MAX_WORKERS).contains(&workers)
        {
            return Err(ScanError::configuration(format!(
                "Worker count must be between 1 and {}",
                MAX_WORKERS
            )));
        }

        Ok(())
    }
}

/// Concrete parameters for one scan. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPlan {
    pub mode: ScanMode,
    pub target_rows_per_table: u32,
    pub worker_count: usize,
    pub table_selection_strategy: TableSelectionStrategy,
    pub global_timeout: Duration,
    pub per_table_timeout: Duration,
}

/// A selected table with its effective sampling parameters.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub table: Arc<TableDescriptor>,
    pub rank: usize,
    pub priority_score: f64,
    /// Maximum rows to sample from this table
    pub row_cap: u32,
    pub strategy: OffsetStrategy,
}

impl ScanPlan {
    /// The fixed configuration for `mode`.
    pub fn for_mode(mode: ScanMode) -> Self {
        let (target_rows_per_table, worker_count, table_selection_strategy) = match mode {
            ScanMode::Fast => (100, 2, TableSelectionStrategy::Simplified),
            ScanMode::Smart => (300, 3, TableSelectionStrategy::Comprehensive),
            ScanMode::Deep => (500, 3, TableSelectionStrategy::PriorityDeep),
        };
        Self {
            mode,
            target_rows_per_table,
            worker_count,
            table_selection_strategy,
            global_timeout: DEFAULT_GLOBAL_TIMEOUT,
            per_table_timeout: DEFAULT_PER_TABLE_TIMEOUT,
        }
    }

    /// The mode's configuration with operator overrides applied.
    ///
    /// # Errors
    /// Returns a configuration error if the overrides are invalid.
    pub fn with_options(mode: ScanMode, options: &ScanOptions) -> Result<Self> {
        options.validate()?;
        let mut plan = Self::for_mode(mode);
        if let Some(global) = options.global_timeout {
            plan.global_timeout = global;
        }
        if let Some(per_table) = options.per_table_timeout {
            plan.per_table_timeout = per_table;
        }
        // A shorter global budget also bounds each table
        plan.per_table_timeout = plan.per_table_timeout.min(plan.global_timeout);
        if let Some(workers) = options.worker_count {
            plan.worker_count = workers;
        }
        Ok(plan)
    }

    /// Number of tables the strategy selects out of `table_count`.
    pub fn selected_count(&self, table_count: usize) -> usize {
        match self.table_selection_strategy {
            TableSelectionStrategy::Simplified => {
                if table_count == 0 {
                    0
                } else {
                    let top = (table_count as f64 * SIMPLIFIED_FRACTION).round() as usize;
                    top.clamp(1, table_count)
                }
            }
            TableSelectionStrategy::Comprehensive | TableSelectionStrategy::PriorityDeep => {
                table_count
            }
        }
    }

    /// Size of the raised-cap tier for `priority_deep`.
    pub fn priority_tier_size(&self, table_count: usize) -> usize {
        match self.table_selection_strategy {
            TableSelectionStrategy::PriorityDeep => {
                (table_count as f64 * PRIORITY_TIER_FRACTION).ceil() as usize
            }
            _ => 0,
        }
    }

    fn row_cap(&self, table: &TableDescriptor, in_priority_tier: bool) -> u32 {
        let target = self.target_rows_per_table;
        if !in_priority_tier {
            return target;
        }
        let raised = target.saturating_mul(PRIORITY_TIER_MULTIPLIER);
        match table.estimated_rows {
            // Never ask for more rows than the table holds, nor less than target
            Some(rows) => {
                let rows = u32::try_from(rows).unwrap_or(u32::MAX);
                raised.min(rows.max(target))
            }
            None => raised,
        }
    }

    fn offset_strategy(&self, table: &TableDescriptor) -> OffsetStrategy {
        match self.table_selection_strategy {
            TableSelectionStrategy::Simplified => OffsetStrategy::FirstN,
            TableSelectionStrategy::Comprehensive | TableSelectionStrategy::PriorityDeep => {
                OffsetStrategy::Scatter {
                    seed: scatter_seed(table),
                }
            }
        }
    }

    /// Resolves the selection strategy against a ranked table list.
    ///
    /// The returned targets keep the ranking order, which the scheduler
    /// consumes FIFO.
    pub fn select_targets(&self, ranked: &[RankedTable]) -> Vec<ScanTarget> {
        let selected = self.selected_count(ranked.len());
        let tier = self.priority_tier_size(ranked.len());

        ranked
            .iter()
            .take(selected)
            .enumerate()
            .map(|(position, entry)| ScanTarget {
                table: Arc::clone(&entry.table),
                rank: entry.rank,
                priority_score: entry.priority_score,
                row_cap: self.row_cap(&entry.table, position < tier),
                strategy: self.offset_strategy(&entry.table),
            })
            .collect()
    }
}
