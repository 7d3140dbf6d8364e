//! Bounded worker pool executing table scans under a global deadline.
//!
//! `worker_count` tasks pull [`ScanTarget`]s FIFO from the prioritized queue,
//! so the highest-value tables are covered first. Each table is bounded by
//! the per-table timeout. When the global deadline passes, no new tables are
//! dequeued, in-flight classification is cancelled, and whatever was collected
//! is returned.
//!
//! # Shared State
//! All cross-worker state lives in an explicit [`ScanContext`]. The findings
//! sink is the only mutable piece besides the work queue.

mod worker;

use crate::connectors::Connector;
use crate::detectors::DetectorRegistry;
use crate::models::{Finding, SkipReason};
use crate::planner::{ScanPlan, ScanTarget};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use worker::{BatchClassification, classify_batch};

/// Per-scan state handed to every worker.
#[derive(Debug)]
pub struct ScanContext {
    pub deadline: Instant,
    pub per_table_timeout: Duration,
    pub registry: Arc<DetectorRegistry>,
    /// Cancelled when the global deadline passes
    pub cancel: CancellationToken,
    sink: Mutex<Vec<Finding>>,
}

impl ScanContext {
    /// Context whose global deadline counts from `started`.
    pub fn starting_at(plan: &ScanPlan, registry: Arc<DetectorRegistry>, started: Instant) -> Self {
        Self {
            deadline: started + plan.global_timeout,
            per_table_timeout: plan.per_table_timeout,
            registry,
            cancel: CancellationToken::new(),
            sink: Mutex::new(Vec::new()),
        }
    }

    /// Whether the global deadline has passed or the scan was cancelled.
    pub fn is_expired(&self) -> bool {
        self.cancel.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Appends the findings of one table.
    pub fn record_findings(&self, findings: Vec<Finding>) {
        if findings.is_empty() {
            return;
        }
        // A poisoned sink still holds valid findings
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.extend(findings);
    }

    fn take_findings(&self) -> Vec<Finding> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *sink)
    }
}

/// How processing of one table ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRunStatus {
    Scanned,
    /// Classification stopped at the global deadline
    Partial,
    Skipped(SkipReason),
}

/// Result of processing one dequeued table.
#[derive(Debug, Clone)]
pub struct TableOutcome {
    pub table: String,
    pub rank: usize,
    pub priority_score: f64,
    pub row_cap: u32,
    /// Rows actually classified
    pub rows_sampled: u64,
    pub findings: usize,
    pub detector_errors: u64,
    pub status: TableRunStatus,
}

/// Everything the worker pool produced.
#[derive(Debug, Default)]
pub struct SchedulerReport {
    /// Outcomes in rank order
    pub outcomes: Vec<TableOutcome>,
    /// Selected tables never dequeued, in rank order
    pub not_reached: Vec<String>,
    pub findings: Vec<Finding>,
    pub deadline_reached: bool,
}

/// Runs `targets` through `plan.worker_count` workers.
///
/// The global deadline counts from `started`, so time spent on introspection
/// is part of the budget. Never fails: sampling errors and timeouts are
/// recorded as skipped tables.
pub async fn run(
    connector: Arc<dyn Connector>,
    targets: Vec<ScanTarget>,
    plan: &ScanPlan,
    registry: Arc<DetectorRegistry>,
    started: Instant,
) -> SchedulerReport {
    let context = Arc::new(ScanContext::starting_at(plan, registry, started));
    let queue = Arc::new(Mutex::new(VecDeque::from(targets)));
    let workers = plan.worker_count.max(1);

    tracing::debug!(
        "Starting {} workers, global timeout {:?}, per-table timeout {:?}",
        workers,
        plan.global_timeout,
        plan.per_table_timeout
    );

    let watchdog = {
        let context = Arc::clone(&context);
        tokio::spawn(async move {
            tokio::time::sleep_until(context.deadline).await;
            context.cancel.cancel();
        })
    };

    let mut tasks = JoinSet::new();
    for id in 0..workers {
        tasks.spawn(worker::run_worker(
            id,
            Arc::clone(&connector),
            Arc::clone(&context),
            Arc::clone(&queue),
        ));
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(worker_outcomes) => outcomes.extend(worker_outcomes),
            Err(error) => tracing::error!("Scan worker terminated abnormally: {}", error),
        }
    }

    let deadline_reached = context.is_expired();
    watchdog.abort();

    outcomes.sort_by_key(|o| o.rank);
    let not_reached: Vec<String> = queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .drain(..)
        .map(|target| target.table.qualified_name())
        .collect();

    if !not_reached.is_empty() {
        tracing::warn!(
            "Global timeout reached, {} tables were not scanned",
            not_reached.len()
        );
    }

    SchedulerReport {
        outcomes,
        not_reached,
        findings: context.take_findings(),
        deadline_reached,
    }
}
