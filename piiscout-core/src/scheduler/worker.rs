//! Worker loop and per-table processing.

use super::{ScanContext, TableOutcome, TableRunStatus};
use crate::aggregator::base_severity;
use crate::connectors::Connector;
use crate::connectors::helpers::sanitize_driver_message;
use crate::detectors::DetectorRegistry;
use crate::models::{ColumnDescriptor, Finding, SampleBatch, SkipReason, TableDescriptor};
use crate::planner::ScanTarget;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Findings and counters from classifying one batch.
#[derive(Debug, Default)]
pub struct BatchClassification {
    pub findings: Vec<Finding>,
    pub rows_classified: u64,
    pub detector_errors: u64,
    /// Set when the cancel token fired before every row was classified
    pub cut_short: bool,
}

/// Runs the registry over every cell of `batch`.
///
/// Row locators are carried from the batch into each finding. The batch is
/// consumed so its cell values are wiped as soon as classification ends.
pub fn classify_batch(
    table: &TableDescriptor,
    batch: SampleBatch,
    registry: &DetectorRegistry,
    cancel: &CancellationToken,
) -> BatchClassification {
    let qualified = table.qualified_name();
    let columns: Vec<Option<&ColumnDescriptor>> = batch
        .columns
        .iter()
        .map(|name| table.column(name).filter(|c| registry.covers(c)))
        .collect();

    let mut result = BatchClassification::default();
    for row in &batch.rows {
        if cancel.is_cancelled() {
            result.cut_short = true;
            break;
        }
        for (cell, column) in row.cells.iter().zip(&columns) {
            let (Some(value), Some(column)) = (cell, column) else {
                continue;
            };
            let classification = registry.classify(column, value);
            result.detector_errors = result
                .detector_errors
                .saturating_add(u64::from(classification.errors));
            result
                .findings
                .extend(classification.detections.into_iter().map(|detection| Finding {
                    detector: detection.detector,
                    category: detection.category,
                    severity: base_severity(detection.detector, detection.category),
                    confidence: detection.confidence,
                    table: qualified.clone(),
                    column: column.name.clone(),
                    row_locator: row.locator,
                    redacted_excerpt: detection.redacted_excerpt,
                }));
        }
        result.rows_classified = result.rows_classified.saturating_add(1);
    }
    result
}

/// Pulls targets until the queue is empty or the deadline passes.
pub(super) async fn run_worker(
    id: usize,
    connector: Arc<dyn Connector>,
    context: Arc<ScanContext>,
    queue: Arc<Mutex<VecDeque<ScanTarget>>>,
) -> Vec<TableOutcome> {
    let mut outcomes = Vec::new();
    loop {
        if context.is_expired() {
            tracing::debug!("Worker {} stopping at the global deadline", id);
            break;
        }
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(target) = next else {
            break;
        };

        let outcome = scan_table(connector.as_ref(), &context, target).await;
        tracing::debug!(
            "Worker {} finished {} ({:?}, {} rows, {} findings)",
            id,
            outcome.table,
            outcome.status,
            outcome.rows_sampled,
            outcome.findings
        );
        outcomes.push(outcome);
    }
    outcomes
}

enum TableError {
    Sampling(String),
    Classification(String),
}

async fn sample_and_classify(
    connector: &dyn Connector,
    context: &ScanContext,
    target: &ScanTarget,
    cancel: CancellationToken,
) -> Result<BatchClassification, TableError> {
    let mut batch = connector
        .sample_rows(&target.table, target.row_cap, target.strategy)
        .await
        .map_err(|e| TableError::Sampling(sanitize_driver_message(&e.to_string())))?;

    let cap = usize::try_from(target.row_cap).unwrap_or(usize::MAX);
    if batch.rows.len() > cap {
        tracing::warn!(
            "Connector returned {} rows for {} (cap {}), truncating",
            batch.rows.len(),
            batch.table,
            cap
        );
        batch.rows.truncate(cap);
    }

    let table = Arc::clone(&target.table);
    let registry = Arc::clone(&context.registry);
    tokio::task::spawn_blocking(move || classify_batch(&table, batch, &registry, &cancel))
        .await
        .map_err(|e| TableError::Classification(e.to_string()))
}

async fn scan_table(
    connector: &dyn Connector,
    context: &ScanContext,
    target: ScanTarget,
) -> TableOutcome {
    let table = target.table.qualified_name();
    let mut outcome = TableOutcome {
        table,
        rank: target.rank,
        priority_score: target.priority_score,
        row_cap: target.row_cap,
        rows_sampled: 0,
        findings: 0,
        detector_errors: 0,
        status: TableRunStatus::Scanned,
    };

    if target.table.sampleable_columns().next().is_none() {
        tracing::info!("Skipping {}: no sampleable columns", outcome.table);
        outcome.status = TableRunStatus::Skipped(SkipReason::NoSampleableColumns);
        return outcome;
    }

    // Cancelled by the global deadline, or by this table's timeout below
    let table_cancel = context.cancel.child_token();
    let work = sample_and_classify(connector, context, &target, table_cancel.clone());

    match tokio::time::timeout(context.per_table_timeout, work).await {
        Err(_) => {
            table_cancel.cancel();
            tracing::warn!(
                "Skipping {}: exceeded per-table timeout of {:?}",
                outcome.table,
                context.per_table_timeout
            );
            outcome.status = TableRunStatus::Skipped(SkipReason::Timeout);
        }
        Ok(Err(TableError::Sampling(message))) => {
            tracing::warn!("Skipping {}: {}", outcome.table, message);
            outcome.status = TableRunStatus::Skipped(SkipReason::SamplingFailed(message));
        }
        Ok(Err(TableError::Classification(message))) => {
            tracing::error!("Classification task for {} failed: {}", outcome.table, message);
            outcome.status = TableRunStatus::Skipped(SkipReason::SamplingFailed(format!(
                "classification failed: {}",
                message
            )));
        }
        Ok(Ok(classified)) => {
            outcome.rows_sampled = classified.rows_classified;
            outcome.findings = classified.findings.len();
            outcome.detector_errors = classified.detector_errors;
            if classified.cut_short {
                outcome.status = TableRunStatus::Partial;
            }
            context.record_findings(classified.findings);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Category, ColumnKind, DetectorKind, OffsetStrategy, RowLocator, Severity,
    };

    fn customers() -> TableDescriptor {
        let mut table = TableDescriptor::new("public", "customers", 0);
        table
            .columns
            .push(ColumnDescriptor::new("email", "text", ColumnKind::Text, true, 1));
        table
            .columns
            .push(ColumnDescriptor::new("ssn", "text", ColumnKind::Text, true, 2));
        table
    }

    fn batch() -> SampleBatch {
        let mut batch = SampleBatch::new(
            "public.customers",
            vec!["email".to_string(), "ssn".to_string()],
            OffsetStrategy::FirstN,
        );
        batch.push_row(
            RowLocator(7),
            vec![Some("ada@example.com".to_string()), Some("111222333".to_string())],
        );
        batch.push_row(RowLocator(19), vec![None, Some("123456789".to_string())]);
        batch
    }

    #[test]
    fn test_classify_batch_preserves_row_locators() {
        let registry = DetectorRegistry::standard();
        let result = classify_batch(&customers(), batch(), &registry, &CancellationToken::new());

        assert_eq!(result.rows_classified, 2);
        assert!(!result.cut_short);

        let email = result
            .findings
            .iter()
            .find(|f| f.detector == DetectorKind::Email)
            .unwrap();
        assert_eq!(email.row_locator, RowLocator(7));
        assert_eq!(email.column, "email");
        assert_eq!(email.table, "public.customers");

        let national: Vec<&Finding> = result
            .findings
            .iter()
            .filter(|f| f.category == Category::NationalId)
            .collect();
        // 123456789 fails the checksum
        assert_eq!(national.len(), 1);
        assert_eq!(national[0].row_locator, RowLocator(7));
        assert_eq!(national[0].severity, Severity::Critical);
    }

    #[test]
    fn test_findings_never_hold_raw_values() {
        let registry = DetectorRegistry::standard();
        let result = classify_batch(&customers(), batch(), &registry, &CancellationToken::new());
        for finding in &result.findings {
            assert_ne!(finding.redacted_excerpt, "ada@example.com");
            assert_ne!(finding.redacted_excerpt, "111222333");
            assert!(finding.redacted_excerpt.contains('*'));
        }
    }

    #[test]
    fn test_cancelled_classification_is_cut_short() {
        let registry = DetectorRegistry::standard();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = classify_batch(&customers(), batch(), &registry, &cancel);
        assert!(result.cut_short);
        assert_eq!(result.rows_classified, 0);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn test_unknown_columns_are_ignored() {
        let mut batch = SampleBatch::new(
            "public.customers",
            vec!["dropped_column".to_string()],
            OffsetStrategy::FirstN,
        );
        batch.push_row(RowLocator(0), vec![Some("ada@example.com".to_string())]);
        let registry = DetectorRegistry::standard();
        let result = classify_batch(&customers(), batch, &registry, &CancellationToken::new());
        assert!(result.findings.is_empty());
        assert_eq!(result.rows_classified, 1);
    }
}
