//! Findings aggregation and compliance scoring.
//!
//! Merges the scheduler's raw findings into the final [`ScanResult`]:
//! stale references are dropped, each cell keeps its strongest finding,
//! severities come from a static category table, and the compliance score
//! applies a diminishing penalty per `(category, severity)` group.

use crate::models::{
    Category, Coverage, DetectorKind, EngineKind, Finding, RowLocator, ScanMode, ScanResult,
    Severity, SeverityCounts, SkippedTable, TableDescriptor, TableScanSummary, TableStatus,
};
use crate::scheduler::{SchedulerReport, TableRunStatus};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

/// Contact findings in one column at or above this count are Medium.
pub const CONTACT_VOLUME_THRESHOLD: usize = 10;

/// Lowest possible compliance score.
pub const SCORE_FLOOR: f64 = 0.0;

/// Severity for a detection before volume adjustments.
pub fn base_severity(detector: DetectorKind, category: Category) -> Severity {
    match category {
        Category::NationalId => Severity::Critical,
        Category::Financial if detector == DetectorKind::PaymentCard => Severity::Critical,
        Category::Financial | Category::Health | Category::FreeTextSecret => Severity::High,
        Category::Contact => Severity::Low,
    }
}

/// Penalty weight of the first finding in a group.
pub fn severity_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 12.0,
        Severity::High => 6.0,
        Severity::Medium => 2.0,
        Severity::Low => 0.5,
    }
}

/// The n-th harmonic number, `1 + 1/2 + ... + 1/n`.
pub fn harmonic(n: usize) -> f64 {
    // Beyond this the asymptotic form is exact to well under 1e-9
    const EXACT_LIMIT: usize = 10_000;
    if n <= EXACT_LIMIT {
        return (1..=n).map(|k| 1.0 / k as f64).sum();
    }
    let n = n as f64;
    n.ln() + 0.577_215_664_901_532_9 + 1.0 / (2.0 * n) - 1.0 / (12.0 * n * n)
}

/// Computes the 0-100 compliance score for a set of findings.
///
/// # Example
/// ```rust
/// use piiscout_core::aggregator::compliance_score;
///
/// assert_eq!(compliance_score(&[]), 100);
/// ```
pub fn compliance_score(findings: &[Finding]) -> u8 {
    let mut groups: HashMap<(Category, Severity), usize> = HashMap::new();
    for finding in findings {
        let count = groups.entry((finding.category, finding.severity)).or_insert(0);
        *count = count.saturating_add(1);
    }

    let penalty: f64 = groups
        .iter()
        .map(|((_, severity), count)| severity_weight(*severity) * harmonic(*count))
        .sum();

    let score = (100.0 - penalty).round().clamp(SCORE_FLOOR, 100.0);
    // Clamped to [0, 100] above
    score as u8
}

type CellKey = (String, String, RowLocator);

fn stronger(candidate: &Finding, current: &Finding) -> bool {
    match candidate.confidence.total_cmp(&current.confidence) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.detector < current.detector,
    }
}

/// Keeps the highest-confidence finding per `(table, column, row locator)`.
pub fn deduplicate(findings: Vec<Finding>) -> Vec<Finding> {
    let mut cells: BTreeMap<CellKey, Finding> = BTreeMap::new();
    for finding in findings {
        let key = (finding.table.clone(), finding.column.clone(), finding.row_locator);
        match cells.get(&key) {
            Some(current) if !stronger(&finding, current) => {}
            _ => {
                cells.insert(key, finding);
            }
        }
    }
    cells.into_values().collect()
}

/// Assigns final severities, including the contact volume rule.
pub fn assign_severities(findings: &mut [Finding]) {
    let mut contact_volume: HashMap<(String, String), usize> = HashMap::new();
    for finding in findings.iter().filter(|f| f.category == Category::Contact) {
        let count = contact_volume
            .entry((finding.table.clone(), finding.column.clone()))
            .or_insert(0);
        *count = count.saturating_add(1);
    }

    for finding in findings.iter_mut() {
        finding.severity = if finding.category == Category::Contact {
            let volume = contact_volume
                .get(&(finding.table.clone(), finding.column.clone()))
                .copied()
                .unwrap_or(0);
            if volume >= CONTACT_VOLUME_THRESHOLD {
                Severity::Medium
            } else {
                Severity::Low
            }
        } else {
            base_severity(finding.detector, finding.category)
        };
    }
}

/// Drops findings whose table or column is not part of this scan's schema.
pub fn drop_stale(findings: Vec<Finding>, tables: &[TableDescriptor]) -> Vec<Finding> {
    let known: HashSet<(String, &str)> = tables
        .iter()
        .flat_map(|t| {
            let qualified = t.qualified_name();
            t.columns
                .iter()
                .map(move |c| (qualified.clone(), c.name.as_str()))
        })
        .collect();

    let before = findings.len();
    let kept: Vec<Finding> = findings
        .into_iter()
        .filter(|f| known.contains(&(f.table.clone(), f.column.as_str())))
        .collect();
    if kept.len() < before {
        tracing::warn!(
            "Dropped {} findings referencing unknown tables or columns",
            before - kept.len()
        );
    }
    kept
}

fn ordering(a: &Finding, b: &Finding) -> std::cmp::Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| a.table.cmp(&b.table))
        .then_with(|| a.column.cmp(&b.column))
        .then_with(|| a.row_locator.cmp(&b.row_locator))
        .then_with(|| a.detector.cmp(&b.detector))
}

/// Identity and timing of the scan being aggregated.
#[derive(Debug, Clone)]
pub struct ScanMetadata {
    pub scan_id: uuid::Uuid,
    pub mode: ScanMode,
    pub engine: EngineKind,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration: Duration,
}

/// Builds the final result from the scheduler report.
///
/// `tables` is the complete introspected schema of this scan.
pub fn aggregate(
    metadata: ScanMetadata,
    tables: &[TableDescriptor],
    report: SchedulerReport,
) -> ScanResult {
    let SchedulerReport {
        outcomes,
        not_reached,
        findings,
        deadline_reached,
    } = report;

    let mut findings = deduplicate(drop_stale(findings, tables));
    assign_severities(&mut findings);
    findings.sort_by(ordering);

    let mut severity_counts = SeverityCounts::default();
    let mut per_table: HashMap<&str, usize> = HashMap::new();
    for finding in &findings {
        severity_counts.record(finding.severity);
        let count = per_table.entry(finding.table.as_str()).or_insert(0);
        *count = count.saturating_add(1);
    }

    let mut tables_scanned = Vec::new();
    let mut tables_skipped = Vec::new();
    let mut table_summaries = Vec::with_capacity(outcomes.len());
    let mut rows_sampled = 0u64;
    let mut detector_errors = 0u64;
    let mut any_partial = false;

    for outcome in outcomes {
        rows_sampled = rows_sampled.saturating_add(outcome.rows_sampled);
        detector_errors = detector_errors.saturating_add(outcome.detector_errors);
        let status = match outcome.status {
            TableRunStatus::Scanned => {
                tables_scanned.push(outcome.table.clone());
                TableStatus::Scanned
            }
            TableRunStatus::Partial => {
                any_partial = true;
                tables_scanned.push(outcome.table.clone());
                TableStatus::Partial
            }
            TableRunStatus::Skipped(reason) => {
                tables_skipped.push(SkippedTable {
                    table: outcome.table.clone(),
                    reason,
                });
                TableStatus::Skipped
            }
        };
        table_summaries.push(TableScanSummary {
            findings: per_table.get(outcome.table.as_str()).copied().unwrap_or(0),
            table: outcome.table,
            rank: outcome.rank,
            priority_score: outcome.priority_score,
            row_cap: outcome.row_cap,
            rows_sampled: outcome.rows_sampled,
            status,
        });
    }

    let coverage = if tables_skipped.is_empty() && not_reached.is_empty() && !any_partial {
        Coverage::Complete
    } else {
        Coverage::Partial
    };
    if deadline_reached && coverage == Coverage::Partial {
        tracing::info!("Scan reached its global timeout; returning partial coverage");
    }

    let compliance_score = compliance_score(&findings);

    ScanResult {
        scan_id: metadata.scan_id,
        mode: metadata.mode,
        engine: metadata.engine,
        started_at: metadata.started_at,
        duration: metadata.duration,
        tables_total: tables.len(),
        tables_scanned,
        tables_skipped,
        tables_not_reached: not_reached,
        rows_sampled,
        findings,
        severity_counts,
        compliance_score,
        detector_errors,
        table_summaries,
        coverage,
    }
}
