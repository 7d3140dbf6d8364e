//! Report rendering and file output for scan results.
//!
//! Reports are either the full JSON `ScanResult` or a plain-text summary.
//! Files can be written as-is or Zstandard-compressed.

use crate::ReportFormat;
use piiscout_core::{Coverage, Result, ScanError, ScanResult};
use std::fmt::Write as _;
use std::path::Path;

/// Zstandard level used for compressed reports.
#[cfg(feature = "compression")]
const COMPRESSION_LEVEL: i32 = 3;

/// Renders a result in the requested format.
///
/// # Errors
/// Returns a serialization error if the JSON encoding fails.
pub fn render(result: &ScanResult, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => render_json(result),
        ReportFormat::Summary => Ok(render_summary(result)),
    }
}

/// Pretty-printed JSON form of the full result.
///
/// # Errors
/// Returns a serialization error if the JSON encoding fails.
pub fn render_json(result: &ScanResult) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(|e| ScanError::Serialization {
        context: "Failed to serialize scan result".to_string(),
        source: e,
    })
}

/// Human readable report: header, coverage, then one line per finding.
pub fn render_summary(result: &ScanResult) -> String {
    let mut out = String::new();
    let counts = &result.severity_counts;

    let _ = writeln!(out, "PIIScout {} scan of {} database", result.mode, result.engine);
    let _ = writeln!(out, "Scan id:          {}", result.scan_id);
    let _ = writeln!(out, "Started:          {}", result.started_at.to_rfc3339());
    let _ = writeln!(out, "Duration:         {:.2}s", result.duration.as_secs_f64());
    let _ = writeln!(out, "Compliance score: {}/100", result.compliance_score);
    let _ = writeln!(
        out,
        "Tables:           {} scanned, {} skipped, {} not reached, {} total",
        result.tables_scanned.len(),
        result.tables_skipped.len(),
        result.tables_not_reached.len(),
        result.tables_total
    );
    let _ = writeln!(out, "Rows sampled:     {}", result.rows_sampled);
    let _ = writeln!(
        out,
        "Findings:         {} (critical {}, high {}, medium {}, low {})",
        counts.total(),
        counts.critical,
        counts.high,
        counts.medium,
        counts.low
    );
    if result.detector_errors > 0 {
        let _ = writeln!(out, "Detector errors:  {}", result.detector_errors);
    }
    if result.coverage == Coverage::Partial {
        let _ = writeln!(out, "Coverage:         PARTIAL");
    }

    if !result.tables_skipped.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Skipped tables:");
        for skipped in &result.tables_skipped {
            let _ = writeln!(out, "  {} ({:?})", skipped.table, skipped.reason);
        }
    }

    if !result.findings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<9} {:<16} {:<40} {:>8}  EXCERPT",
            "SEVERITY", "CATEGORY", "LOCATION", "ROW"
        );
        for finding in &result.findings {
            let location = format!("{}.{}", finding.table, finding.column);
            let _ = writeln!(
                out,
                "{:<9} {:<16} {:<40} {:>8}  {}",
                finding.severity.to_string(),
                finding.category.to_string(),
                location,
                finding.row_locator,
                finding.redacted_excerpt
            );
        }
    }

    out
}

/// Writes a rendered report, compressing it when requested.
///
/// # Errors
/// Returns an I/O error if the file cannot be written, or a configuration
/// error if compression was requested without the `compression` feature.
pub async fn write_report(contents: &str, path: &Path, compress: bool) -> Result<()> {
    let bytes = if compress {
        compress_bytes(contents.as_bytes())?
    } else {
        contents.as_bytes().to_vec()
    };

    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| ScanError::Io {
            context: format!("Failed to write to {}", path.display()),
            source: e,
        })
}

#[cfg(feature = "compression")]
fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, COMPRESSION_LEVEL).map_err(|e| ScanError::Io {
        context: "Compression failed".to_string(),
        source: e,
    })
}

#[cfg(not(feature = "compression"))]
fn compress_bytes(_data: &[u8]) -> Result<Vec<u8>> {
    Err(ScanError::configuration(
        "Compression not available. Compile with --features compression",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use piiscout_core::{
        Category, DetectorKind, EngineKind, Finding, RowLocator, ScanMode, Severity,
        SeverityCounts, SkipReason, SkippedTable,
    };
    use std::time::Duration;

    fn sample_result() -> ScanResult {
        let finding = Finding {
            detector: DetectorKind::PaymentCard,
            category: Category::Financial,
            severity: Severity::Critical,
            confidence: 0.95,
            table: "public.payments".to_string(),
            column: "card_number".to_string(),
            row_locator: RowLocator(12),
            redacted_excerpt: "************1111".to_string(),
        };
        let mut severity_counts = SeverityCounts::default();
        severity_counts.record(Severity::Critical);
        ScanResult {
            scan_id: uuid::Uuid::nil(),
            mode: ScanMode::Fast,
            engine: EngineKind::PostgreSQL,
            started_at: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            duration: Duration::from_millis(1500),
            tables_total: 3,
            tables_scanned: vec!["public.payments".to_string()],
            tables_skipped: vec![SkippedTable {
                table: "public.audit".to_string(),
                reason: SkipReason::Timeout,
            }],
            tables_not_reached: Vec::new(),
            rows_sampled: 100,
            findings: vec![finding],
            severity_counts,
            compliance_score: 88,
            detector_errors: 0,
            table_summaries: Vec::new(),
            coverage: Coverage::Partial,
        }
    }

    #[test]
    fn test_summary_lists_findings_and_coverage() {
        let summary = render_summary(&sample_result());
        assert!(summary.contains("FAST scan"));
        assert!(summary.contains("Compliance score: 88/100"));
        assert!(summary.contains("1 scanned, 1 skipped, 0 not reached, 3 total"));
        assert!(summary.contains("Coverage:         PARTIAL"));
        assert!(summary.contains("public.audit (Timeout)"));
        assert!(summary.contains("public.payments.card_number"));
        assert!(summary.contains("************1111"));
        assert!(!summary.contains("Detector errors"));
    }

    #[test]
    fn test_json_report_parses_back() {
        let result = sample_result();
        let json = render(&result, ReportFormat::Json).unwrap();
        let parsed: ScanResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }

    #[tokio::test]
    async fn test_write_plain_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report("{\"ok\":true}", &path, false).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let error = write_report("{}", &path, false).await.unwrap_err();
        assert!(matches!(error, ScanError::Io { .. }));
    }

    #[cfg(feature = "compression")]
    #[tokio::test]
    async fn test_write_compressed_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json.zst");
        let json = render_json(&sample_result()).unwrap();
        write_report(&json, &path, true).await.unwrap();

        let compressed = std::fs::read(&path).unwrap();
        let decompressed = zstd::decode_all(compressed.as_slice()).unwrap();
        assert_eq!(String::from_utf8(decompressed).unwrap(), json);
    }

    #[cfg(not(feature = "compression"))]
    #[tokio::test]
    async fn test_compression_requires_feature() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json.zst");
        let error = write_report("{}", &path, true).await.unwrap_err();
        assert!(matches!(error, ScanError::Configuration { .. }));
    }
}
