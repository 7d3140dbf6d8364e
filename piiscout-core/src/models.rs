//! Core data models shared by connectors, detectors and the scan pipeline.
//!
//! Descriptors are produced during introspection and are read-only afterwards.
//! Sample data is owned by the worker that fetched it and is zeroized on drop.
//! Findings never carry a raw scanned value, only a masked excerpt.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Supported database engine families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    PostgreSQL,
    MySQL,
    SqlServer,
    /// In-memory connector used for tests and dry runs
    Synthetic,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineKind::PostgreSQL => write!(f, "PostgreSQL"),
            EngineKind::MySQL => write!(f, "MySQL"),
            EngineKind::SqlServer => write!(f, "SQL Server"),
            EngineKind::Synthetic => write!(f, "Synthetic"),
        }
    }
}

/// Coarse column type family used for prioritization and projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Numeric,
    Temporal,
    Boolean,
    Binary,
    Other,
}

impl ColumnKind {
    /// Binary columns are never projected into a sample.
    pub fn is_sampleable(self) -> bool {
        !matches!(self, ColumnKind::Binary)
    }
}

/// Category of personal data a finding belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    NationalId,
    Financial,
    Health,
    FreeTextSecret,
    Contact,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Category::NationalId => "national-id",
            Category::Financial => "financial",
            Category::Health => "health",
            Category::FreeTextSecret => "free-text-secret",
            Category::Contact => "contact",
        };
        f.write_str(label)
    }
}

/// Finding severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        f.write_str(label)
    }
}

/// Identifies which detector produced a finding.
///
/// Declaration order doubles as the deterministic tie-break when two
/// detectors report the same confidence for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    NationalId,
    PaymentCard,
    Iban,
    Email,
    Phone,
    PostalCode,
    Icd10,
    EntropySecret,
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DetectorKind::NationalId => "national_id",
            DetectorKind::PaymentCard => "payment_card",
            DetectorKind::Iban => "iban",
            DetectorKind::Email => "email",
            DetectorKind::Phone => "phone",
            DetectorKind::PostalCode => "postal_code",
            DetectorKind::Icd10 => "icd10",
            DetectorKind::EntropySecret => "entropy_secret",
        };
        f.write_str(label)
    }
}

/// Column metadata with its derived personal-data hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub ordinal_position: u32,
    /// Lexical likelihood in `[0, 1]` that the column holds personal data
    pub name_hint_score: f64,
    /// Category suggested by the column name, if any
    pub hinted_category: Option<Category>,
}

impl ColumnDescriptor {
    /// Builds a descriptor and derives the name hint from the column name.
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        kind: ColumnKind,
        nullable: bool,
        ordinal_position: u32,
    ) -> Self {
        let name = name.into();
        let hint = crate::hints::column_hint(&name);
        Self {
            name,
            declared_type: declared_type.into(),
            kind,
            nullable,
            ordinal_position,
            name_hint_score: hint.score,
            hinted_category: hint.category,
        }
    }
}

/// Table metadata produced by schema introspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    pub estimated_rows: Option<u64>,
    pub columns: Vec<ColumnDescriptor>,
    /// Position in catalog order, used as the deterministic tie-break
    pub declaration_index: usize,
}

impl TableDescriptor {
    /// Creates a table descriptor with no columns yet.
    pub fn new(schema: impl Into<String>, name: impl Into<String>, declaration_index: usize) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            estimated_rows: None,
            columns: Vec::new(),
            declaration_index,
        }
    }

    /// `schema.table` form used in findings and reports.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns that can be rendered as text for inspection.
    pub fn sampleable_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.kind.is_sampleable())
    }
}

/// How a connector picks which rows to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OffsetStrategy {
    /// The first N rows in storage order
    FirstN,
    /// Reproducible scatter across the table derived from `seed`
    Scatter { seed: u64 },
}

/// Non-reversible reference to a sampled row.
///
/// This is the row's position in the sampled scan order, never derived from
/// the row's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowLocator(pub u64);

impl std::fmt::Display for RowLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row#{}", self.0)
    }
}

/// One sampled row; cells follow `SampleBatch::columns`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SampleRow {
    #[zeroize(skip)]
    pub locator: RowLocator,
    pub cells: Vec<Option<String>>,
}

impl std::fmt::Debug for SampleRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Cell values are personal data candidates and never printed
        f.debug_struct("SampleRow")
            .field("locator", &self.locator)
            .field("cells", &self.cells.len())
            .finish()
    }
}

/// Rows pulled from one table for inspection.
///
/// Owned by the worker that fetched it; cell values are wiped when dropped.
#[derive(Debug, Clone)]
pub struct SampleBatch {
    /// Qualified table name
    pub table: String,
    /// Projected column names, in cell order
    pub columns: Vec<String>,
    pub rows: Vec<SampleRow>,
    pub strategy: OffsetStrategy,
}

impl SampleBatch {
    /// Creates an empty batch for a table projection.
    pub fn new(table: impl Into<String>, columns: Vec<String>, strategy: OffsetStrategy) -> Self {
        Self {
            table: table.into(),
            columns,
            rows: Vec::new(),
            strategy,
        }
    }

    /// Appends a row at the given locator.
    pub fn push_row(&mut self, locator: RowLocator, cells: Vec<Option<String>>) {
        self.rows.push(SampleRow { locator, cells });
    }

    /// Index the next pushed row will have within the batch.
    pub fn next_index(&self) -> u64 {
        self.rows.len() as u64
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A single personal-data match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub detector: DetectorKind,
    pub category: Category,
    pub severity: Severity,
    pub confidence: f64,
    /// Qualified table name
    pub table: String,
    pub column: String,
    pub row_locator: RowLocator,
    /// Bounded, masked representation of the matched value
    pub redacted_excerpt: String,
}

/// Scan intensity selected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanMode {
    Fast,
    Smart,
    Deep,
}

impl ScanMode {
    /// All modes in increasing intensity.
    pub const ALL: [ScanMode; 3] = [ScanMode::Fast, ScanMode::Smart, ScanMode::Deep];
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Fast => write!(f, "FAST"),
            ScanMode::Smart => write!(f, "SMART"),
            ScanMode::Deep => write!(f, "DEEP"),
        }
    }
}

impl std::str::FromStr for ScanMode {
    type Err = crate::error::ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(ScanMode::Fast),
            "smart" => Ok(ScanMode::Smart),
            "deep" => Ok(ScanMode::Deep),
            other => Err(crate::error::ScanError::configuration(format!(
                "Unknown scan mode '{}': expected fast, smart or deep",
                other
            ))),
        }
    }
}

/// Why a table produced no findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum SkipReason {
    /// The table exceeded its per-table timeout
    Timeout,
    /// The connector failed to sample the table (sanitized message)
    SamplingFailed(String),
    /// Every column was binary or the table has no columns
    NoSampleableColumns,
}

/// A table recorded as skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTable {
    pub table: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Per-table status in the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// All fetched rows were classified
    Scanned,
    /// Classification stopped early at the global deadline
    Partial,
    Skipped,
}

/// Audit record for one selected table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableScanSummary {
    pub table: String,
    pub rank: usize,
    pub priority_score: f64,
    pub row_cap: u32,
    pub rows_sampled: u64,
    pub findings: usize,
    pub status: TableStatus,
}

/// Finding counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    /// Counts one finding of the given severity.
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical = self.critical.saturating_add(1),
            Severity::High => self.high = self.high.saturating_add(1),
            Severity::Medium => self.medium = self.medium.saturating_add(1),
            Severity::Low => self.low = self.low.saturating_add(1),
        }
    }

    pub fn total(&self) -> usize {
        self.critical
            .saturating_add(self.high)
            .saturating_add(self.medium)
            .saturating_add(self.low)
    }

    /// Map form used by report renderers.
    pub fn as_map(&self) -> BTreeMap<Severity, usize> {
        BTreeMap::from([
            (Severity::Critical, self.critical),
            (Severity::High, self.high),
            (Severity::Medium, self.medium),
            (Severity::Low, self.low),
        ])
    }
}

/// Whether every selected table was fully processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    Complete,
    /// Tables were skipped, left unreached, or cut short by the deadline
    Partial,
}

/// The authoritative, immutable output of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: uuid::Uuid,
    pub mode: ScanMode,
    pub engine: EngineKind,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration: Duration,
    /// Tables discovered during introspection
    pub tables_total: usize,
    /// Qualified names of tables that were sampled and classified
    pub tables_scanned: Vec<String>,
    pub tables_skipped: Vec<SkippedTable>,
    /// Selected tables never dequeued because the global deadline passed
    pub tables_not_reached: Vec<String>,
    pub rows_sampled: u64,
    pub findings: Vec<Finding>,
    pub severity_counts: SeverityCounts,
    pub compliance_score: u8,
    pub detector_errors: u64,
    pub table_summaries: Vec<TableScanSummary>,
    pub coverage: Coverage,
}

impl ScanResult {
    /// True when no table was skipped, unreached or cut short.
    pub fn is_complete(&self) -> bool {
        self.coverage == Coverage::Complete
    }

    /// Summary for one table, by qualified name.
    pub fn summary_for(&self, table: &str) -> Option<&TableScanSummary> {
        self.table_summaries.iter().find(|s| s.table == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_scan_mode_parse_and_display() {
        assert_eq!("fast".parse::<ScanMode>().unwrap(), ScanMode::Fast);
        assert_eq!("SMART".parse::<ScanMode>().unwrap(), ScanMode::Smart);
        assert_eq!("Deep".parse::<ScanMode>().unwrap(), ScanMode::Deep);
        assert!("thorough".parse::<ScanMode>().is_err());
        assert_eq!(ScanMode::Deep.to_string(), "DEEP");
    }

    #[test]
    fn test_scan_mode_serializes_uppercase() {
        let json = serde_json::to_string(&ScanMode::Smart).unwrap();
        assert_eq!(json, "\"SMART\"");
    }

    #[test]
    fn test_category_serializes_kebab_case() {
        let json = serde_json::to_string(&Category::FreeTextSecret).unwrap();
        assert_eq!(json, "\"free-text-secret\"");
        assert_eq!(Category::NationalId.to_string(), "national-id");
    }

    #[test]
    fn test_qualified_name_and_lookup() {
        let mut table = TableDescriptor::new("public", "users", 0);
        table
            .columns
            .push(ColumnDescriptor::new("email", "text", ColumnKind::Text, true, 1));
        table
            .columns
            .push(ColumnDescriptor::new("avatar", "bytea", ColumnKind::Binary, true, 2));

        assert_eq!(table.qualified_name(), "public.users");
        assert!(table.column("email").is_some());
        assert!(table.column("missing").is_none());
        assert_eq!(table.sampleable_columns().count(), 1);
    }

    #[test]
    fn test_sample_batch_keeps_row_locators() {
        let mut batch = SampleBatch::new(
            "public.users",
            vec!["email".to_string()],
            OffsetStrategy::FirstN,
        );
        assert_eq!(batch.next_index(), 0);
        batch.push_row(RowLocator(40), vec![Some("a@example.com".to_string())]);
        batch.push_row(RowLocator(47), vec![None]);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.next_index(), 2);
        assert_eq!(batch.rows[0].locator, RowLocator(40));
        assert_eq!(batch.rows[1].locator, RowLocator(47));
    }

    #[test]
    fn test_sample_row_debug_hides_values() {
        let row = SampleRow {
            locator: RowLocator(3),
            cells: vec![Some("123-45-6789".to_string())],
        };
        let debug = format!("{:?}", row);
        assert!(!debug.contains("123-45-6789"));
        assert!(debug.contains("RowLocator(3)"));
    }

    #[test]
    fn test_severity_counts() {
        let mut counts = SeverityCounts::default();
        counts.record(Severity::Critical);
        counts.record(Severity::Critical);
        counts.record(Severity::Low);

        assert_eq!(counts.critical, 2);
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.as_map()[&Severity::Low], 1);
    }

    #[test]
    fn test_skipped_table_serialization() {
        let skipped = SkippedTable {
            table: "public.audit".to_string(),
            reason: SkipReason::Timeout,
        };
        let json = serde_json::to_value(&skipped).unwrap();
        assert_eq!(json["table"], "public.audit");
        assert_eq!(json["reason"], "timeout");
    }
}
