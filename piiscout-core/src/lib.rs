//! Adaptive multi-database PII discovery engine.
//!
//! PIIScout connects to a relational database, ranks tables by how likely
//! they are to hold personal data, samples a bounded number of rows per table
//! under one of three scan modes, classifies every sampled cell with
//! checksum- and pattern-based detectors, and aggregates the matches into a
//! severity-scored report within a fixed wall-clock budget.
//!
//! # Security Guarantees
//! - All database sessions are read-only and bounded by a statement timeout
//! - Credentials never appear in logs, errors or `Debug` output
//! - Raw scanned values are never stored; findings carry a masked excerpt
//! - Sampled cells are zeroized when their batch is dropped
//!
//! # Pipeline
//! - `connectors`: schema introspection and row sampling per engine
//! - `prioritizer`: deterministic table ranking
//! - `planner`: mode to plan resolution and table selection
//! - `scheduler`: bounded worker pool under global and per-table timeouts
//! - `detectors`: stateless value classifiers
//! - `aggregator`: deduplication, severities and compliance score
//!
//! # Example
//! ```rust,no_run
//! use piiscout_core::{ConnectionProfile, ScanMode, start_scan};
//!
//! # async fn example() -> piiscout_core::Result<()> {
//! let profile = ConnectionProfile::from_url("mysql://scanner@db.internal/shop")?;
//! let result = start_scan(&profile, ScanMode::Fast).await?;
//! for finding in &result.findings {
//!     println!("{} {}.{} {}", finding.severity, finding.table, finding.column, finding.redacted_excerpt);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod connectors;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod hints;
pub mod logging;
pub mod models;
pub mod planner;
pub mod prioritizer;
pub mod scheduler;
pub mod security;

// Re-export commonly used types
pub use connectors::{Connector, ConnectionProfile, RowSampler, SchemaIntrospector, connect};
pub use detectors::{Detection, Detector, DetectorError, DetectorRegistry};
pub use engine::{Scanner, start_scan, start_scan_blocking};
pub use error::{Result, ScanError};
pub use models::{
    Category, ColumnDescriptor, ColumnKind, Coverage, DetectorKind, EngineKind, Finding,
    OffsetStrategy, RowLocator, SampleBatch, ScanMode, ScanResult, Severity, SeverityCounts,
    SkipReason, SkippedTable, TableDescriptor, TableScanSummary, TableStatus,
};
pub use planner::{ScanOptions, ScanPlan, ScanTarget, TableSelectionStrategy};
pub use prioritizer::{RankedTable, rank_tables};
pub use security::Credentials;
