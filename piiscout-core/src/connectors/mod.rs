//! Connector traits and factory for uniform database access.
//!
//! Every engine exposes the same two capabilities: schema introspection and
//! bounded row sampling. Engine branching happens only in [`connect`].
//!
//! # Module Structure
//! - `config`: Connection profile and URL parsing
//! - `helpers`: Identifier quoting, type classification, catalog grouping
//! - `sampling`: Reproducible scatter sampling parameters
//! - Engine modules (`postgres`, `mysql`, `mssql`, `synthetic`)
//!
//! # Security Guarantees
//! - Sessions are opened read-only with a statement timeout
//! - Sampling issues only `SELECT` statements with quoted identifiers
//! - Credentials never appear in errors or logs

use crate::Result;
use crate::error::ScanError;
use crate::models::{EngineKind, OffsetStrategy, SampleBatch, TableDescriptor};
use async_trait::async_trait;

pub mod config;
pub mod helpers;
pub mod sampling;
pub mod synthetic;

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "mssql")]
pub mod mssql;

pub use config::ConnectionProfile;
pub use synthetic::{SyntheticConnector, SyntheticTable};

/// Lists the tables visible to the scanning account.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Returns every readable base table with its columns, in catalog order.
    ///
    /// # Errors
    /// Returns an introspection error when the catalog cannot be read. This
    /// error is fatal for the scan.
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>>;
}

/// Fetches bounded samples from a single table.
#[async_trait]
pub trait RowSampler: Send + Sync {
    /// Samples at most `limit` rows of `table`.
    ///
    /// Binary columns are excluded from the projection and every cell is
    /// rendered as text by the engine.
    ///
    /// # Errors
    /// Returns a sampling error for this table only; callers record the table
    /// as skipped and continue.
    async fn sample_rows(
        &self,
        table: &TableDescriptor,
        limit: u32,
        strategy: OffsetStrategy,
    ) -> Result<SampleBatch>;
}

/// A live, read-only handle on one database.
///
/// # Object Safety
/// The trait is object-safe so the engine can hold `Arc<dyn Connector>` and
/// share it across workers.
#[async_trait]
pub trait Connector: SchemaIntrospector + RowSampler + std::fmt::Debug {
    /// Engine family this connector talks to.
    fn engine(&self) -> EngineKind;

    /// Checks connectivity and catalog access without sampling.
    ///
    /// # Errors
    /// Returns a connection error if the database is unreachable.
    async fn test_connection(&self) -> Result<()>;

    /// Releases pooled sessions.
    async fn close(&self);
}

/// Opens a connector for the engine named by the profile.
///
/// # Errors
/// Returns an error if the profile is invalid, the engine was not compiled
/// in, or the initial connection fails.
pub async fn connect(profile: &ConnectionProfile) -> Result<Box<dyn Connector>> {
    profile.validate()?;

    match profile.engine {
        #[cfg(feature = "postgresql")]
        EngineKind::PostgreSQL => {
            let connector = postgres::PostgresConnector::connect(profile).await?;
            Ok(Box::new(connector))
        }
        #[cfg(not(feature = "postgresql"))]
        EngineKind::PostgreSQL => Err(ScanError::unsupported_engine(
            "postgresql",
            "Compile with --features postgresql to enable PostgreSQL support",
        )),
        #[cfg(feature = "mysql")]
        EngineKind::MySQL => {
            let connector = mysql::MySqlConnector::connect(profile).await?;
            Ok(Box::new(connector))
        }
        #[cfg(not(feature = "mysql"))]
        EngineKind::MySQL => Err(ScanError::unsupported_engine(
            "mysql",
            "Compile with --features mysql to enable MySQL support",
        )),
        #[cfg(feature = "mssql")]
        EngineKind::SqlServer => {
            let connector = mssql::SqlServerConnector::connect(profile).await?;
            Ok(Box::new(connector))
        }
        #[cfg(not(feature = "mssql"))]
        EngineKind::SqlServer => Err(ScanError::unsupported_engine(
            "mssql",
            "Compile with --features mssql to enable SQL Server support",
        )),
        EngineKind::Synthetic => Err(ScanError::unsupported_engine(
            "synthetic",
            "Synthetic connectors are built in code with SyntheticConnector::new",
        )),
    }
}
