//! PostgreSQL connector backed by a read-only sqlx pool.
//!
//! # Module Structure
//! - `connection`: Pool creation and session settings
//! - `introspection`: Catalog query and row estimates
//! - `sampling`: `FirstN` and `TABLESAMPLE BERNOULLI` sampling
//!
//! # Security Guarantees
//! - Every pooled session runs with `default_transaction_read_only = on`
//! - `statement_timeout` and `lock_timeout` bound every query
//! - Identifiers are quoted; the row limit is a bound parameter

mod connection;
mod introspection;
mod sampling;


use super::{Connector, RowSampler, SchemaIntrospector};
use crate::Result;
use crate::error::ScanError;
use crate::models::{EngineKind, OffsetStrategy, SampleBatch, TableDescriptor};
use async_trait::async_trait;
use sqlx::PgPool;

pub use sampling::build_sample_query;

/// PostgreSQL connector with a bounded connection pool
pub struct PostgresConnector {
    pool: PgPool,
    /// Restricts introspection to one schema when set
    schema: Option<String>,
}

impl std::fmt::Debug for PostgresConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConnector")
            .field("schema", &self.schema)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

impl PostgresConnector {
    /// The underlying read-only pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SchemaIntrospector for PostgresConnector {
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        introspection::list_tables(&self.pool, self.schema.as_deref()).await
    }
}

#[async_trait]
impl RowSampler for PostgresConnector {
    async fn sample_rows(
        &self,
        table: &TableDescriptor,
        limit: u32,
        strategy: OffsetStrategy,
    ) -> Result<SampleBatch> {
        sampling::sample_rows(&self.pool, table, limit, strategy).await
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    fn engine(&self) -> EngineKind {
        EngineKind::PostgreSQL
    }

    async fn test_connection(&self) -> Result<()> {
        let result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(ScanError::connection_failed)?;

        if result != 1 {
            return Err(ScanError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        let readable: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'information_schema'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ScanError::introspection_failed("Cannot access information_schema", e))?;

        if readable == 0 {
            return Err(ScanError::configuration(
                "information_schema is not readable by the scanning account",
            ));
        }

        tracing::debug!("PostgreSQL connection test passed");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
