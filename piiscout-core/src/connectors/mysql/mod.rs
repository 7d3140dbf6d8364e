//! MySQL / MariaDB connector backed by a read-only sqlx pool.
//!
//! # Module Structure
//! - `connection`: Pool creation and session settings
//! - `introspection`: `INFORMATION_SCHEMA` catalog query
//! - `sampling`: `FirstN` and `ROW_NUMBER()` modulo sampling
//!
//! # Security Guarantees
//! - Sessions run `SET SESSION TRANSACTION READ ONLY`
//! - `MAX_EXECUTION_TIME` bounds every statement
//! - Identifiers are quoted; limits and strides are bound parameters

mod connection;
mod introspection;
mod sampling;

#[cfg(test)]
mod tests;

use super::{Connector, RowSampler, SchemaIntrospector};
use crate::Result;
use crate::error::ScanError;
use crate::models::{EngineKind, OffsetStrategy, SampleBatch, TableDescriptor};
use async_trait::async_trait;
use sqlx::MySqlPool;

pub use sampling::build_sample_query;

/// MySQL connector with a bounded connection pool
pub struct MySqlConnector {
    pool: MySqlPool,
    /// Schema (database) to introspect; defaults to the connection database
    schema: Option<String>,
}

impl std::fmt::Debug for MySqlConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnector")
            .field("schema", &self.schema)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

impl MySqlConnector {
    /// The underlying read-only pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl SchemaIntrospector for MySqlConnector {
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        introspection::list_tables(&self.pool, self.schema.as_deref()).await
    }
}

#[async_trait]
impl RowSampler for MySqlConnector {
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
impl Connector for MySqlConnector {
    fn engine(&self) -> EngineKind {
        EngineKind::MySQL
    }

    async fn test_connection(&self) -> Result<()> {
        let result: i64 = sqlx::query_scalar("SELECT CAST(1 AS SIGNED)")
            .fetch_one(&self.pool)
            .await
            .map_err(ScanError::connection_failed)?;

        if result != 1 {
            return Err(ScanError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        sqlx::query("SELECT 1 FROM INFORMATION_SCHEMA.TABLES LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ScanError::introspection_failed("Cannot access INFORMATION_SCHEMA", e))?;

        tracing::debug!("MySQL connection test passed");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
