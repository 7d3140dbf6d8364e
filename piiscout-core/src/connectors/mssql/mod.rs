//! SQL Server connector over tiberius.
//!
//! tiberius clients are single-session, so every sampling call opens its own
//! session. A semaphore bounds concurrent sessions the way a pool would.
//!
//! # Security Guarantees
//! - Sessions are opened with `ApplicationIntent=ReadOnly`
//! - `SET LOCK_TIMEOUT` plus a client-side timeout bound every query
//! - Identifiers are bracket-quoted; the row limit is a bound parameter

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
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub use sampling::build_sample_query;

/// SQL Server connector that opens one session per operation
pub struct SqlServerConnector {
    config: tiberius::Config,
    schema: Option<String>,
    connect_timeout: Duration,
    query_timeout: Duration,
    sessions: Arc<Semaphore>,
    /// Human-readable target for logs, credentials excluded
    target: String,
}

impl std::fmt::Debug for SqlServerConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // tiberius::Config carries the password, so it is never printed
        f.debug_struct("SqlServerConnector")
            .field("target", &self.target)
            .field("schema", &self.schema)
            .field("available_sessions", &self.sessions.available_permits())
            .finish()
    }
}

#[async_trait]
impl SchemaIntrospector for SqlServerConnector {
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        let _permit = self.acquire_session_slot().await?;
        let mut client = self.open_session().await?;
        let tables = tokio::time::timeout(
            self.query_timeout,
            introspection::list_tables(&mut client, self.schema.as_deref()),
        )
        .await
        .map_err(|_| ScanError::timeout("SQL Server catalog query", self.query_timeout))??;
        let _ = client.close().await;
        Ok(tables)
    }
}

#[async_trait]
impl RowSampler for SqlServerConnector {
    async fn sample_rows(
        &self,
        table: &TableDescriptor,
        limit: u32,
        strategy: OffsetStrategy,
    ) -> Result<SampleBatch> {
        let qualified = table.qualified_name();
        let _permit = self.acquire_session_slot().await?;
        let mut client = self.open_session().await.map_err(|e| {
            ScanError::sampling(&qualified, format!("could not open session: {}", e))
        })?;

        let batch = tokio::time::timeout(
            self.query_timeout,
            sampling::sample_rows(&mut client, table, limit, strategy),
        )
        .await
        .map_err(|_| ScanError::timeout(format!("sample {}", qualified), self.query_timeout))??;

        let _ = client.close().await;
        Ok(batch)
    }
}

#[async_trait]
impl Connector for SqlServerConnector {
    fn engine(&self) -> EngineKind {
        EngineKind::SqlServer
    }

    async fn test_connection(&self) -> Result<()> {
        let _permit = self.acquire_session_slot().await?;
        let mut client = self.open_session().await?;

        let row = client
            .query("SELECT CAST(1 AS INT)", &[])
            .await
            .map_err(ScanError::connection_failed)?
            .into_row()
            .await
            .map_err(ScanError::connection_failed)?;

        let value = row.and_then(|r| r.try_get::<i32, _>(0).ok().flatten());
        if value != Some(1) {
            return Err(ScanError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        let _ = client.close().await;
        tracing::debug!("SQL Server connection test passed");
        Ok(())
    }

    async fn close(&self) {
        self.sessions.close();
    }
}
