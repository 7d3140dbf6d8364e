//! In-memory connector for tests and dry runs.
//!
//! Tables are declared in code, either with literal rows or with a generator
//! function for large row counts. Tables can be made slow or failing to
//! exercise the scheduler's timeout and skip paths.

use super::sampling::ScatterPlan;
use super::{Connector, RowSampler, SchemaIntrospector};
use crate::Result;
use crate::error::ScanError;
use crate::models::{
    ColumnDescriptor, ColumnKind, EngineKind, OffsetStrategy, RowLocator, SampleBatch,
    TableDescriptor,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Produces the cell at `(row, column)` of a generated table.
pub type CellGenerator = Arc<dyn Fn(u64, usize) -> Option<String> + Send + Sync>;

#[derive(Clone)]
enum RowSource {
    Literal(Vec<Vec<Option<String>>>),
    Generated { count: u64, generator: CellGenerator },
}

impl RowSource {
    fn len(&self) -> u64 {
        match self {
            RowSource::Literal(rows) => rows.len() as u64,
            RowSource::Generated { count, .. } => *count,
        }
    }

    fn cell(&self, row: u64, column: usize) -> Option<String> {
        match self {
            RowSource::Literal(rows) => usize::try_from(row)
                .ok()
                .and_then(|r| rows.get(r))
                .and_then(|cells| cells.get(column).cloned().flatten()),
            RowSource::Generated { generator, .. } => generator(row, column),
        }
    }
}

/// One table served by a [`SyntheticConnector`].
#[derive(Clone)]
pub struct SyntheticTable {
    descriptor: TableDescriptor,
    source: RowSource,
    estimated_rows_override: Option<Option<u64>>,
    delay: Duration,
    failure: Option<String>,
}

impl std::fmt::Debug for SyntheticTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntheticTable")
            .field("table", &self.descriptor.qualified_name())
            .field("rows", &self.source.len())
            .field("delay", &self.delay)
            .field("failure", &self.failure)
            .finish()
    }
}

impl SyntheticTable {
    /// Creates an empty table with no columns.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            descriptor: TableDescriptor::new(schema, name, 0),
            source: RowSource::Literal(Vec::new()),
            estimated_rows_override: None,
            delay: Duration::ZERO,
            failure: None,
        }
    }

    /// Adds a column; ordinal positions follow declaration order.
    pub fn column(mut self, name: &str, declared_type: &str, kind: ColumnKind) -> Self {
        let ordinal = u32::try_from(self.descriptor.columns.len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        self.descriptor
            .columns
            .push(ColumnDescriptor::new(name, declared_type, kind, true, ordinal));
        self
    }

    /// Adds a text column.
    pub fn text_column(self, name: &str) -> Self {
        self.column(name, "text", ColumnKind::Text)
    }

    /// Appends literal rows; cells follow column declaration order.
    pub fn rows<I, R, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let mut literal = match self.source {
            RowSource::Literal(existing) => existing,
            RowSource::Generated { .. } => Vec::new(),
        };
        literal.extend(
            rows.into_iter()
                .map(|row| row.into_iter().map(|cell| cell.map(Into::into)).collect()),
        );
        self.source = RowSource::Literal(literal);
        self
    }

    /// Serves `count` rows produced on demand by `generator`.
    pub fn generated<F>(mut self, count: u64, generator: F) -> Self
    where
        F: Fn(u64, usize) -> Option<String> + Send + Sync + 'static,
    {
        self.source = RowSource::Generated {
            count,
            generator: Arc::new(generator),
        };
        self
    }

    /// Overrides the catalog row estimate (`None` means unknown).
    pub fn estimated_rows(mut self, estimate: Option<u64>) -> Self {
        self.estimated_rows_override = Some(estimate);
        self
    }

    /// Delays every sampling call on this table.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes every sampling call on this table fail.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    fn descriptor(&self, declaration_index: usize) -> TableDescriptor {
        let mut descriptor = self.descriptor.clone();
        descriptor.declaration_index = declaration_index;
        descriptor.estimated_rows = self
            .estimated_rows_override
            .unwrap_or(Some(self.source.len()));
        descriptor
    }
}

/// Connector over in-memory tables.
///
/// # Example
/// ```rust
/// use piiscout_core::connectors::{SchemaIntrospector, SyntheticConnector, SyntheticTable};
///
/// # tokio_test_block_on(async {
/// let connector = SyntheticConnector::new(vec![
///     SyntheticTable::new("public", "users")
///         .text_column("email")
///         .rows([[Some("ada@example.com")]]),
/// ]);
/// let tables = connector.list_tables().await.unwrap();
/// assert_eq!(tables[0].qualified_name(), "public.users");
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct SyntheticConnector {
    tables: Vec<SyntheticTable>,
    introspection_failures: AtomicU32,
    introspection_calls: AtomicU32,
    sample_calls: AtomicU64,
}

impl SyntheticConnector {
    /// Creates a connector serving `tables` in the given catalog order.
    pub fn new(tables: Vec<SyntheticTable>) -> Self {
        Self {
            tables,
            introspection_failures: AtomicU32::new(0),
            introspection_calls: AtomicU32::new(0),
            sample_calls: AtomicU64::new(0),
        }
    }

    /// Makes the first `count` introspection calls fail with a connection error.
    pub fn with_transient_connection_failures(self, count: u32) -> Self {
        self.introspection_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Number of `list_tables` calls so far.
    pub fn introspection_calls(&self) -> u32 {
        self.introspection_calls.load(Ordering::SeqCst)
    }

    /// Number of `sample_rows` calls so far.
    pub fn sample_calls(&self) -> u64 {
        self.sample_calls.load(Ordering::SeqCst)
    }

    fn find(&self, table: &TableDescriptor) -> Option<&SyntheticTable> {
        self.tables.iter().find(|t| {
            t.descriptor.schema == table.schema && t.descriptor.name == table.name
        })
    }
}

#[async_trait]
impl SchemaIntrospector for SyntheticConnector {
    async fn list_tables(&self) -> Result<Vec<TableDescriptor>> {
        self.introspection_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.introspection_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.introspection_failures
                .store(remaining.saturating_sub(1), Ordering::SeqCst);
            return Err(ScanError::connection_context(
                "Synthetic connection dropped",
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset"),
            ));
        }

        Ok(self
            .tables
            .iter()
            .enumerate()
            .map(|(index, table)| table.descriptor(index))
            .collect())
    }
}

#[async_trait]
impl RowSampler for SyntheticConnector {
    async fn sample_rows(
        &self,
        table: &TableDescriptor,
        limit: u32,
        strategy: OffsetStrategy,
    ) -> Result<SampleBatch> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        let qualified = table.qualified_name();

        let source = self
            .find(table)
            .ok_or_else(|| ScanError::sampling(&qualified, "relation does not exist"))?;

        if !source.delay.is_zero() {
            tokio::time::sleep(source.delay).await;
        }
        if let Some(message) = &source.failure {
            return Err(ScanError::sampling(&qualified, message.clone()));
        }

        let projected: Vec<(usize, String)> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.kind.is_sampleable())
            .map(|(i, c)| (i, c.name.clone()))
            .collect();
        let columns = projected.iter().map(|(_, name)| name.clone()).collect();
        let mut batch = SampleBatch::new(&qualified, columns, strategy);
        if projected.is_empty() {
            return Ok(batch);
        }

        let total = source.source.len();
        let plan = match strategy {
            OffsetStrategy::FirstN => None,
            OffsetStrategy::Scatter { seed } => {
                ScatterPlan::for_table(seed, table.estimated_rows, limit)
            }
        };

        for index in 0..u64::from(limit) {
            let position = plan.map_or(index, |p| p.locator(index).0);
            if position >= total {
                break;
            }
            let cells = projected
                .iter()
                .map(|(column, _)| source.source.cell(position, *column))
                .collect();
            batch.push_row(RowLocator(position), cells);
        }

        Ok(batch)
    }
}

#[async_trait]
impl Connector for SyntheticConnector {
    fn engine(&self) -> EngineKind {
        EngineKind::Synthetic
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) {}
}
