//! Scan entry points.
//!
//! [`start_scan`] runs the full pipeline against a connection profile:
//! connect, introspect, rank, plan, sample and classify, aggregate.
//! Only connection and introspection failures surface as errors. Everything
//! else degrades into the returned [`ScanResult`].

use crate::Result;
use crate::aggregator::{ScanMetadata, aggregate};
use crate::connectors::{self, ConnectionProfile, Connector};
use crate::detectors::DetectorRegistry;
use crate::error::ScanError;
use crate::models::{ScanMode, ScanResult, TableDescriptor};
use crate::planner::{ScanOptions, ScanPlan};
use crate::prioritizer::rank_tables;
use crate::scheduler;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Runs scans with a fixed detector registry and operator overrides.
///
/// # Example
/// ```rust,no_run
/// use piiscout_core::{ConnectionProfile, ScanMode, Scanner, ScanOptions};
/// use std::time::Duration;
///
/// # async fn example() -> piiscout_core::Result<()> {
/// let profile = ConnectionProfile::from_url("postgres://scanner@localhost/shop")?;
/// let scanner = Scanner::with_options(
///     ScanOptions::default().with_global_timeout(Duration::from_secs(30)),
/// );
/// let result = scanner.scan(&profile, ScanMode::Smart).await?;
/// println!("score {}", result.compliance_score);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Scanner {
    options: ScanOptions,
    registry: Arc<DetectorRegistry>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Scanner with the standard detectors and mode defaults.
    pub fn new() -> Self {
        Self::with_options(ScanOptions::default())
    }

    pub fn with_options(options: ScanOptions) -> Self {
        Self {
            options,
            registry: Arc::new(DetectorRegistry::standard()),
        }
    }

    /// Replaces the detector registry.
    pub fn with_registry(mut self, registry: DetectorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Resolves the plan this scanner would use for `mode`.
    ///
    /// # Errors
    /// Returns a configuration error if the options are invalid.
    pub fn plan(&self, mode: ScanMode) -> Result<ScanPlan> {
        ScanPlan::with_options(mode, &self.options)
    }

    /// Connects with `profile` and scans.
    ///
    /// The connection pool is sized to one session per worker plus one.
    ///
    /// # Errors
    /// Returns a fatal error if the options or profile are invalid, or if
    /// connecting or introspecting fails after one reconnect attempt.
    pub async fn scan(&self, profile: &ConnectionProfile, mode: ScanMode) -> Result<ScanResult> {
        let plan = self.plan(mode)?;
        let mut session_profile = profile.clone();
        session_profile.max_connections =
            u32::try_from(plan.worker_count.saturating_add(1)).unwrap_or(u32::MAX);

        tracing::info!("Starting {} scan of {}", mode, session_profile);
        let clock = ScanClock::start(&plan);

        let session = &session_profile;
        let (connector, tables) = open_session(
            move || async move {
                connectors::connect(session)
                    .await
                    .map(Arc::<dyn Connector>::from)
            },
            &clock,
        )
        .await?;

        Ok(self.run(connector, tables, plan, clock).await)
    }

    /// Scans through an already open connector.
    ///
    /// Introspection is retried once on a connection error while the global
    /// timeout has time left.
    ///
    /// # Errors
    /// Returns a fatal error if the options are invalid or introspection fails.
    pub async fn scan_with_connector(
        &self,
        connector: Arc<dyn Connector>,
        mode: ScanMode,
    ) -> Result<ScanResult> {
        let plan = self.plan(mode)?;
        tracing::info!("Starting {} scan of {} connector", mode, connector.engine());
        let clock = ScanClock::start(&plan);

        let tables = match introspect(connector.as_ref(), &clock).await {
            Ok(tables) => tables,
            Err(error) if error.is_connection_error() && clock.has_budget() => {
                tracing::warn!("Introspection failed, retrying once: {}", error);
                introspect(connector.as_ref(), &clock).await?
            }
            Err(error) => return Err(error),
        };

        Ok(self.run(connector, tables, plan, clock).await)
    }

    async fn run(
        &self,
        connector: Arc<dyn Connector>,
        tables: Vec<TableDescriptor>,
        plan: ScanPlan,
        clock: ScanClock,
    ) -> ScanResult {
        let ranked = rank_tables(tables.clone());
        let targets = plan.select_targets(&ranked);
        tracing::info!(
            "Selected {} of {} tables ({} strategy, {} rows per table, {} workers)",
            targets.len(),
            ranked.len(),
            plan.table_selection_strategy,
            plan.target_rows_per_table,
            plan.worker_count
        );

        let report = scheduler::run(
            Arc::clone(&connector),
            targets,
            &plan,
            Arc::clone(&self.registry),
            clock.started,
        )
        .await;
        connector.close().await;

        let metadata = ScanMetadata {
            scan_id: uuid::Uuid::new_v4(),
            mode: plan.mode,
            engine: connector.engine(),
            started_at: clock.started_at,
            duration: clock.started.elapsed(),
        };
        let result = aggregate(metadata, &tables, report);

        tracing::info!(
            "Scan {} finished in {:?}: {} scanned, {} skipped, {} not reached, {} findings, score {}",
            result.scan_id,
            result.duration,
            result.tables_scanned.len(),
            result.tables_skipped.len(),
            result.tables_not_reached.len(),
            result.findings.len(),
            result.compliance_score
        );
        result
    }
}

/// Start time and global deadline of one scan.
///
/// Connecting, introspecting and sampling all draw from the same budget.
#[derive(Debug, Clone, Copy)]
struct ScanClock {
    started_at: DateTime<Utc>,
    started: Instant,
    deadline: Instant,
}

impl ScanClock {
    fn start(plan: &ScanPlan) -> Self {
        // Wall time first so `started_at + duration` never runs past the end
        let started_at = Utc::now();
        let started = Instant::now();
        Self {
            started_at,
            started,
            deadline: started + plan.global_timeout,
        }
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn has_budget(&self) -> bool {
        !self.remaining().is_zero()
    }
}

/// Opens a connector and lists its tables.
///
/// At most one reconnect is made across both steps, and only while the
/// global timeout has time left.
async fn open_session<F, Fut>(
    mut open: F,
    clock: &ScanClock,
) -> Result<(Arc<dyn Connector>, Vec<TableDescriptor>)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Arc<dyn Connector>>>,
{
    let mut reconnects_left = 1u8;

    let mut connector = match connect_within(&mut open, clock).await {
        Err(error) if error.is_connection_error() && clock.has_budget() => {
            tracing::warn!("Connection failed, retrying once: {}", error);
            reconnects_left = 0;
            connect_within(&mut open, clock).await?
        }
        other => other?,
    };

    loop {
        match introspect(connector.as_ref(), clock).await {
            Ok(tables) => return Ok((connector, tables)),
            Err(error)
                if error.is_connection_error() && reconnects_left > 0 && clock.has_budget() =>
            {
                tracing::warn!("Introspection lost its connection, reconnecting once: {}", error);
                reconnects_left = 0;
                connector.close().await;
                connector = connect_within(&mut open, clock).await?;
            }
            Err(error) => {
                connector.close().await;
                return Err(error);
            }
        }
    }
}

/// One connection attempt, bounded by the time left in the scan.
async fn connect_within<F, Fut>(open: &mut F, clock: &ScanClock) -> Result<Arc<dyn Connector>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Arc<dyn Connector>>>,
{
    let remaining = clock.remaining();
    tokio::time::timeout(remaining, open())
        .await
        .map_err(|elapsed| {
            ScanError::connection_context(
                format!("connection attempt exceeded the remaining {remaining:?} of the scan"),
                elapsed,
            )
        })?
}

/// Lists tables, bounded by the time left in the scan.
async fn introspect(connector: &dyn Connector, clock: &ScanClock) -> Result<Vec<TableDescriptor>> {
    let remaining = clock.remaining();
    let tables = tokio::time::timeout(remaining, connector.list_tables())
        .await
        .map_err(|elapsed| {
            ScanError::introspection_failed(
                format!("catalog query exceeded the remaining {remaining:?} of the scan"),
                elapsed,
            )
        })??;
    tracing::debug!("Introspected {} tables", tables.len());
    Ok(tables)
}

/// Scans the database described by `profile` in `mode`.
///
/// # Errors
/// Returns an error only when connecting or introspecting fails.
pub async fn start_scan(profile: &ConnectionProfile, mode: ScanMode) -> Result<ScanResult> {
    Scanner::new().scan(profile, mode).await
}

/// Blocking variant of [`start_scan`] for callers without a runtime.
///
/// # Errors
/// Returns an I/O error if the runtime cannot be built, otherwise the same
/// errors as [`start_scan`].
pub fn start_scan_blocking(profile: &ConnectionProfile, mode: ScanMode) -> Result<ScanResult> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| ScanError::Io {
            context: "Failed to build scan runtime".to_string(),
            source,
        })?;
    runtime.block_on(start_scan(profile, mode))
}
