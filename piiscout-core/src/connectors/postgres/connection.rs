//! PostgreSQL pool creation.
//!
//! # Security Features
//! - Session settings are applied to every pooled connection via `after_connect`
//! - Pool size is bounded by the profile (workers + 1 during a scan)
//! - Credentials are passed to the driver directly, never through a URL string

use super::PostgresConnector;
use crate::Result;
use crate::connectors::ConnectionProfile;
use crate::error::ScanError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};

impl PostgresConnector {
    /// Opens a pool and verifies that one session can be established.
    ///
    /// # Errors
    /// Returns a connection error if the server is unreachable, rejects the
    /// credentials, or the session settings cannot be applied.
    pub async fn connect(profile: &ConnectionProfile) -> Result<Self> {
        let options = connect_options(profile)?;

        let statement_timeout_ms = profile.query_timeout.as_millis();
        let lock_timeout_ms = statement_timeout_ms.min(5_000);

        let pool = PgPoolOptions::new()
            .max_connections(profile.max_connections.min(100))
            .min_connections(0)
            .acquire_timeout(profile.connect_timeout)
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    use sqlx::Executor;

                    conn.execute(
                        format!("SET statement_timeout = {}", statement_timeout_ms).as_str(),
                    )
                    .await?;
                    conn.execute(format!("SET lock_timeout = {}", lock_timeout_ms).as_str())
                        .await?;
                    conn.execute("SET idle_in_transaction_session_timeout = '60s'")
                        .await?;
                    conn.execute("SET default_transaction_read_only = on")
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| {
                ScanError::connection_context(
                    format!("Failed to connect to {}", profile),
                    e,
                )
            })?;

        tracing::debug!(
            "Opened PostgreSQL pool to {} (max {} connections)",
            profile,
            profile.max_connections
        );

        Ok(Self {
            pool,
            schema: profile.schema.clone(),
        })
    }
}

/// Builds driver options from a profile.
fn connect_options(profile: &ConnectionProfile) -> Result<PgConnectOptions> {
    let mut options = PgConnectOptions::new()
        .host(&profile.host)
        .port(profile.port())
        .application_name(concat!("piiscout-", env!("CARGO_PKG_VERSION")));

    let username = profile.credentials.username();
    if !username.is_empty() {
        options = options.username(username);
    }
    if let Some(password) = profile.credentials.password() {
        options = options.password(password);
    }
    if let Some(database) = &profile.database {
        options = options.database(database);
    }
    if let Some(mode) = profile.option("sslmode") {
        let ssl_mode: PgSslMode = mode.parse().map_err(|_| {
            ScanError::configuration(format!("Unsupported sslmode '{}'", mode))
        })?;
        options = options.ssl_mode(ssl_mode);
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngineKind;

    #[test]
    fn test_connect_options_reject_unknown_sslmode() {
        let profile =
            ConnectionProfile::from_url("postgres://scan@localhost/app?sslmode=sometimes").unwrap();
        assert!(connect_options(&profile).is_err());
    }

    #[test]
    fn test_connect_options_accept_profile() {
        let profile = ConnectionProfile::new(EngineKind::PostgreSQL, "localhost")
            .with_database("app");
        assert!(connect_options(&profile).is_ok());
    }
}
