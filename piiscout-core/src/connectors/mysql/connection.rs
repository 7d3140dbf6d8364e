//! MySQL pool creation.

use super::MySqlConnector;
use crate::Result;
use crate::connectors::ConnectionProfile;
use crate::error::ScanError;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlSslMode};

impl MySqlConnector {
    /// Opens a pool and verifies that one session can be established.
    ///
    /// # Errors
    /// Returns a connection error if the server is unreachable, rejects the
    /// credentials, or the session settings cannot be applied.
    pub async fn connect(profile: &ConnectionProfile) -> Result<Self> {
        let options = connect_options(profile)?;

        let max_execution_ms = profile.query_timeout.as_millis();
        let lock_wait_secs = profile.query_timeout.as_secs().clamp(1, 5);

        let pool = MySqlPoolOptions::new()
            .max_connections(profile.max_connections.min(100))
            .min_connections(0)
            .acquire_timeout(profile.connect_timeout)
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    use sqlx::Executor;

                    conn.execute(
                        format!("SET SESSION MAX_EXECUTION_TIME = {}", max_execution_ms).as_str(),
                    )
                    .await?;
                    conn.execute(
                        format!("SET SESSION lock_wait_timeout = {}", lock_wait_secs).as_str(),
                    )
                    .await?;
                    conn.execute("SET SESSION TRANSACTION READ ONLY").await?;
                    conn.execute("SET time_zone = '+00:00'").await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await
            .map_err(|e| {
                ScanError::connection_context(format!("Failed to connect to {}", profile), e)
            })?;

        tracing::debug!(
            "Opened MySQL pool to {} (max {} connections)",
            profile,
            profile.max_connections
        );

        Ok(Self {
            pool,
            schema: profile.schema.clone().or_else(|| profile.database.clone()),
        })
    }
}

fn connect_options(profile: &ConnectionProfile) -> Result<MySqlConnectOptions> {
    let mut options = MySqlConnectOptions::new()
        .host(&profile.host)
        .port(profile.port())
        .charset("utf8mb4");

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
    if let Some(mode) = profile.option("ssl-mode").or_else(|| profile.option("sslmode")) {
        let ssl_mode: MySqlSslMode = mode.parse().map_err(|_| {
            ScanError::configuration(format!("Unsupported ssl-mode '{}'", mode))
        })?;
        options = options.ssl_mode(ssl_mode);
    }

    Ok(options)
}
