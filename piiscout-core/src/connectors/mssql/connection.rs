//! SQL Server session management.

use super::SqlServerConnector;
use crate::Result;
use crate::connectors::ConnectionProfile;
use crate::error::ScanError;
use std::sync::Arc;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

pub(super) type Session = Client<Compat<TcpStream>>;

impl SqlServerConnector {
    /// Builds the connector and verifies that a session can be opened.
    ///
    /// # Errors
    /// Returns a connection error if the server is unreachable or rejects the
    /// login.
    pub async fn connect(profile: &ConnectionProfile) -> Result<Self> {
        let connector = Self {
            config: build_config(profile)?,
            schema: profile.schema.clone(),
            connect_timeout: profile.connect_timeout,
            query_timeout: profile.query_timeout,
            sessions: Arc::new(Semaphore::new(profile.max_connections.min(100) as usize)),
            target: profile.to_string(),
        };

        let client = connector.open_session().await?;
        let _ = client.close().await;

        tracing::debug!("Verified SQL Server session to {}", connector.target);
        Ok(connector)
    }

    /// Waits for a free session slot.
    pub(super) async fn acquire_session_slot(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.sessions)
            .acquire_owned()
            .await
            .map_err(|_| ScanError::configuration("SQL Server connector is closed"))
    }

    /// Opens a read-only session with a lock timeout applied.
    pub(super) async fn open_session(&self) -> Result<Session> {
        let tcp = tokio::time::timeout(
            self.connect_timeout,
            TcpStream::connect(self.config.get_addr()),
        )
        .await
        .map_err(|_| ScanError::timeout(format!("connect to {}", self.target), self.connect_timeout))?
        .map_err(|e| ScanError::connection_context(format!("Failed to reach {}", self.target), e))?;

        tcp.set_nodelay(true).map_err(|e| ScanError::Io {
            context: "Failed to configure SQL Server socket".to_string(),
            source: e,
        })?;

        let mut client = tokio::time::timeout(
            self.connect_timeout,
            Client::connect(self.config.clone(), tcp.compat_write()),
        )
        .await
        .map_err(|_| ScanError::timeout(format!("login to {}", self.target), self.connect_timeout))?
        .map_err(|e| ScanError::connection_context(format!("Failed to connect to {}", self.target), e))?;

        let lock_timeout_ms = self.query_timeout.as_millis().min(5_000);
        client
            .execute(format!("SET LOCK_TIMEOUT {}", lock_timeout_ms), &[])
            .await
            .map_err(|e| ScanError::connection_context("Failed to apply session settings", e))?;

        Ok(client)
    }
}

fn build_config(profile: &ConnectionProfile) -> Result<Config> {
    let mut config = Config::new();
    config.host(&profile.host);
    config.port(profile.port());
    config.application_name(concat!("piiscout-", env!("CARGO_PKG_VERSION")));
    config.readonly(true);

    if let Some(database) = &profile.database {
        config.database(database);
    }

    let username = profile.credentials.username();
    if username.is_empty() {
        return Err(ScanError::configuration(
            "SQL Server connections require a username",
        ));
    }
    config.authentication(AuthMethod::sql_server(
        username,
        profile.credentials.password().unwrap_or_default(),
    ));

    if profile.flag("trust_server_certificate") || profile.flag("TrustServerCertificate") {
        config.trust_cert();
    }
    if let Some(encrypt) = profile.option("encrypt") {
        let level = match encrypt.to_ascii_lowercase().as_str() {
            "false" | "off" | "no" => EncryptionLevel::Off,
            "true" | "on" | "yes" | "strict" => EncryptionLevel::Required,
            other => {
                return Err(ScanError::configuration(format!(
                    "Unsupported encrypt option '{}'",
                    other
                )));
            }
        };
        config.encryption(level);
    }

    Ok(config)
}
