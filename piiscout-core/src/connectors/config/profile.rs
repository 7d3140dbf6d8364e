//! Connection profile: which engine to reach and how.
//!
//! A profile is immutable once a scan starts. It is owned by the caller and
//! only borrowed by the connector factory.

use crate::error::{ScanError, redact_database_url};
use crate::models::EngineKind;
use crate::security::Credentials;
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Upper bound for any session-level statement timeout.
const MAX_QUERY_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything needed to open read-only sessions against one database.
///
/// # Security
/// `Debug` and `Display` never include the password; credentials are zeroized
/// when the profile is dropped.
///
/// # Example
/// ```rust
/// use piiscout_core::connectors::ConnectionProfile;
/// use piiscout_core::models::EngineKind;
///
/// let profile = ConnectionProfile::from_url("postgres://scan:pw@db.internal:5433/crm?schema=sales")
///     .unwrap();
/// assert_eq!(profile.engine, EngineKind::PostgreSQL);
/// assert_eq!(profile.port(), 5433);
/// assert_eq!(profile.schema.as_deref(), Some("sales"));
/// assert!(!profile.to_string().contains("pw"));
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionProfile {
    pub engine: EngineKind,
    pub host: String,
    pub port: Option<u16>,
    pub database: Option<String>,
    /// Restricts introspection to one schema when set
    pub schema: Option<String>,
    pub credentials: Credentials,
    /// Time allowed to establish a connection
    pub connect_timeout: Duration,
    /// Session-level statement timeout
    pub query_timeout: Duration,
    /// Upper bound for pooled connections
    pub max_connections: u32,
    /// Engine-specific options (e.g. `sslmode`, `trust_server_certificate`)
    pub options: BTreeMap<String, String>,
}

impl ConnectionProfile {
    /// Creates a profile with safe defaults.
    pub fn new(engine: EngineKind, host: impl Into<String>) -> Self {
        Self {
            engine,
            host: host.into(),
            port: None,
            database: None,
            schema: None,
            credentials: Credentials::default(),
            connect_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(5),
            max_connections: 4,
            options: BTreeMap::new(),
        }
    }

    /// Parses a connection URL.
    ///
    /// Supported schemes: `postgres`, `postgresql`, `mysql`, `mariadb`,
    /// `mssql`, `sqlserver`. Recognized query parameters: `schema`,
    /// `connect_timeout` (seconds), `statement_timeout` (milliseconds),
    /// `pool_max_conns`; everything else is kept in `options`.
    ///
    /// # Errors
    /// Returns a configuration error (with the URL redacted) when the URL is
    /// malformed, the scheme is unknown, or the resulting profile is invalid.
    pub fn from_url(connection_string: &str) -> crate::Result<Self> {
        let url = Url::parse(connection_string).map_err(|e| {
            ScanError::configuration(format!(
                "Invalid connection string {}: {}",
                redact_database_url(connection_string),
                e
            ))
        })?;

        let engine = engine_for_scheme(url.scheme())?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ScanError::configuration("Connection string must specify a host"))?;

        let mut profile = Self::new(engine, host);
        profile.port = url.port();

        let database = url.path().trim_start_matches('/');
        if !database.is_empty() {
            profile.database = Some(decode(database)?);
        }

        if !url.username().is_empty() {
            let password = url.password().map(decode).transpose()?;
            profile.credentials = Credentials::new(decode(url.username())?, password);
        }

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "schema" | "currentSchema" => profile.schema = Some(value.into_owned()),
                "connect_timeout" => {
                    if let Ok(secs) = value.parse::<u64>()
                        && secs > 0
                        && secs <= 300
                    {
                        profile.connect_timeout = Duration::from_secs(secs);
                    }
                }
                "statement_timeout" => {
                    if let Ok(ms) = value.parse::<u64>()
                        && ms > 0
                    {
                        profile.query_timeout = Duration::from_millis(ms);
                    }
                }
                "pool_max_conns" => {
                    if let Ok(max) = value.parse::<u32>()
                        && max > 0
                        && max <= 100
                    {
                        profile.max_connections = max;
                    }
                }
                other => {
                    profile
                        .options
                        .insert(other.to_string(), value.into_owned());
                }
            }
        }

        profile.validate()?;
        Ok(profile)
    }

    /// Effective port, falling back to the engine default.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(match self.engine {
            EngineKind::PostgreSQL => 5432,
            EngineKind::MySQL => 3306,
            EngineKind::SqlServer => 1433,
            EngineKind::Synthetic => 0,
        })
    }

    /// Looks up an engine-specific option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Whether a boolean option is set to a truthy value.
    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.option(key).map(str::to_ascii_lowercase).as_deref(),
            Some("true" | "yes" | "1" | "on")
        )
    }

    /// Validates profile parameters.
    ///
    /// # Errors
    /// Returns error if values are empty, zero, or beyond safety limits
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(ScanError::configuration("host cannot be empty"));
        }

        if self.port == Some(0) {
            return Err(ScanError::configuration("port must be greater than 0"));
        }

        if self.max_connections == 0 {
            return Err(ScanError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 100 {
            return Err(ScanError::configuration(
                "max_connections should not exceed 100 for safety",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(ScanError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.query_timeout.is_zero() || self.query_timeout > MAX_QUERY_TIMEOUT {
            return Err(ScanError::configuration(
                "query_timeout must be between 1ms and 300s",
            ));
        }

        if let Some(schema) = &self.schema
            && schema.trim().is_empty()
        {
            return Err(ScanError::configuration("schema cannot be blank"));
        }

        Ok(())
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Builder method to restrict introspection to one schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Builder method to set credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Builder method to set the session statement timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Builder method to set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl std::fmt::Display for ConnectionProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({}:{}", self.engine, self.host, self.port())?;
        if let Some(database) = &self.database {
            write!(f, "/{}", database)?;
        }
        if let Some(schema) = &self.schema {
            write!(f, " schema={}", schema)?;
        }
        // Intentionally omit username and never include credentials
        write!(f, ")")
    }
}

/// Maps a URL scheme to the engine family that serves it.
pub fn engine_for_scheme(scheme: &str) -> crate::Result<EngineKind> {
    match scheme {
        "postgres" | "postgresql" => Ok(EngineKind::PostgreSQL),
        "mysql" | "mariadb" => Ok(EngineKind::MySQL),
        "mssql" | "sqlserver" => Ok(EngineKind::SqlServer),
        other => Err(ScanError::unsupported_engine(
            other,
            "expected postgres://, mysql://, mariadb://, mssql:// or sqlserver://",
        )),
    }
}

fn decode(component: &str) -> crate::Result<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| ScanError::configuration("Connection string component is not valid UTF-8"))
}
