//! Command-line front end for the PIIScout discovery engine.
//!
//! The binary parses operator flags, builds a [`ConnectionProfile`] and
//! [`ScanOptions`], runs one scan and writes the result as JSON (optionally
//! zstd-compressed) or as a human readable summary.
//!
//! # Security Guarantees
//! - Read-only database sessions only
//! - Credentials are never logged; URLs are redacted before display
//! - Reports contain masked excerpts, never raw scanned values

use clap::{Args, Parser, Subcommand, ValueEnum};
use piiscout_core::logging::LogFormat;
use piiscout_core::{ConnectionProfile, Result, ScanMode, ScanOptions};
use std::path::PathBuf;
use std::time::Duration;

pub mod output;

#[derive(Debug, Parser)]
#[command(name = "piiscout")]
#[command(about = "Adaptive PII discovery for relational databases")]
#[command(version)]
#[command(long_about = "
PIIScout - Time-bounded PII discovery

Ranks tables by how likely they are to hold personal data, samples a bounded
number of rows per table and reports masked findings with a compliance score.

SCAN MODES:
- fast   100 rows per table, top 55% of tables, 2 workers
- smart  300 rows per table, every table, 3 workers
- deep   500 rows per table, top 20% sampled up to 1000 rows, 3 workers

SECURITY FEATURES:
- Read-only sessions with statement timeouts
- No credentials stored or logged
- Findings carry masked excerpts only

SUPPORTED DATABASES:
- PostgreSQL (postgres://)
- MySQL (mysql://)
- SQL Server (mssql://)

EXAMPLES:
  piiscout scan postgres://scanner@localhost/crm
  piiscout scan --mode deep --output report.json --ask-password mysql://scanner@db/shop
  piiscout scan --format summary --global-timeout 30 mssql://scanner@sql01/hr
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scan a database for personal data
    Scan(ScanArgs),
    /// Test database connection
    Test(TestArgs),
    /// List scan modes and their parameters
    Modes,
}

/// Report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// Full `ScanResult` as JSON
    #[default]
    Json,
    /// Human readable findings table
    Summary,
}

/// Log line rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatArg {
    #[default]
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Database connection URL
    #[arg(
        env = "DATABASE_URL",
        help = "Database connection string (credentials will be sanitized in logs)"
    )]
    pub database_url: String,

    /// Scan intensity
    #[arg(short, long, default_value = "smart", value_parser = parse_mode)]
    pub mode: ScanMode,

    /// Output file path
    #[arg(short, long, help = "Write the report to a file instead of stdout")]
    pub output: Option<PathBuf>,

    /// Enable compression
    #[arg(long, requires = "output", help = "Compress output using Zstandard (.json.zst)")]
    pub compress: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    pub format: ReportFormat,

    /// Global scan budget in seconds
    #[arg(long, value_name = "SECS", help = "Wall-clock budget for the whole scan")]
    pub global_timeout: Option<u64>,

    /// Per-table budget in seconds
    #[arg(long, value_name = "SECS", help = "Budget for sampling and classifying one table")]
    pub table_timeout: Option<u64>,

    /// Worker override
    #[arg(long, help = "Number of concurrent table workers (1-8)")]
    pub workers: Option<usize>,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Debug, Args)]
pub struct TestArgs {
    /// Database connection URL
    #[arg(env = "DATABASE_URL", help = "Database connection string to test")]
    pub database_url: String,

    #[command(flatten)]
    pub credentials: CredentialArgs,
}

#[derive(Debug, Args)]
pub struct CredentialArgs {
    /// Prompt for the database password instead of putting it in the URL
    #[arg(long)]
    pub ask_password: bool,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

fn parse_mode(value: &str) -> std::result::Result<ScanMode, String> {
    value.parse::<ScanMode>().map_err(|e| e.to_string())
}

impl ScanArgs {
    /// Operator overrides for the scan plan.
    pub fn scan_options(&self) -> ScanOptions {
        let mut options = ScanOptions::default();
        if let Some(secs) = self.global_timeout {
            options = options.with_global_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.table_timeout {
            options = options.with_per_table_timeout(Duration::from_secs(secs));
        }
        if let Some(workers) = self.workers {
            options = options.with_workers(workers);
        }
        options
    }
}

/// Parses the URL and, when asked, fills in a password from `read_password`.
///
/// The reader is injected so the prompt can be replaced in tests.
///
/// # Errors
/// Returns a configuration error for malformed URLs or a failed prompt.
pub fn build_profile<F>(database_url: &str, ask_password: bool, read_password: F) -> Result<ConnectionProfile>
where
    F: FnOnce() -> std::io::Result<String>,
{
    let mut profile = ConnectionProfile::from_url(database_url)?;
    if ask_password {
        let password = read_password().map_err(|e| {
            piiscout_core::ScanError::configuration(format!("Failed to read password: {}", e))
        })?;
        if password.is_empty() {
            return Err(piiscout_core::ScanError::configuration(
                "Password cannot be empty",
            ));
        }
        profile.credentials.set_password(password);
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scan_defaults() {
        let cli = Cli::try_parse_from(["piiscout", "scan", "postgres://scan@localhost/crm"]).unwrap();
        let Command::Scan(args) = cli.command else {
            panic!("expected scan command");
        };
        assert_eq!(args.mode, ScanMode::Smart);
        assert_eq!(args.format, ReportFormat::Json);
        assert!(args.output.is_none());
        assert!(!args.compress);
        assert_eq!(args.scan_options(), ScanOptions::default());
    }

    #[test]
    fn test_scan_overrides() {
        let cli = Cli::try_parse_from([
            "piiscout",
            "-vv",
            "--log-format",
            "json",
            "scan",
            "--mode",
            "DEEP",
            "--global-timeout",
            "30",
            "--table-timeout",
            "5",
            "--workers",
            "4",
            "--format",
            "summary",
            "mysql://scan@db/shop",
        ])
        .unwrap();
        assert_eq!(cli.global.verbose, 2);
        assert_eq!(cli.global.log_format, LogFormatArg::Json);
        let Command::Scan(args) = cli.command else {
            panic!("expected scan command");
        };
        assert_eq!(args.mode, ScanMode::Deep);
        assert_eq!(args.format, ReportFormat::Summary);
        let options = args.scan_options();
        assert_eq!(options.global_timeout, Some(Duration::from_secs(30)));
        assert_eq!(options.per_table_timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.worker_count, Some(4));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result = Cli::try_parse_from(["piiscout", "scan", "--mode", "turbo", "postgres://h/db"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_compress_requires_output() {
        let result = Cli::try_parse_from(["piiscout", "scan", "--compress", "postgres://h/db"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_build_profile_prompts_only_when_asked() {
        let profile = build_profile("postgres://scan@localhost/crm", false, || {
            panic!("prompt should not run")
        })
        .unwrap();
        assert!(!profile.credentials.has_password());

        let profile = build_profile("postgres://scan@localhost/crm", true, || {
            Ok("hunter2".to_string())
        })
        .unwrap();
        assert_eq!(profile.credentials.password(), Some("hunter2"));
        assert!(!format!("{:?}", profile).contains("hunter2"));
    }

    #[test]
    fn test_build_profile_rejects_empty_password() {
        let error = build_profile("postgres://scan@localhost/crm", true, || Ok(String::new()))
            .unwrap_err();
        assert!(error.to_string().contains("Password cannot be empty"));
    }
}
