//! PIIScout command-line scanner.
//!
//! Connects to a database with a read-only session, runs one time-bounded
//! PII discovery scan and writes the report to stdout or a file.
//!
//! # Security Guarantees
//! - Read-only database operations only
//! - No credentials stored or logged
//! - Reports hold masked excerpts, never raw values

use clap::Parser;
use piiscout::output::{render, write_report};
use piiscout::{Cli, Command, ScanArgs, TestArgs, build_profile};
use piiscout_core::error::redact_database_url;
use piiscout_core::logging::init_logging;
use piiscout_core::{ScanMode, ScanPlan, Scanner, connect};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet, cli.global.log_format.into())?;

    match &cli.command {
        Command::Scan(args) => run_scan(args).await,
        Command::Test(args) => test_connection(args).await,
        Command::Modes => {
            list_modes();
            Ok(())
        }
    }
}

fn prompt_password() -> std::io::Result<String> {
    rpassword::prompt_password("Database password: ")
}

/// Runs one scan and emits the report.
async fn run_scan(args: &ScanArgs) -> anyhow::Result<()> {
    let profile = build_profile(&args.database_url, args.credentials.ask_password, prompt_password)?;
    let scanner = Scanner::with_options(args.scan_options());

    info!("Starting {} scan", args.mode);
    info!("Target: {}", redact_database_url(&args.database_url));

    let result = scanner.scan(&profile, args.mode).await.map_err(|e| {
        error!("Scan failed: {}", e);
        e
    })?;

    if !result.is_complete() {
        warn!(
            "Scan coverage is partial: {} skipped, {} not reached",
            result.tables_skipped.len(),
            result.tables_not_reached.len()
        );
    }
    info!(
        "Scan completed: {} findings, compliance score {}",
        result.findings.len(),
        result.compliance_score
    );

    let report = render(&result, args.format)?;
    match &args.output {
        Some(path) => {
            write_report(&report, path, args.compress).await?;
            info!("Report saved to {}", path.display());
        }
        None => println!("{}", report),
    }

    Ok(())
}

/// Tests database connection without sampling.
async fn test_connection(args: &TestArgs) -> anyhow::Result<()> {
    info!("Testing database connection...");
    let profile = build_profile(&args.database_url, args.credentials.ask_password, prompt_password)?;

    let connector = connect(&profile).await.map_err(|e| {
        error!("Failed to connect: {}", e);
        e
    })?;

    let outcome = connector.test_connection().await;
    connector.close().await;
    outcome.map_err(|e| {
        error!("Connection test failed: {}", e);
        e
    })?;

    println!("Connection to {} database successful", connector.engine());
    Ok(())
}

/// Prints every mode's fixed parameters.
fn list_modes() {
    println!("Scan Modes:");
    println!();
    for mode in ScanMode::ALL {
        let plan = ScanPlan::for_mode(mode);
        println!("{}:", mode);
        println!("  Rows per table:   {}", plan.target_rows_per_table);
        println!("  Workers:          {}", plan.worker_count);
        println!("  Table selection:  {}", plan.table_selection_strategy);
        println!("  Global timeout:   {}s", plan.global_timeout.as_secs());
        println!("  Table timeout:    {}s", plan.per_table_timeout.as_secs());
        println!();
    }

    println!("Overrides:");
    println!("  --global-timeout SECS  (1-3600)");
    println!("  --table-timeout SECS   (at most the global timeout)");
    println!("  --workers N            (1-8)");
    println!();

    println!("Supported Databases:");
    #[cfg(feature = "postgresql")]
    println!("  PostgreSQL  postgres://user@host:5432/database?schema=public");
    #[cfg(feature = "mysql")]
    println!("  MySQL       mysql://user@host:3306/database");
    #[cfg(feature = "mssql")]
    println!("  SQL Server  mssql://user@host:1433/database?trust_server_certificate=true");
}
