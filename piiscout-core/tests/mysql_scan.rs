//! MySQL end-to-end scan tests.
//!
//! This test suite covers:
//! - `INFORMATION_SCHEMA` introspection scoped to the connection database
//! - FirstN and `ROW_NUMBER()` modulo scatter sampling
//! - Full scans against a seeded database
//!
//! These tests start a MySQL container and need Docker.

#![cfg(feature = "mysql")]

use piiscout_core::connectors::mysql::MySqlConnector;
use piiscout_core::connectors::{RowSampler, SchemaIntrospector};
use piiscout_core::{
    Category, ColumnKind, ConnectionProfile, Connector, OffsetStrategy, Result, ScanError,
    ScanMode, start_scan,
};
use sqlx::MySqlPool;
use std::collections::BTreeSet;
use std::time::Duration;
use testcontainers_modules::{mysql::Mysql, testcontainers::runners::AsyncRunner};

/// Helper function to wait for MySQL to be ready
async fn wait_for_mysql_ready(database_url: &str, max_attempts: u32) -> Result<()> {
    let mut attempts = 0;
    while attempts < max_attempts {
        if let Ok(pool) = MySqlPool::connect(database_url).await {
            if sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok() {
                pool.close().await;
                return Ok(());
            }
            pool.close().await;
        }
        attempts += 1;
        if attempts < max_attempts {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
    Err(ScanError::connection_failed(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        format!("MySQL failed to become ready after {} attempts", max_attempts),
    )))
}

async fn seed(database_url: &str) {
    let pool = MySqlPool::connect(database_url).await.unwrap();
    sqlx::query(
        "CREATE TABLE payments (
            id INT AUTO_INCREMENT PRIMARY KEY,
            card_number VARCHAR(32),
            iban VARCHAR(40),
            receipt BLOB,
            active TINYINT(1)
        )",
    )
    .execute(&pool)
    .await
    .unwrap();
    for i in 0..600 {
        let card = if i % 3 == 0 { Some("4111 1111 1111 1111") } else { None };
        sqlx::query("INSERT INTO payments (card_number, iban, active) VALUES (?, ?, ?)")
            .bind(card)
            .bind("NL91ABNA0417164300")
            .bind(i % 2)
            .execute(&pool)
            .await
            .unwrap();
    }
    sqlx::query("CREATE TABLE themes (name VARCHAR(32))")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("ANALYZE TABLE payments, themes")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;
}

#[tokio::test]
#[ignore = "requires Docker, run with --ignored"]
async fn test_mysql_introspection_and_sampling() -> Result<()> {
    let mysql = Mysql::default().start().await.unwrap();
    let port = mysql.get_host_port_ipv4(3306).await.unwrap();
    let database_url = format!("mysql://root@localhost:{}/test", port);
    wait_for_mysql_ready(&database_url, 60).await?;
    seed(&database_url).await;

    let profile = ConnectionProfile::from_url(&database_url)?;
    let connector = MySqlConnector::connect(&profile).await?;
    connector.test_connection().await?;

    let tables = connector.list_tables().await?;
    assert!(tables.iter().all(|t| t.schema == "test"));
    let payments = tables.iter().find(|t| t.name == "payments").unwrap();
    assert_eq!(payments.column("receipt").unwrap().kind, ColumnKind::Binary);
    assert_eq!(payments.column("active").unwrap().kind, ColumnKind::Boolean);

    let first = connector
        .sample_rows(payments, 25, OffsetStrategy::FirstN)
        .await?;
    assert_eq!(first.len(), 25);
    assert!(!first.columns.contains(&"receipt".to_string()));

    // Scatter needs a row estimate above the limit
    let mut estimated = payments.clone();
    estimated.estimated_rows = Some(600);
    let scattered = connector
        .sample_rows(&estimated, 100, OffsetStrategy::Scatter { seed: 7 })
        .await?;
    assert_eq!(scattered.len(), 100);
    let locators: BTreeSet<u64> = scattered.rows.iter().map(|r| r.locator.0).collect();
    assert_eq!(locators.len(), 100);
    // Stride of 6 rows
    let ordered: Vec<u64> = locators.into_iter().collect();
    assert!(ordered.windows(2).all(|w| w[1] - w[0] == 6));

    connector.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker, run with --ignored"]
async fn test_mysql_sessions_are_read_only() -> Result<()> {
    let mysql = Mysql::default().start().await.unwrap();
    let port = mysql.get_host_port_ipv4(3306).await.unwrap();
    let database_url = format!("mysql://root@localhost:{}/test", port);
    wait_for_mysql_ready(&database_url, 60).await?;
    seed(&database_url).await;

    let profile = ConnectionProfile::from_url(&database_url)?;
    let connector = MySqlConnector::connect(&profile).await?;
    let write = sqlx::query("INSERT INTO themes (name) VALUES ('dark')")
        .execute(connector.pool())
        .await;
    assert!(write.is_err());
    connector.close().await;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker, run with --ignored"]
async fn test_mysql_scan_finds_financial_data() -> Result<()> {
    let mysql = Mysql::default().start().await.unwrap();
    let port = mysql.get_host_port_ipv4(3306).await.unwrap();
    let database_url = format!("mysql://root@localhost:{}/test", port);
    wait_for_mysql_ready(&database_url, 60).await?;
    seed(&database_url).await;

    let profile = ConnectionProfile::from_url(&database_url)?;
    for mode in ScanMode::ALL {
        let result = start_scan(&profile, mode).await?;
        assert!(result.tables_scanned.contains(&"test.payments".to_string()));
        assert!(
            result
                .findings
                .iter()
                .any(|f| f.category == Category::Financial && f.column == "card_number")
        );
        assert!(result.findings.iter().any(|f| f.column == "iban"));
        assert!(
            result
                .findings
                .iter()
                .all(|f| !f.redacted_excerpt.contains("4111111111111111"))
        );
    }
    Ok(())
}
