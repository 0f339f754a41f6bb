//! SQLite implementation of AlertStorage.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info};

use crate::domain::{ArbitrageAlert, Pair};
use crate::storage::{AlertStorage, StorageError};

/// Alerts falling into the same window of this many seconds share a hash.
const DEDUP_WINDOW_SECS: i64 = 300;

/// SqliteStorage implements AlertStorage using SQLite.
pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

/// SqliteStorageConfig holds SQLite storage configuration.
#[derive(Debug, Clone)]
pub struct SqliteStorageConfig {
    /// Path to the SQLite database file.
    pub path: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
}

impl Default for SqliteStorageConfig {
    fn default() -> Self {
        Self {
            path: "alerts.db".to_string(),
            max_connections: 5,
        }
    }
}

impl SqliteStorageConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl SqliteStorage {
    /// Opens (creating if needed) the database and applies the schema.
    pub async fn new(config: SqliteStorageConfig) -> Result<Self, StorageError> {
        if let Some(parent) = Path::new(&config.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let storage = Self { pool };

        storage.migrate().await?;

        info!(path = %config.path, "SQLite storage initialized");
        Ok(storage)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                unique_hash TEXT NOT NULL UNIQUE,
                pair TEXT NOT NULL,
                exchange_a TEXT NOT NULL,
                price_a TEXT NOT NULL,
                exchange_b TEXT NOT NULL,
                price_b TEXT NOT NULL,
                relative_diff TEXT NOT NULL,
                detected_at TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_alerts_pair ON alerts(pair)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_alerts_detected_at ON alerts(detected_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Generates a unique hash for detecting duplicate alerts.
///
/// An alert is unique based on: pair, both exchanges, diff percent (rounded
/// to 2 decimals), and a 5-minute time window.
fn generate_unique_hash(alert: &ArbitrageAlert) -> String {
    // 0.7234% -> 0.72
    let diff_rounded = alert.diff_percent().round_dp(2).normalize().to_string();

    let ts = alert.detected_at.timestamp();
    let window = ts - ts.rem_euclid(DEDUP_WINDOW_SECS);

    let data = format!(
        "{}|{}|{}|{}|{}",
        alert.pair, alert.exchange_a, alert.exchange_b, diff_rounded, window
    );

    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let hash = hasher.finalize();

    // First 16 bytes are enough
    hex::encode(&hash[..16])
}

#[async_trait]
impl AlertStorage for SqliteStorage {
    async fn save(&self, alert: &ArbitrageAlert) -> Result<bool, StorageError> {
        let unique_hash = generate_unique_hash(alert);

        let result = sqlx::query(
            r#"
            INSERT INTO alerts (
                unique_hash, pair, exchange_a, price_a, exchange_b, price_b,
                relative_diff, detected_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(unique_hash) DO NOTHING
            "#,
        )
        .bind(&unique_hash)
        .bind(alert.pair.to_string())
        .bind(&alert.exchange_a)
        .bind(alert.price_a.to_string())
        .bind(&alert.exchange_b)
        .bind(alert.price_b.to_string())
        .bind(alert.relative_diff.to_string())
        .bind(alert.detected_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let saved = result.rows_affected() > 0;
        if saved {
            debug!(pair = %alert.pair, hash = %unique_hash, "Alert saved");
        } else {
            debug!(pair = %alert.pair, hash = %unique_hash, "Duplicate alert skipped");
        }

        Ok(saved)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ArbitrageAlert>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT pair, exchange_a, price_a, exchange_b, price_b, relative_diff, detected_at
            FROM alerts ORDER BY detected_at DESC, id DESC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(parse_alert_row).collect()
    }

    async fn count(&self) -> Result<i64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM alerts")
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    async fn close(&self) -> Result<(), StorageError> {
        self.pool.close().await;
        Ok(())
    }
}

fn parse_decimal(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Decimal, StorageError> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw)
        .map_err(|e| StorageError::InvalidData(format!("Invalid {}: {}", column, e)))
}

/// Parses an alert from a database row.
fn parse_alert_row(row: &sqlx::sqlite::SqliteRow) -> Result<ArbitrageAlert, StorageError> {
    let pair_str: String = row.try_get("pair")?;
    let pair = Pair::from_str(&pair_str).map_err(|e| StorageError::InvalidData(e.to_string()))?;

    let detected_at_str: String = row.try_get("detected_at")?;
    let detected_at = DateTime::parse_from_rfc3339(&detected_at_str)
        .map_err(|e| StorageError::InvalidData(format!("Invalid detected_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(ArbitrageAlert {
        pair,
        exchange_a: row.try_get("exchange_a")?,
        price_a: parse_decimal(row, "price_a")?,
        exchange_b: row.try_get("exchange_b")?,
        price_b: parse_decimal(row, "price_b")?,
        relative_diff: parse_decimal(row, "relative_diff")?,
        detected_at,
    })
}
