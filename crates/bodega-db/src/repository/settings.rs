//! # Settings Repository
//!
//! A small key → JSON value store for store-wide configuration: the tax
//! rate, alert thresholds, store info. Typed accessors fall back to
//! defaults when a key has never been written.

use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::DbResult;
use bodega_core::alerts::AlertConfig;
use bodega_core::{TaxRate, DEFAULT_TAX_RATE_BPS};

/// Settings keys used by the engine.
pub const KEY_TAX_RATE_BPS: &str = "taxRate";
pub const KEY_LOW_STOCK_THRESHOLD: &str = "lowStockThreshold";
pub const KEY_EXPIRY_WINDOW_DAYS: &str = "expiryWindowDays";

/// Reads a raw JSON setting.
pub async fn get(conn: &mut SqliteConnection, key: &str) -> DbResult<Option<serde_json::Value>> {
    let row = sqlx::query("SELECT value FROM settings WHERE key = ?1")
        .bind(key)
        .fetch_optional(conn)
        .await?;

    match row {
        Some(row) => {
            let raw: String = row.try_get("value")?;
            Ok(Some(serde_json::from_str(&raw)?))
        }
        None => Ok(None),
    }
}

/// Writes a JSON setting, replacing any previous value.
pub async fn put(
    conn: &mut SqliteConnection,
    key: &str,
    value: &serde_json::Value,
) -> DbResult<()> {
    debug!(key = %key, "writing setting");

    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?1, ?2)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(key)
    .bind(serde_json::to_string(value)?)
    .execute(conn)
    .await?;

    Ok(())
}

/// The store's configured tax rate, defaulting to
/// [`DEFAULT_TAX_RATE_BPS`].
pub async fn tax_rate(conn: &mut SqliteConnection) -> DbResult<TaxRate> {
    let bps = match get(conn, KEY_TAX_RATE_BPS).await? {
        Some(value) => value.as_u64().unwrap_or(DEFAULT_TAX_RATE_BPS as u64) as u32,
        None => DEFAULT_TAX_RATE_BPS,
    };
    Ok(TaxRate::from_bps(bps))
}

/// Alert thresholds, with [`AlertConfig::default`] filling the gaps.
pub async fn alert_config(conn: &mut SqliteConnection) -> DbResult<AlertConfig> {
    let mut config = AlertConfig::default();

    if let Some(value) = get(&mut *conn, KEY_LOW_STOCK_THRESHOLD).await? {
        if let Some(threshold) = value.as_i64() {
            config.low_stock_threshold = threshold;
        }
    }
    if let Some(value) = get(&mut *conn, KEY_EXPIRY_WINDOW_DAYS).await? {
        if let Some(days) = value.as_i64() {
            config.expiry_window_days = days;
        }
    }

    Ok(config)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn defaults_when_unset() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        assert_eq!(tax_rate(&mut conn).await.unwrap().bps(), DEFAULT_TAX_RATE_BPS);
        assert_eq!(alert_config(&mut conn).await.unwrap(), AlertConfig::default());
    }

    #[tokio::test]
    async fn put_overrides_and_replaces() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        put(&mut conn, KEY_TAX_RATE_BPS, &serde_json::json!(825)).await.unwrap();
        assert_eq!(tax_rate(&mut conn).await.unwrap().bps(), 825);

        put(&mut conn, KEY_TAX_RATE_BPS, &serde_json::json!(1000)).await.unwrap();
        assert_eq!(tax_rate(&mut conn).await.unwrap().bps(), 1000);

        put(&mut conn, KEY_LOW_STOCK_THRESHOLD, &serde_json::json!(5)).await.unwrap();
        put(&mut conn, KEY_EXPIRY_WINDOW_DAYS, &serde_json::json!(7)).await.unwrap();
        let config = alert_config(&mut conn).await.unwrap();
        assert_eq!(config.low_stock_threshold, 5);
        assert_eq!(config.expiry_window_days, 7);
    }
}
