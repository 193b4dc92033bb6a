//! # Sale Repository
//!
//! Database operations for sales. Line items and payments are snapshot
//! documents in JSON columns; a sale row is the immutable record of what was
//! sold at what price — edits replace the line list and totals but never
//! reprice from the current catalog.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::{from_json, to_json};
use crate::error::{DbError, DbResult};
use bodega_core::Sale;

/// Inserts a sale record.
pub async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, total = sale.total_cents, "inserting sale");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, items, subtotal_cents, discount_cents, tax_cents,
            tax_rate_bps, total_cents, total_cost_cents, payments,
            customer_id, customer_name, date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&sale.id)
    .bind(to_json(&sale.items)?)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.tax_cents)
    .bind(sale.tax_rate_bps as i64)
    .bind(sale.total_cents)
    .bind(sale.total_cost_cents)
    .bind(to_json(&sale.payments)?)
    .bind(&sale.customer_id)
    .bind(&sale.customer_name)
    .bind(sale.date)
    .execute(conn)
    .await?;

    Ok(())
}

/// Replaces a sale's line items and recomputed totals (sale edit).
pub async fn update(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    debug!(id = %sale.id, total = sale.total_cents, "updating sale");

    let result = sqlx::query(
        r#"
        UPDATE sales SET
            items = ?2,
            subtotal_cents = ?3,
            tax_cents = ?4,
            total_cents = ?5,
            total_cost_cents = ?6,
            payments = ?7
        WHERE id = ?1
        "#,
    )
    .bind(&sale.id)
    .bind(to_json(&sale.items)?)
    .bind(sale.subtotal_cents)
    .bind(sale.tax_cents)
    .bind(sale.total_cents)
    .bind(sale.total_cost_cents)
    .bind(to_json(&sale.payments)?)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("sale", &sale.id));
    }

    Ok(())
}

/// Fetches a sale by id.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let row = sqlx::query("SELECT * FROM sales WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(|r| map_sale(&r)).transpose()
}

/// Fetches a sale by id, failing with NotFound when absent.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Sale> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("sale", id))
}

/// Lists all sales, newest first.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Sale>> {
    let rows = sqlx::query("SELECT * FROM sales ORDER BY date DESC")
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_sale).collect()
}

/// Lists sales whose date falls within `[from, to]`, used by session
/// reconciliation.
pub async fn list_between(
    conn: &mut SqliteConnection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DbResult<Vec<Sale>> {
    let rows = sqlx::query("SELECT * FROM sales WHERE date >= ?1 AND date <= ?2 ORDER BY date")
        .bind(from)
        .bind(to)
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_sale).collect()
}

/// Maps a database row to a Sale.
fn map_sale(row: &SqliteRow) -> DbResult<Sale> {
    let items: String = row.try_get("items")?;
    let payments: String = row.try_get("payments")?;

    Ok(Sale {
        id: row.try_get("id")?,
        items: from_json(&items)?,
        subtotal_cents: row.try_get("subtotal_cents")?,
        discount_cents: row.try_get("discount_cents")?,
        tax_cents: row.try_get("tax_cents")?,
        tax_rate_bps: row.try_get::<i64, _>("tax_rate_bps")? as u32,
        total_cents: row.try_get("total_cents")?,
        total_cost_cents: row.try_get("total_cost_cents")?,
        payments: from_json(&payments)?,
        customer_id: row.try_get("customer_id")?,
        customer_name: row.try_get("customer_name")?,
        date: row.try_get::<DateTime<Utc>, _>("date")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
