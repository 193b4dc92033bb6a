//! # Purchase Repository
//!
//! Database operations for supplier purchases.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::{from_json, to_json};
use crate::error::{DbError, DbResult};
use bodega_core::{Purchase, PurchasePaymentMethod};

/// Inserts a purchase record.
pub async fn insert(conn: &mut SqliteConnection, purchase: &Purchase) -> DbResult<()> {
    debug!(id = %purchase.id, supplier = %purchase.supplier_id, "inserting purchase");

    sqlx::query(
        r#"
        INSERT INTO purchases (
            id, supplier_id, supplier_name, items, total_cents,
            amount_paid_cents, payment_method, reference, notes, date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&purchase.id)
    .bind(&purchase.supplier_id)
    .bind(&purchase.supplier_name)
    .bind(to_json(&purchase.items)?)
    .bind(purchase.total_cents)
    .bind(purchase.amount_paid_cents)
    .bind(purchase.payment_method.as_str())
    .bind(&purchase.reference)
    .bind(&purchase.notes)
    .bind(purchase.date)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches a purchase by id.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Purchase>> {
    let row = sqlx::query("SELECT * FROM purchases WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(|r| map_purchase(&r)).transpose()
}

/// Fetches a purchase by id, failing with NotFound when absent.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Purchase> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("purchase", id))
}

/// Deletes a purchase record.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM purchases WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("purchase", id));
    }

    Ok(())
}

/// Lists all purchases, newest first.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Purchase>> {
    let rows = sqlx::query("SELECT * FROM purchases ORDER BY date DESC")
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_purchase).collect()
}

/// Maps a database row to a Purchase.
fn map_purchase(row: &SqliteRow) -> DbResult<Purchase> {
    let items: String = row.try_get("items")?;
    let method: String = row.try_get("payment_method")?;

    let payment_method = match method.as_str() {
        "cash" => PurchasePaymentMethod::Cash,
        "deferred" => PurchasePaymentMethod::Deferred,
        other => {
            return Err(DbError::CorruptField(format!(
                "unknown purchase payment method: {other}"
            )))
        }
    };

    Ok(Purchase {
        id: row.try_get("id")?,
        supplier_id: row.try_get("supplier_id")?,
        supplier_name: row.try_get("supplier_name")?,
        items: from_json(&items)?,
        total_cents: row.try_get("total_cents")?,
        amount_paid_cents: row.try_get("amount_paid_cents")?,
        payment_method,
        reference: row.try_get("reference")?,
        notes: row.try_get("notes")?,
        date: row.try_get::<DateTime<Utc>, _>("date")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
