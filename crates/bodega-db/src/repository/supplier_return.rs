//! # Supplier Return Repository
//!
//! Database operations for returns of stock to suppliers.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::{from_json, to_json};
use crate::error::{DbError, DbResult};
use bodega_core::SupplierReturn;

/// Inserts a supplier return record.
pub async fn insert(conn: &mut SqliteConnection, sreturn: &SupplierReturn) -> DbResult<()> {
    debug!(id = %sreturn.id, supplier = %sreturn.supplier_id, "inserting supplier return");

    sqlx::query(
        r#"
        INSERT INTO supplier_returns (
            id, supplier_id, supplier_name, items, total_cents,
            purchase_id, notes, date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&sreturn.id)
    .bind(&sreturn.supplier_id)
    .bind(&sreturn.supplier_name)
    .bind(to_json(&sreturn.items)?)
    .bind(sreturn.total_cents)
    .bind(&sreturn.purchase_id)
    .bind(&sreturn.notes)
    .bind(sreturn.date)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches a supplier return by id.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<SupplierReturn>> {
    let row = sqlx::query("SELECT * FROM supplier_returns WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(|r| map_return(&r)).transpose()
}

/// Fetches a supplier return by id, failing with NotFound when absent.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<SupplierReturn> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("supplier return", id))
}

/// Deletes a supplier return record.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM supplier_returns WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("supplier return", id));
    }

    Ok(())
}

/// Lists all supplier returns, newest first.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<SupplierReturn>> {
    let rows = sqlx::query("SELECT * FROM supplier_returns ORDER BY date DESC")
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_return).collect()
}

/// Maps a database row to a SupplierReturn.
fn map_return(row: &SqliteRow) -> DbResult<SupplierReturn> {
    let items: String = row.try_get("items")?;

    Ok(SupplierReturn {
        id: row.try_get("id")?,
        supplier_id: row.try_get("supplier_id")?,
        supplier_name: row.try_get("supplier_name")?,
        items: from_json(&items)?,
        total_cents: row.try_get("total_cents")?,
        purchase_id: row.try_get("purchase_id")?,
        notes: row.try_get("notes")?,
        date: row.try_get::<DateTime<Utc>, _>("date")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
