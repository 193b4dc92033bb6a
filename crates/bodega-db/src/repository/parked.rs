//! # Parked Sale Repository
//!
//! Database operations for suspended carts. Parking is pure record-keeping;
//! stock and balances move only when the retrieved cart completes as a sale.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::{from_json, to_json};
use crate::error::{DbError, DbResult};
use bodega_core::ParkedSale;

/// Inserts a parked sale.
pub async fn insert(conn: &mut SqliteConnection, parked: &ParkedSale) -> DbResult<()> {
    debug!(id = %parked.id, "parking sale");

    sqlx::query(
        r#"
        INSERT INTO parked_sales (id, items, customer_id, notes, total_cents, date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&parked.id)
    .bind(to_json(&parked.items)?)
    .bind(&parked.customer_id)
    .bind(&parked.notes)
    .bind(parked.total_cents)
    .bind(parked.date)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches a parked sale by id.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<ParkedSale>> {
    let row = sqlx::query("SELECT * FROM parked_sales WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(|r| map_parked(&r)).transpose()
}

/// Deletes a parked sale.
pub async fn delete(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM parked_sales WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("parked sale", id));
    }

    Ok(())
}

/// Lists all parked sales, newest first.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<ParkedSale>> {
    let rows = sqlx::query("SELECT * FROM parked_sales ORDER BY date DESC")
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_parked).collect()
}

/// Maps a database row to a ParkedSale.
fn map_parked(row: &SqliteRow) -> DbResult<ParkedSale> {
    let items: String = row.try_get("items")?;

    Ok(ParkedSale {
        id: row.try_get("id")?,
        items: from_json(&items)?,
        customer_id: row.try_get("customer_id")?,
        notes: row.try_get("notes")?,
        total_cents: row.try_get("total_cents")?,
        date: row.try_get::<DateTime<Utc>, _>("date")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bodega_core::{SaleItem, Unit};

    #[tokio::test]
    async fn park_fetch_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let parked = ParkedSale {
            id: "park1".to_string(),
            items: vec![SaleItem {
                product_id: "p1".to_string(),
                product_name: "Espresso".to_string(),
                unit: Unit {
                    id: "u1".to_string(),
                    name: "Cup".to_string(),
                    price_cents: 1200,
                    cost_price_cents: 700,
                    factor: 1,
                },
                quantity: 3,
            }],
            customer_id: "c1".to_string(),
            notes: Some("table 4".to_string()),
            total_cents: 3600,
            date: Utc::now(),
        };

        insert(&mut conn, &parked).await.unwrap();
        let loaded = fetch(&mut conn, "park1").await.unwrap().unwrap();
        assert_eq!(loaded.items[0].quantity, 3);

        delete(&mut conn, "park1").await.unwrap();
        assert!(fetch(&mut conn, "park1").await.unwrap().is_none());
    }
}
