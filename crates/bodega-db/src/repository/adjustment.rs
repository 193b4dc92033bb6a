//! # Adjustment Repository
//!
//! Database operations for manual stock adjustments.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::{from_json, to_json};
use crate::error::{DbError, DbResult};
use bodega_core::{Adjustment, AdjustmentReason};

/// Inserts an adjustment record.
pub async fn insert(conn: &mut SqliteConnection, adjustment: &Adjustment) -> DbResult<()> {
    debug!(id = %adjustment.id, reason = adjustment.reason.as_str(), "inserting adjustment");

    sqlx::query(
        r#"
        INSERT INTO adjustments (id, items, reason, notes, date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&adjustment.id)
    .bind(to_json(&adjustment.items)?)
    .bind(adjustment.reason.as_str())
    .bind(&adjustment.notes)
    .bind(adjustment.date)
    .execute(conn)
    .await?;

    Ok(())
}

/// Lists all adjustments, newest first.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Adjustment>> {
    let rows = sqlx::query("SELECT * FROM adjustments ORDER BY date DESC")
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_adjustment).collect()
}

/// Maps a database row to an Adjustment.
fn map_adjustment(row: &SqliteRow) -> DbResult<Adjustment> {
    let items: String = row.try_get("items")?;
    let reason: String = row.try_get("reason")?;

    Ok(Adjustment {
        id: row.try_get("id")?,
        items: from_json(&items)?,
        reason: reason
            .parse::<AdjustmentReason>()
            .map_err(DbError::CorruptField)?,
        notes: row.try_get("notes")?,
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
    use bodega_core::AdjustmentItem;

    #[tokio::test]
    async fn round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let adjustment = Adjustment {
            id: "adj1".to_string(),
            items: vec![AdjustmentItem {
                product_id: "p1".to_string(),
                product_name: "Espresso".to_string(),
                quantity_change: -3,
                unit_name: "Cup".to_string(),
                unit_factor: 1,
            }],
            reason: AdjustmentReason::Damaged,
            notes: Some("dropped tray".to_string()),
            date: Utc::now(),
        };

        insert(&mut conn, &adjustment).await.unwrap();

        let all = list(&mut conn).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].reason, AdjustmentReason::Damaged);
        assert_eq!(all[0].items[0].base_units(), -3);
    }
}
