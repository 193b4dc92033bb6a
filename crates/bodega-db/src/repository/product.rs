//! # Product Repository
//!
//! Database operations for products. The `units` and `batches` collections
//! live in JSON columns; the aggregate `stock` column is denormalized for
//! listing and alert queries but is always written together with the batches
//! it summarizes.
//!
//! ## Version Guard
//! [`persist_stock`] is the only stock write path and is guarded by the
//! product's optimistic-concurrency `version`: a concurrent writer since the
//! read makes the guard miss and surfaces [`DbError::Conflict`] instead of
//! silently overwriting.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use super::{from_json, to_json};
use crate::error::{DbError, DbResult};
use bodega_core::{Product, SellingMethod};

/// Inserts a new product.
pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, sku = %product.sku, "inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, sku, category_id, description,
            units, batches, stock, selling_method,
            version, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.sku)
    .bind(&product.category_id)
    .bind(&product.description)
    .bind(to_json(&product.units)?)
    .bind(to_json(&product.batches)?)
    .bind(product.stock)
    .bind(product.selling_method.as_str())
    .bind(product.version)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches a product by id.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let row = sqlx::query("SELECT * FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(|r| map_product(&r)).transpose()
}

/// Fetches a product by id, failing with NotFound when absent.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    fetch(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("product", id))
}

/// Lists all products ordered by name.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
    let rows = sqlx::query("SELECT * FROM products ORDER BY name")
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_product).collect()
}

/// Persists a product's batch state (batches + aggregate stock), bumping the
/// version stamp.
///
/// The guard compares against the version the caller read; a miss means a
/// concurrent writer got there first and the whole operation should roll
/// back with a conflict.
pub async fn persist_stock(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    debug!(id = %product.id, stock = product.stock, "persisting product stock");

    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE products SET
            batches = ?2,
            stock = ?3,
            updated_at = ?4,
            version = version + 1
        WHERE id = ?1 AND version = ?5
        "#,
    )
    .bind(&product.id)
    .bind(to_json(&product.batches)?)
    .bind(product.stock)
    .bind(now)
    .bind(product.version)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::conflict("product", &product.id));
    }

    Ok(())
}

/// Maps a database row to a Product.
fn map_product(row: &SqliteRow) -> DbResult<Product> {
    let selling_method: String = row.try_get("selling_method")?;
    let units: String = row.try_get("units")?;
    let batches: String = row.try_get("batches")?;

    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        sku: row.try_get("sku")?,
        category_id: row.try_get("category_id")?,
        description: row.try_get("description")?,
        units: from_json(&units)?,
        batches: from_json(&batches)?,
        stock: row.try_get("stock")?,
        selling_method: selling_method
            .parse::<SellingMethod>()
            .map_err(DbError::CorruptField)?,
        version: row.try_get("version")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
