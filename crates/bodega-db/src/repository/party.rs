//! # Party Repository
//!
//! Database operations for customers, suppliers and their settlement
//! payments.
//!
//! ## Balance Writes Are Deltas
//! Balances are updated with `balance_cents = balance_cents + ?`, never an
//! absolute value computed in application code. Concurrent delta writes
//! compose; absolute writes from two devices would silently drop one side.
//! The version stamp still bumps on every write so readers can detect
//! change.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bodega_core::{Customer, CustomerPayment, Supplier, SupplierPayment};

// =============================================================================
// Customers
// =============================================================================

/// Inserts a customer.
pub async fn insert_customer(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    debug!(id = %customer.id, name = %customer.name, "inserting customer");

    sqlx::query(
        r#"
        INSERT INTO customers (
            id, name, phone, email, address,
            balance_cents, tracks_balance, version, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.phone)
    .bind(&customer.email)
    .bind(&customer.address)
    .bind(customer.balance_cents)
    .bind(customer.tracks_balance)
    .bind(customer.version)
    .bind(customer.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches a customer by id.
pub async fn fetch_customer(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let row = sqlx::query("SELECT * FROM customers WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(|r| map_customer(&r)).transpose()
}

/// Fetches a customer by id, failing with NotFound when absent.
pub async fn get_customer(conn: &mut SqliteConnection, id: &str) -> DbResult<Customer> {
    fetch_customer(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("customer", id))
}

/// Lists all customers ordered by name.
pub async fn list_customers(conn: &mut SqliteConnection) -> DbResult<Vec<Customer>> {
    let rows = sqlx::query("SELECT * FROM customers ORDER BY name")
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_customer).collect()
}

/// Applies a signed delta to a customer balance.
pub async fn adjust_customer_balance(
    conn: &mut SqliteConnection,
    id: &str,
    delta_cents: i64,
) -> DbResult<()> {
    debug!(id = %id, delta = delta_cents, "adjusting customer balance");

    let result = sqlx::query(
        r#"
        UPDATE customers SET
            balance_cents = balance_cents + ?2,
            version = version + 1
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(delta_cents)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("customer", id));
    }

    Ok(())
}

// =============================================================================
// Suppliers
// =============================================================================

/// Inserts a supplier.
pub async fn insert_supplier(conn: &mut SqliteConnection, supplier: &Supplier) -> DbResult<()> {
    debug!(id = %supplier.id, company = %supplier.company, "inserting supplier");

    sqlx::query(
        r#"
        INSERT INTO suppliers (
            id, name, company, phone, email,
            balance_cents, version, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&supplier.id)
    .bind(&supplier.name)
    .bind(&supplier.company)
    .bind(&supplier.phone)
    .bind(&supplier.email)
    .bind(supplier.balance_cents)
    .bind(supplier.version)
    .bind(supplier.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches a supplier by id.
pub async fn fetch_supplier(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Supplier>> {
    let row = sqlx::query("SELECT * FROM suppliers WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(|r| map_supplier(&r)).transpose()
}

/// Fetches a supplier by id, failing with NotFound when absent.
pub async fn get_supplier(conn: &mut SqliteConnection, id: &str) -> DbResult<Supplier> {
    fetch_supplier(conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("supplier", id))
}

/// Lists all suppliers ordered by name.
pub async fn list_suppliers(conn: &mut SqliteConnection) -> DbResult<Vec<Supplier>> {
    let rows = sqlx::query("SELECT * FROM suppliers ORDER BY name")
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_supplier).collect()
}

/// Applies a signed delta to a supplier balance.
pub async fn adjust_supplier_balance(
    conn: &mut SqliteConnection,
    id: &str,
    delta_cents: i64,
) -> DbResult<()> {
    debug!(id = %id, delta = delta_cents, "adjusting supplier balance");

    let result = sqlx::query(
        r#"
        UPDATE suppliers SET
            balance_cents = balance_cents + ?2,
            version = version + 1
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(delta_cents)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("supplier", id));
    }

    Ok(())
}

// =============================================================================
// Settlement Payments
// =============================================================================

/// Inserts a customer settlement payment record.
pub async fn insert_customer_payment(
    conn: &mut SqliteConnection,
    payment: &CustomerPayment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO customer_payments (id, customer_id, amount_cents, notes, date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.customer_id)
    .bind(payment.amount_cents)
    .bind(&payment.notes)
    .bind(payment.date)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts a supplier settlement payment record.
pub async fn insert_supplier_payment(
    conn: &mut SqliteConnection,
    payment: &SupplierPayment,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO supplier_payments (id, supplier_id, amount_cents, notes, date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.supplier_id)
    .bind(payment.amount_cents)
    .bind(&payment.notes)
    .bind(payment.date)
    .execute(conn)
    .await?;

    Ok(())
}

/// Lists settlement payments for one customer, newest first.
pub async fn list_customer_payments(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<Vec<CustomerPayment>> {
    let rows = sqlx::query(
        "SELECT * FROM customer_payments WHERE customer_id = ?1 ORDER BY date DESC",
    )
    .bind(customer_id)
    .fetch_all(conn)
    .await?;

    rows.iter().map(map_customer_payment).collect()
}

/// Lists settlement payments for one supplier, newest first.
pub async fn list_supplier_payments(
    conn: &mut SqliteConnection,
    supplier_id: &str,
) -> DbResult<Vec<SupplierPayment>> {
    let rows = sqlx::query(
        "SELECT * FROM supplier_payments WHERE supplier_id = ?1 ORDER BY date DESC",
    )
    .bind(supplier_id)
    .fetch_all(conn)
    .await?;

    rows.iter().map(map_supplier_payment).collect()
}

// =============================================================================
// Row Mapping
// =============================================================================

fn map_customer(row: &SqliteRow) -> DbResult<Customer> {
    Ok(Customer {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        balance_cents: row.try_get("balance_cents")?,
        tracks_balance: row.try_get("tracks_balance")?,
        version: row.try_get("version")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn map_supplier(row: &SqliteRow) -> DbResult<Supplier> {
    Ok(Supplier {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        company: row.try_get("company")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        balance_cents: row.try_get("balance_cents")?,
        version: row.try_get("version")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn map_customer_payment(row: &SqliteRow) -> DbResult<CustomerPayment> {
    Ok(CustomerPayment {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        amount_cents: row.try_get("amount_cents")?,
        notes: row.try_get("notes")?,
        date: row.try_get::<DateTime<Utc>, _>("date")?,
    })
}

fn map_supplier_payment(row: &SqliteRow) -> DbResult<SupplierPayment> {
    Ok(SupplierPayment {
        id: row.try_get("id")?,
        supplier_id: row.try_get("supplier_id")?,
        amount_cents: row.try_get("amount_cents")?,
        notes: row.try_get("notes")?,
        date: row.try_get::<DateTime<Utc>, _>("date")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
