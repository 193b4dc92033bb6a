//! # Session Repository
//!
//! Database operations for work sessions and expenses.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bodega_core::{Expense, SessionStatus, WorkSession};

// =============================================================================
// Work Sessions
// =============================================================================

/// Inserts a work session.
pub async fn insert_session(conn: &mut SqliteConnection, session: &WorkSession) -> DbResult<()> {
    debug!(id = %session.id, user = %session.user_name, "inserting work session");

    sqlx::query(
        r#"
        INSERT INTO work_sessions (
            id, user_id, user_name, start_time, end_time,
            opening_float_cents, status,
            closing_float_cents, total_cash_cents, total_card_cents,
            total_deferred_cents, total_expenses_cents,
            expected_cash_cents, difference_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.user_name)
    .bind(session.start_time)
    .bind(session.end_time)
    .bind(session.opening_float_cents)
    .bind(session.status.as_str())
    .bind(session.closing_float_cents)
    .bind(session.total_cash_cents)
    .bind(session.total_card_cents)
    .bind(session.total_deferred_cents)
    .bind(session.total_expenses_cents)
    .bind(session.expected_cash_cents)
    .bind(session.difference_cents)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches the single active session, if any.
pub async fn fetch_active_session(conn: &mut SqliteConnection) -> DbResult<Option<WorkSession>> {
    let row = sqlx::query("SELECT * FROM work_sessions WHERE status = 'active' LIMIT 1")
        .fetch_optional(conn)
        .await?;

    row.map(|r| map_session(&r)).transpose()
}

/// Fetches a session by id, failing with NotFound when absent.
pub async fn get_session(conn: &mut SqliteConnection, id: &str) -> DbResult<WorkSession> {
    let row = sqlx::query("SELECT * FROM work_sessions WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(|r| map_session(&r))
        .transpose()?
        .ok_or_else(|| DbError::not_found("work session", id))
}

/// Writes a session's closing snapshot and flips it to closed.
///
/// Guarded on `status = 'active'`: a session can only close once.
pub async fn close_session(conn: &mut SqliteConnection, session: &WorkSession) -> DbResult<()> {
    debug!(id = %session.id, "closing work session");

    let result = sqlx::query(
        r#"
        UPDATE work_sessions SET
            end_time = ?2,
            status = 'closed',
            closing_float_cents = ?3,
            total_cash_cents = ?4,
            total_card_cents = ?5,
            total_deferred_cents = ?6,
            total_expenses_cents = ?7,
            expected_cash_cents = ?8,
            difference_cents = ?9
        WHERE id = ?1 AND status = 'active'
        "#,
    )
    .bind(&session.id)
    .bind(session.end_time)
    .bind(session.closing_float_cents)
    .bind(session.total_cash_cents)
    .bind(session.total_card_cents)
    .bind(session.total_deferred_cents)
    .bind(session.total_expenses_cents)
    .bind(session.expected_cash_cents)
    .bind(session.difference_cents)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("active work session", &session.id));
    }

    Ok(())
}

/// Lists all sessions, newest first.
pub async fn list_sessions(conn: &mut SqliteConnection) -> DbResult<Vec<WorkSession>> {
    let rows = sqlx::query("SELECT * FROM work_sessions ORDER BY start_time DESC")
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_session).collect()
}

// =============================================================================
// Expenses
// =============================================================================

/// Inserts an expense record.
pub async fn insert_expense(conn: &mut SqliteConnection, expense: &Expense) -> DbResult<()> {
    debug!(id = %expense.id, session = %expense.session_id, "inserting expense");

    sqlx::query(
        r#"
        INSERT INTO expenses (id, session_id, amount_cents, reason, date)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&expense.id)
    .bind(&expense.session_id)
    .bind(expense.amount_cents)
    .bind(&expense.reason)
    .bind(expense.date)
    .execute(conn)
    .await?;

    Ok(())
}

/// Lists expenses recorded against one session.
pub async fn list_expenses_for_session(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> DbResult<Vec<Expense>> {
    let rows = sqlx::query("SELECT * FROM expenses WHERE session_id = ?1 ORDER BY date")
        .bind(session_id)
        .fetch_all(conn)
        .await?;

    rows.iter().map(map_expense).collect()
}

// =============================================================================
// Row Mapping
// =============================================================================

fn map_session(row: &SqliteRow) -> DbResult<WorkSession> {
    let status: String = row.try_get("status")?;

    Ok(WorkSession {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        user_name: row.try_get("user_name")?,
        start_time: row.try_get::<DateTime<Utc>, _>("start_time")?,
        end_time: row.try_get::<Option<DateTime<Utc>>, _>("end_time")?,
        opening_float_cents: row.try_get("opening_float_cents")?,
        status: status
            .parse::<SessionStatus>()
            .map_err(DbError::CorruptField)?,
        closing_float_cents: row.try_get("closing_float_cents")?,
        total_cash_cents: row.try_get("total_cash_cents")?,
        total_card_cents: row.try_get("total_card_cents")?,
        total_deferred_cents: row.try_get("total_deferred_cents")?,
        total_expenses_cents: row.try_get("total_expenses_cents")?,
        expected_cash_cents: row.try_get("expected_cash_cents")?,
        difference_cents: row.try_get("difference_cents")?,
    })
}

fn map_expense(row: &SqliteRow) -> DbResult<Expense> {
    Ok(Expense {
        id: row.try_get("id")?,
        session_id: row.try_get("session_id")?,
        amount_cents: row.try_get("amount_cents")?,
        reason: row.try_get("reason")?,
        date: row.try_get::<DateTime<Utc>, _>("date")?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
