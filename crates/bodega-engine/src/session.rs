//! # Session Reconciler
//!
//! Cash-drawer session lifecycle and reconciliation.
//!
//! ## Lifecycle
//! ```text
//! none ──start(opening_float)──► active ──end(closing_float)──► closed
//!
//! start  fails while another session is active (one active session,
//!        store-wide)
//! end    fails with no active session; closed is terminal
//! ```
//!
//! ## Reconciliation
//! Ending a session gathers the sales dated within the session window and
//! the expenses stamped with the session id, then:
//! ```text
//! expected_cash = opening_float + total_cash_sales − total_expenses
//! difference    = closing_float − expected_cash      (+ over, − short)
//! ```
//! Card and deferred sales never touch the drawer, so they are reported but
//! excluded from expected cash.

use chrono::Utc;
use tracing::{info, instrument};

use bodega_core::validation::{
    validate_id, validate_non_negative_cents, validate_positive_cents, validate_reason,
};
use bodega_core::{Expense, Money, PaymentMethod, SessionStatus, WorkSession};
use bodega_db::repository;
use bodega_db::Database;
use bodega_sync::{ChangeBus, Table};

use crate::engine::TransactionEngine;
use crate::error::{EngineError, EngineResult};

/// Tracks the cash-drawer session lifecycle and computes the closing
/// reconciliation. The only writer of work-session and expense state.
#[derive(Debug, Clone)]
pub struct SessionReconciler {
    db: Database,
    bus: ChangeBus,
}

impl SessionReconciler {
    /// Creates a reconciler over a database and a change bus.
    pub fn new(db: Database, bus: ChangeBus) -> Self {
        SessionReconciler { db, bus }
    }

    /// The currently active session, if any.
    pub async fn active_session(&self) -> EngineResult<Option<WorkSession>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::session::fetch_active_session(&mut conn).await?)
    }

    /// Session history, newest first.
    pub async fn list_sessions(&self) -> EngineResult<Vec<WorkSession>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::session::list_sessions(&mut conn).await?)
    }

    /// Expenses recorded against one session.
    pub async fn list_expenses(&self, session_id: &str) -> EngineResult<Vec<Expense>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::session::list_expenses_for_session(&mut conn, session_id).await?)
    }

    /// Opens a session with a counted opening float.
    #[instrument(skip(self), fields(user = %user_name))]
    pub async fn start_session(
        &self,
        user_id: &str,
        user_name: &str,
        opening_float_cents: i64,
    ) -> EngineResult<WorkSession> {
        validate_id("user", user_id)?;
        validate_non_negative_cents("opening float", opening_float_cents)?;

        let mut tx = self.db.begin().await?;

        if let Some(active) = repository::session::fetch_active_session(&mut tx).await? {
            return Err(EngineError::State(format!(
                "a session is already active (started by {})",
                active.user_name
            )));
        }

        let session = WorkSession {
            id: TransactionEngine::new_id(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            start_time: Utc::now(),
            end_time: None,
            opening_float_cents,
            status: SessionStatus::Active,
            closing_float_cents: None,
            total_cash_cents: None,
            total_card_cents: None,
            total_deferred_cents: None,
            total_expenses_cents: None,
            expected_cash_cents: None,
            difference_cents: None,
        };
        repository::session::insert_session(&mut tx, &session).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.bus.notify(Table::WorkSessions);

        info!(session = %session.id, opening_float = opening_float_cents, "session started");
        Ok(session)
    }

    /// Records a cash expense against the active session.
    #[instrument(skip(self, reason))]
    pub async fn add_expense(&self, amount_cents: i64, reason: &str) -> EngineResult<Expense> {
        validate_positive_cents("expense amount", amount_cents)?;
        validate_reason(reason)?;

        let mut tx = self.db.begin().await?;

        let active = repository::session::fetch_active_session(&mut tx)
            .await?
            .ok_or_else(|| EngineError::State("no active session".to_string()))?;

        let expense = Expense {
            id: TransactionEngine::new_id(),
            session_id: active.id.clone(),
            amount_cents,
            reason: reason.trim().to_string(),
            date: Utc::now(),
        };
        repository::session::insert_expense(&mut tx, &expense).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.bus.notify(Table::Expenses);

        info!(expense = %expense.id, session = %active.id, amount = amount_cents, "expense recorded");
        Ok(expense)
    }

    /// Closes the active session against a counted closing float and stamps
    /// the reconciliation snapshot.
    ///
    /// With no active session this is rejected with a `State` error and no
    /// session or expense record is touched.
    #[instrument(skip(self))]
    pub async fn end_session(&self, closing_float_cents: i64) -> EngineResult<WorkSession> {
        validate_non_negative_cents("closing float", closing_float_cents)?;

        let mut tx = self.db.begin().await?;

        let active = repository::session::fetch_active_session(&mut tx)
            .await?
            .ok_or_else(|| EngineError::State("no active session to end".to_string()))?;

        let now = Utc::now();
        let sales = repository::sale::list_between(&mut tx, active.start_time, now).await?;
        let expenses =
            repository::session::list_expenses_for_session(&mut tx, &active.id).await?;

        let total_cash: Money = sales.iter().map(|s| s.payment_total(PaymentMethod::Cash)).sum();
        let total_card: Money = sales.iter().map(|s| s.payment_total(PaymentMethod::Card)).sum();
        let total_deferred: Money = sales
            .iter()
            .map(|s| s.payment_total(PaymentMethod::Deferred))
            .sum();
        let total_expenses: Money = expenses
            .iter()
            .map(|e| Money::from_cents(e.amount_cents))
            .sum();

        let expected_cash =
            Money::from_cents(active.opening_float_cents) + total_cash - total_expenses;
        let difference = Money::from_cents(closing_float_cents) - expected_cash;

        let closed = WorkSession {
            end_time: Some(now),
            status: SessionStatus::Closed,
            closing_float_cents: Some(closing_float_cents),
            total_cash_cents: Some(total_cash.cents()),
            total_card_cents: Some(total_card.cents()),
            total_deferred_cents: Some(total_deferred.cents()),
            total_expenses_cents: Some(total_expenses.cents()),
            expected_cash_cents: Some(expected_cash.cents()),
            difference_cents: Some(difference.cents()),
            ..active
        };
        repository::session::close_session(&mut tx, &closed).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.bus.notify(Table::WorkSessions);

        info!(
            session = %closed.id,
            expected = expected_cash.cents(),
            difference = difference.cents(),
            "session closed"
        );
        Ok(closed)
    }
}
