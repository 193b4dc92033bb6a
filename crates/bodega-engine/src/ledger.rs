//! # Balance Ledger
//!
//! Debit/credit primitives over customer and supplier running balances.
//!
//! Sign conventions:
//! ```text
//! customer.balance > 0   customer owes the store
//! supplier.balance > 0   store owes the supplier
//!
//! debit   increases the owed amount
//! credit  decreases it
//! ```
//!
//! Customer operations are no-ops for customers that don't track a balance
//! (the walk-in cash customer). The ledger keeps no transaction log of its
//! own — sale, purchase and payment records are the audit trail.

use sqlx::SqliteConnection;
use tracing::debug;

use bodega_core::validation::validate_positive_cents;
use bodega_core::{Customer, Money};
use bodega_db::repository::party;

use crate::error::EngineResult;

/// Balance debit/credit primitives. Always called inside the transaction of
/// the operation that justifies the balance change.
pub struct BalanceLedger;

impl BalanceLedger {
    /// Increases what a customer owes. No-op for balance-less customers.
    pub async fn debit_customer(
        conn: &mut SqliteConnection,
        customer: &Customer,
        amount: Money,
    ) -> EngineResult<()> {
        validate_positive_cents("debit amount", amount.cents())?;

        if !customer.tracks_balance {
            debug!(customer = %customer.id, "customer does not track a balance, skipping debit");
            return Ok(());
        }

        party::adjust_customer_balance(conn, &customer.id, amount.cents()).await?;
        Ok(())
    }

    /// Decreases what a customer owes. No-op for balance-less customers.
    pub async fn credit_customer(
        conn: &mut SqliteConnection,
        customer: &Customer,
        amount: Money,
    ) -> EngineResult<()> {
        validate_positive_cents("credit amount", amount.cents())?;

        if !customer.tracks_balance {
            debug!(customer = %customer.id, "customer does not track a balance, skipping credit");
            return Ok(());
        }

        party::adjust_customer_balance(conn, &customer.id, -amount.cents()).await?;
        Ok(())
    }

    /// Increases what the store owes a supplier.
    pub async fn debit_supplier(
        conn: &mut SqliteConnection,
        supplier_id: &str,
        amount: Money,
    ) -> EngineResult<()> {
        validate_positive_cents("debit amount", amount.cents())?;
        party::adjust_supplier_balance(conn, supplier_id, amount.cents()).await?;
        Ok(())
    }

    /// Decreases what the store owes a supplier.
    pub async fn credit_supplier(
        conn: &mut SqliteConnection,
        supplier_id: &str,
        amount: Money,
    ) -> EngineResult<()> {
        validate_positive_cents("credit amount", amount.cents())?;
        party::adjust_supplier_balance(conn, supplier_id, -amount.cents()).await?;
        Ok(())
    }

    /// Applies a signed balance movement: positive debits, negative
    /// credits, zero does nothing.
    pub async fn apply_customer_delta(
        conn: &mut SqliteConnection,
        customer: &Customer,
        delta: Money,
    ) -> EngineResult<()> {
        if delta.is_positive() {
            Self::debit_customer(conn, customer, delta).await
        } else if delta.is_negative() {
            Self::credit_customer(conn, customer, delta.abs()).await
        } else {
            Ok(())
        }
    }

    /// Applies a signed supplier balance movement.
    pub async fn apply_supplier_delta(
        conn: &mut SqliteConnection,
        supplier_id: &str,
        delta: Money,
    ) -> EngineResult<()> {
        if delta.is_positive() {
            Self::debit_supplier(conn, supplier_id, delta).await
        } else if delta.is_negative() {
            Self::credit_supplier(conn, supplier_id, delta.abs()).await
        } else {
            Ok(())
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bodega_db::{Database, DbConfig};
    use chrono::Utc;

    fn customer(id: &str, tracks_balance: bool) -> Customer {
        Customer {
            id: id.to_string(),
            name: id.to_string(),
            phone: None,
            email: None,
            address: None,
            balance_cents: 0,
            tracks_balance,
            version: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn debit_and_credit_move_the_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let walletful = customer("c2", true);
        party::insert_customer(&mut conn, &walletful).await.unwrap();

        BalanceLedger::debit_customer(&mut conn, &walletful, Money::from_cents(8000))
            .await
            .unwrap();
        BalanceLedger::credit_customer(&mut conn, &walletful, Money::from_cents(2000))
            .await
            .unwrap();

        let loaded = party::get_customer(&mut conn, "c2").await.unwrap();
        assert_eq!(loaded.balance_cents, 6000);
    }

    #[tokio::test]
    async fn walletless_customer_is_exempt() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let walkin = customer("c1", false);
        party::insert_customer(&mut conn, &walkin).await.unwrap();

        BalanceLedger::debit_customer(&mut conn, &walkin, Money::from_cents(5000))
            .await
            .unwrap();

        let loaded = party::get_customer(&mut conn, "c1").await.unwrap();
        assert_eq!(loaded.balance_cents, 0);
        assert_eq!(loaded.version, 0);
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.acquire().await.unwrap();

        let walletful = customer("c2", true);
        party::insert_customer(&mut conn, &walletful).await.unwrap();

        assert!(
            BalanceLedger::debit_customer(&mut conn, &walletful, Money::zero())
                .await
                .is_err()
        );
        assert!(
            BalanceLedger::credit_supplier(&mut conn, "s1", Money::from_cents(-5))
                .await
                .is_err()
        );
    }
}
