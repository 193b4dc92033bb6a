//! # Settlement Payment Operations
//!
//! Recording money received from a customer against their balance, and
//! money paid to a supplier against what the store owes. The payment record
//! and the balance credit land in one transaction; the records are the
//! ledger's audit trail.

use chrono::Utc;
use tracing::{info, instrument};

use bodega_core::validation::{validate_id, validate_positive_cents};
use bodega_core::{CustomerPayment, Money, SupplierPayment};
use bodega_db::repository;
use bodega_sync::Table;

use crate::engine::TransactionEngine;
use crate::error::{EngineError, EngineResult};
use crate::ledger::BalanceLedger;

impl TransactionEngine {
    /// Records a payment received from a customer, reducing what they owe.
    ///
    /// Rejected for customers that don't track a balance — there is nothing
    /// to settle against.
    #[instrument(skip(self))]
    pub async fn record_customer_payment(
        &self,
        customer_id: &str,
        amount_cents: i64,
        notes: Option<String>,
    ) -> EngineResult<CustomerPayment> {
        validate_id("customer", customer_id)?;
        validate_positive_cents("payment amount", amount_cents)?;

        let mut tx = self.db.begin().await?;

        let customer = repository::party::get_customer(&mut tx, customer_id).await?;
        if !customer.tracks_balance {
            return Err(EngineError::State(format!(
                "customer {} does not track a balance",
                customer.id
            )));
        }

        let payment = CustomerPayment {
            id: Self::new_id(),
            customer_id: customer.id.clone(),
            amount_cents,
            notes,
            date: Utc::now(),
        };
        repository::party::insert_customer_payment(&mut tx, &payment).await?;
        BalanceLedger::credit_customer(&mut tx, &customer, Money::from_cents(amount_cents)).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::CustomerPayments);
        self.notify(Table::Customers);

        info!(payment = %payment.id, customer = %customer.id, amount = amount_cents, "customer payment recorded");
        Ok(payment)
    }

    /// Records a payment made to a supplier, reducing what the store owes.
    #[instrument(skip(self))]
    pub async fn record_supplier_payment(
        &self,
        supplier_id: &str,
        amount_cents: i64,
        notes: Option<String>,
    ) -> EngineResult<SupplierPayment> {
        validate_id("supplier", supplier_id)?;
        validate_positive_cents("payment amount", amount_cents)?;

        let mut tx = self.db.begin().await?;

        let supplier = repository::party::get_supplier(&mut tx, supplier_id).await?;

        let payment = SupplierPayment {
            id: Self::new_id(),
            supplier_id: supplier.id.clone(),
            amount_cents,
            notes,
            date: Utc::now(),
        };
        repository::party::insert_supplier_payment(&mut tx, &payment).await?;
        BalanceLedger::credit_supplier(&mut tx, &supplier.id, Money::from_cents(amount_cents))
            .await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::SupplierPayments);
        self.notify(Table::Suppliers);

        info!(payment = %payment.id, supplier = %supplier.id, amount = amount_cents, "supplier payment recorded");
        Ok(payment)
    }
}
