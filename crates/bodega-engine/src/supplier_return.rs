//! # Supplier Return Operations
//!
//! Returning stock to a supplier and reversing such a return.
//!
//! Returns consume batches LIFO — the stock going back is the stock most
//! recently received — where sales consume FEFO. The asymmetry is carried
//! from the business as it operates; the policy is an explicit argument, so
//! unifying it later is a one-line change per call site.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use bodega_core::validation::{
    validate_id, validate_line_count, validate_non_negative_cents, validate_quantity,
    validate_unit_factor,
};
use bodega_core::{ConsumptionPolicy, Money, Product, SupplierReturn, SupplierReturnItem};
use bodega_db::repository;
use bodega_sync::Table;

use crate::engine::TransactionEngine;
use crate::error::EngineResult;
use crate::ledger::BalanceLedger;

// =============================================================================
// Draft
// =============================================================================

/// Input for recording a supplier return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierReturnDraft {
    pub supplier_id: String,
    pub items: Vec<SupplierReturnItem>,
    pub total_cents: i64,
    /// Original purchase, when the return is traceable to one.
    pub purchase_id: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Operations
// =============================================================================

impl TransactionEngine {
    /// Records a supplier return: stock out LIFO, supplier balance reduced
    /// by the return total (a credit note against what the store owes).
    #[instrument(skip(self, draft), fields(supplier = %draft.supplier_id))]
    pub async fn record_supplier_return(
        &self,
        draft: SupplierReturnDraft,
    ) -> EngineResult<SupplierReturn> {
        validate_line_count("return items", draft.items.len())?;
        validate_id("supplier", &draft.supplier_id)?;
        validate_non_negative_cents("total", draft.total_cents)?;
        for item in &draft.items {
            validate_quantity(item.quantity)?;
            validate_unit_factor(item.unit_factor)?;
        }

        let mut tx = self.db.begin().await?;

        let supplier = repository::party::get_supplier(&mut tx, &draft.supplier_id).await?;

        let mut staged: HashMap<String, Product> = HashMap::new();
        for item in &draft.items {
            if !staged.contains_key(&item.product_id) {
                let product = repository::product::get(&mut tx, &item.product_id).await?;
                staged.insert(item.product_id.clone(), product);
            }
        }
        for item in &draft.items {
            if let Some(product) = staged.get_mut(&item.product_id) {
                product.allocate(item.base_units(), ConsumptionPolicy::Lifo)?;
            }
        }
        for product in staged.values() {
            repository::product::persist_stock(&mut tx, product).await?;
        }

        let total = Money::from_cents(draft.total_cents);
        if total.is_positive() {
            BalanceLedger::credit_supplier(&mut tx, &supplier.id, total).await?;
        }

        let sreturn = SupplierReturn {
            id: Self::new_id(),
            supplier_id: supplier.id.clone(),
            supplier_name: supplier.company.clone(),
            items: draft.items,
            total_cents: draft.total_cents,
            purchase_id: draft.purchase_id,
            notes: draft.notes,
            date: Utc::now(),
        };
        repository::supplier_return::insert(&mut tx, &sreturn).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::Products);
        if total.is_positive() {
            self.notify(Table::Suppliers);
        }
        self.notify(Table::SupplierReturns);

        info!(sreturn = %sreturn.id, total = sreturn.total_cents, "supplier return recorded");
        Ok(sreturn)
    }

    /// Reverses a supplier return: the quantity comes back as a fresh batch
    /// per line (the original batch identity is not restored) and the
    /// supplier balance is restored by the return total.
    #[instrument(skip(self))]
    pub async fn delete_supplier_return(&self, return_id: &str) -> EngineResult<()> {
        let mut tx = self.db.begin().await?;

        let sreturn = repository::supplier_return::get(&mut tx, return_id).await?;

        let mut staged: HashMap<String, Product> = HashMap::new();
        for item in &sreturn.items {
            if !staged.contains_key(&item.product_id) {
                let product = repository::product::get(&mut tx, &item.product_id).await?;
                staged.insert(item.product_id.clone(), product);
            }
        }
        for item in &sreturn.items {
            if let Some(product) = staged.get_mut(&item.product_id) {
                product.append_batch(item.base_units(), None, None)?;
            }
        }
        for product in staged.values() {
            repository::product::persist_stock(&mut tx, product).await?;
        }

        let total = Money::from_cents(sreturn.total_cents);
        if total.is_positive() {
            BalanceLedger::debit_supplier(&mut tx, &sreturn.supplier_id, total).await?;
        }

        repository::supplier_return::delete(&mut tx, return_id).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::Products);
        if total.is_positive() {
            self.notify(Table::Suppliers);
        }
        self.notify(Table::SupplierReturns);

        info!(sreturn = %return_id, "supplier return deleted");
        Ok(())
    }
}
