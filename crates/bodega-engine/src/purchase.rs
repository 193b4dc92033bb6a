//! # Purchase Operations
//!
//! Recording a supplier purchase (stock in, supplier owed more) and
//! deleting one (the reverse).
//!
//! Every received line becomes its own batch tagged with the purchase id,
//! so deleting the purchase can remove exactly the batches it created.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use bodega_core::validation::{
    validate_id, validate_line_count, validate_non_negative_cents, validate_quantity,
    validate_unit_factor,
};
use bodega_core::{Product, Purchase, PurchaseItem, PurchasePaymentMethod};
use bodega_db::repository;
use bodega_sync::Table;

use crate::engine::TransactionEngine;
use crate::error::EngineResult;
use crate::ledger::BalanceLedger;

// =============================================================================
// Draft
// =============================================================================

/// Input for recording a purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseDraft {
    pub supplier_id: String,
    pub items: Vec<PurchaseItem>,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub payment_method: PurchasePaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

// =============================================================================
// Operations
// =============================================================================

impl TransactionEngine {
    /// Records a purchase: one new batch per line, supplier balance moved
    /// by the unpaid remainder.
    #[instrument(skip(self, draft), fields(supplier = %draft.supplier_id))]
    pub async fn record_purchase(&self, draft: PurchaseDraft) -> EngineResult<Purchase> {
        validate_line_count("purchase items", draft.items.len())?;
        validate_id("supplier", &draft.supplier_id)?;
        validate_non_negative_cents("total", draft.total_cents)?;
        validate_non_negative_cents("amount paid", draft.amount_paid_cents)?;
        for item in &draft.items {
            validate_quantity(item.quantity)?;
            validate_unit_factor(item.unit_factor)?;
            validate_non_negative_cents("cost price", item.cost_price_cents)?;
        }

        let mut tx = self.db.begin().await?;

        let supplier = repository::party::get_supplier(&mut tx, &draft.supplier_id).await?;
        let purchase_id = Self::new_id();

        // Several lines can hit the same product; stage each product once.
        let mut staged: HashMap<String, Product> = HashMap::new();
        for item in &draft.items {
            if !staged.contains_key(&item.product_id) {
                let product = repository::product::get(&mut tx, &item.product_id).await?;
                staged.insert(item.product_id.clone(), product);
            }
        }
        for item in &draft.items {
            if let Some(product) = staged.get_mut(&item.product_id) {
                product.append_batch(
                    item.base_units(),
                    item.expiry_date,
                    Some(purchase_id.clone()),
                )?;
            }
        }
        for product in staged.values() {
            repository::product::persist_stock(&mut tx, product).await?;
        }

        let purchase = Purchase {
            id: purchase_id,
            supplier_id: supplier.id.clone(),
            supplier_name: supplier.company.clone(),
            items: draft.items,
            total_cents: draft.total_cents,
            amount_paid_cents: draft.amount_paid_cents,
            payment_method: draft.payment_method,
            reference: draft.reference,
            notes: draft.notes,
            date: Utc::now(),
        };

        // What remains unpaid is owed to the supplier; an overpayment
        // (paid > total) credits them instead.
        let outstanding = purchase.outstanding();
        BalanceLedger::apply_supplier_delta(&mut tx, &supplier.id, outstanding).await?;

        repository::purchase::insert(&mut tx, &purchase).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::Products);
        if !outstanding.is_zero() {
            self.notify(Table::Suppliers);
        }
        self.notify(Table::Purchases);

        info!(purchase = %purchase.id, total = purchase.total_cents, "purchase recorded");
        Ok(purchase)
    }

    /// Deletes a purchase, removing the batches it created and reversing
    /// the supplier balance movement.
    ///
    /// Stock the purchase delivered that was since consumed is gone; only
    /// the surviving batches are removed, and the aggregate stock stays
    /// consistent with the batch list. The balance reversal always uses the
    /// recorded `total − amount_paid`, consumed or not.
    #[instrument(skip(self))]
    pub async fn delete_purchase(&self, purchase_id: &str) -> EngineResult<()> {
        let mut tx = self.db.begin().await?;

        let purchase = repository::purchase::get(&mut tx, purchase_id).await?;

        let mut staged: HashMap<String, Product> = HashMap::new();
        for item in &purchase.items {
            if !staged.contains_key(&item.product_id) {
                let product = repository::product::get(&mut tx, &item.product_id).await?;
                staged.insert(item.product_id.clone(), product);
            }
        }
        for product in staged.values_mut() {
            product.remove_batches_by_source(purchase_id);
            repository::product::persist_stock(&mut tx, product).await?;
        }

        let outstanding = purchase.outstanding();
        BalanceLedger::apply_supplier_delta(&mut tx, &purchase.supplier_id, -outstanding).await?;

        repository::purchase::delete(&mut tx, purchase_id).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::Products);
        if !outstanding.is_zero() {
            self.notify(Table::Suppliers);
        }
        self.notify(Table::Purchases);

        info!(purchase = %purchase_id, "purchase deleted");
        Ok(())
    }
}
