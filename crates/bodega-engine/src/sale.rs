//! # Sale Operations
//!
//! Completing a cart as a sale, and editing a recorded sale (partial
//! return).
//!
//! ## Stock Semantics
//! A sale consumes batches FEFO so perishable stock leaves first. Stock is
//! validated for *every* line against the aggregate before any batch is
//! touched: a cart whose second line is short leaves the first line's stock
//! unchanged.
//!
//! ## Deferred Payments
//! Payment lines with method `deferred` move the sale amount onto the
//! customer's running balance instead of the drawer — unless the customer
//! doesn't track a balance, in which case the ledger skips it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use bodega_core::checkout;
use bodega_core::validation::{
    validate_id, validate_line_count, validate_positive_cents, validate_quantity,
    validate_unit_factor,
};
use bodega_core::{ConsumptionPolicy, Money, PaymentMethod, Product, Sale, SaleItem, SalePayment, TaxRate};
use bodega_db::repository;
use bodega_sync::Table;

use crate::engine::TransactionEngine;
use crate::error::{EngineError, EngineResult};
use crate::ledger::BalanceLedger;

// =============================================================================
// Draft
// =============================================================================

/// Input for completing a sale: the cart, the tenders, a whole-sale
/// discount and the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDraft {
    pub items: Vec<SaleItem>,
    pub payments: Vec<SalePayment>,
    pub discount_cents: i64,
    pub customer_id: String,
}

// =============================================================================
// Operations
// =============================================================================

impl TransactionEngine {
    /// Completes a cart as a sale.
    ///
    /// Atomic end to end: stock allocation, customer balance movement and
    /// the sale record land in one transaction.
    #[instrument(skip(self, draft), fields(customer = %draft.customer_id))]
    pub async fn complete_sale(&self, draft: SaleDraft) -> EngineResult<Sale> {
        validate_line_count("cart items", draft.items.len())?;
        validate_id("customer", &draft.customer_id)?;
        for item in &draft.items {
            validate_quantity(item.quantity)?;
            validate_unit_factor(item.unit.factor)?;
        }
        for payment in &draft.payments {
            validate_positive_cents("payment amount", payment.amount_cents)?;
        }

        let mut tx = self.db.begin().await?;

        let customer = repository::party::get_customer(&mut tx, &draft.customer_id).await?;
        let tax_rate = repository::settings::tax_rate(&mut tx).await?;
        let totals = checkout::compute_totals(&draft.items, draft.discount_cents, tax_rate)?;

        // Stage every product and validate aggregate stock before touching
        // a single batch. Line order decides which shortage is reported.
        let required = checkout::required_base_units(&draft.items);
        let mut staged: Vec<(Product, i64)> = Vec::new();
        for item in &draft.items {
            if staged.iter().any(|(p, _)| p.id == item.product_id) {
                continue;
            }
            let product = repository::product::get(&mut tx, &item.product_id).await?;
            let needed = required[&item.product_id];
            if product.stock < needed {
                return Err(EngineError::InsufficientStock {
                    product: product.name,
                    requested: needed,
                    available: product.stock,
                });
            }
            staged.push((product, needed));
        }

        for (product, needed) in &mut staged {
            product.allocate(*needed, ConsumptionPolicy::Fefo)?;
            repository::product::persist_stock(&mut tx, product).await?;
        }

        let deferred: i64 = draft
            .payments
            .iter()
            .filter(|p| p.method == PaymentMethod::Deferred)
            .map(|p| p.amount_cents)
            .sum();
        if deferred > 0 {
            BalanceLedger::debit_customer(&mut tx, &customer, Money::from_cents(deferred)).await?;
        }

        let sale = Sale {
            id: Self::new_id(),
            items: draft.items,
            subtotal_cents: totals.subtotal_cents,
            discount_cents: totals.discount_cents,
            tax_cents: totals.tax_cents,
            tax_rate_bps: tax_rate.bps(),
            total_cents: totals.total_cents,
            total_cost_cents: totals.total_cost_cents,
            payments: draft.payments,
            customer_id: customer.id.clone(),
            customer_name: customer.name.clone(),
            date: Utc::now(),
        };
        repository::sale::insert(&mut tx, &sale).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::Products);
        if deferred > 0 && customer.tracks_balance {
            self.notify(Table::Customers);
        }
        self.notify(Table::Sales);

        info!(sale = %sale.id, total = sale.total_cents, items = sale.items.len(), "sale completed");
        Ok(sale)
    }

    /// Edits a recorded sale's line list (partial return, or a corrected
    /// quantity).
    ///
    /// Quantity decreases return stock as a *fresh* batch — the original
    /// batch identity and expiry are not restored. Quantity increases and
    /// added lines allocate FEFO with the usual stock validation. Totals
    /// are recomputed from the edited lines with the original discount and
    /// tax rate held constant, and the difference against the original
    /// total moves the customer balance.
    #[instrument(skip(self, edited_items))]
    pub async fn edit_sale(&self, sale_id: &str, edited_items: Vec<SaleItem>) -> EngineResult<Sale> {
        validate_line_count("sale items", edited_items.len())?;
        for item in &edited_items {
            validate_quantity(item.quantity)?;
            validate_unit_factor(item.unit.factor)?;
        }

        let mut tx = self.db.begin().await?;

        let original = repository::sale::get(&mut tx, sale_id).await?;
        let customer = repository::party::get_customer(&mut tx, &original.customer_id).await?;

        let deltas = checkout::base_unit_deltas(&original.items, &edited_items);

        // Stable product order: original lines first, then lines new to the
        // edit.
        let mut order: Vec<&str> = Vec::new();
        for item in original.items.iter().chain(edited_items.iter()) {
            if deltas.contains_key(&item.product_id) && !order.contains(&item.product_id.as_str()) {
                order.push(&item.product_id);
            }
        }

        // Validate growth against stock before mutating anything.
        let mut staged: Vec<(Product, i64)> = Vec::new();
        for product_id in order {
            let delta = deltas[product_id];
            let product = repository::product::get(&mut tx, product_id).await?;
            if delta > 0 && product.stock < delta {
                return Err(EngineError::InsufficientStock {
                    product: product.name,
                    requested: delta,
                    available: product.stock,
                });
            }
            staged.push((product, delta));
        }

        for (product, delta) in &mut staged {
            if *delta > 0 {
                product.allocate(*delta, ConsumptionPolicy::Fefo)?;
            } else {
                product.append_batch(-*delta, None, None)?;
            }
            repository::product::persist_stock(&mut tx, product).await?;
        }

        let totals = checkout::compute_totals(
            &edited_items,
            original.discount_cents,
            TaxRate::from_bps(original.tax_rate_bps),
        )?;

        // new > original: the customer owes more; new < original: refund.
        let balance_delta = Money::from_cents(totals.total_cents - original.total_cents);
        BalanceLedger::apply_customer_delta(&mut tx, &customer, balance_delta).await?;

        let updated = Sale {
            items: edited_items,
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax_cents,
            total_cents: totals.total_cents,
            total_cost_cents: totals.total_cost_cents,
            ..original
        };
        repository::sale::update(&mut tx, &updated).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::Products);
        if !balance_delta.is_zero() && customer.tracks_balance {
            self.notify(Table::Customers);
        }
        self.notify(Table::Sales);

        info!(sale = %updated.id, total = updated.total_cents, "sale edited");
        Ok(updated)
    }
}
