//! # Batch Inventory Primitives
//!
//! Stock for a product is a list of batches, each with its own quantity and
//! optional expiry date. This module owns the batch lifecycle: allocation
//! (consumption), appending new batches, and removal by source.
//!
//! ## Invariant
//! After every operation here, `product.stock` equals the sum of the
//! remaining batch quantities, every batch quantity is non-negative, and
//! emptied batches have been pruned. Callers never write `stock` directly.
//!
//! ## Consumption Policies
//! ```text
//! FEFO  First-Expired-First-Out: soonest expiry first, expiry-less last.
//!       Used by sales, so perishable stock leaves the shelf first.
//!
//! LIFO  Last-In-First-Out: newest batch first.
//!       Used by negative adjustments and supplier returns, which undo
//!       recently received stock.
//! ```
//! The policy is an explicit argument at every call site; no operation
//! hard-codes its ordering.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{Batch, Product};

// =============================================================================
// Consumption Policy
// =============================================================================

/// Order in which batches are consumed by an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionPolicy {
    /// First-Expired-First-Out. Batches without an expiry date sort last;
    /// ties keep append order.
    Fefo,
    /// Last-In-First-Out. Walks the batch list from the newest end.
    Lifo,
}

/// One batch's contribution to an allocation, for auditing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDraw {
    pub batch_id: String,
    pub quantity: i64,
}

// =============================================================================
// Product Batch Operations
// =============================================================================

impl Product {
    /// Consumes `quantity` base units from this product's batches.
    ///
    /// Fails with [`CoreError::InsufficientStock`] *before any mutation*
    /// when the aggregate stock is short; a failed allocation leaves the
    /// product exactly as it was. On success the emptied batches are
    /// pruned, `stock` is recomputed, and the per-batch draws are returned.
    pub fn allocate(&mut self, quantity: i64, policy: ConsumptionPolicy) -> CoreResult<Vec<BatchDraw>> {
        if quantity <= 0 {
            return Err(crate::error::ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let available = self.batch_total();
        if available < quantity {
            return Err(CoreError::InsufficientStock {
                product: self.name.clone(),
                requested: quantity,
                available,
            });
        }

        // Visit batches in policy order without reordering the stored list;
        // LIFO depends on the list staying in append order.
        let mut order: Vec<usize> = (0..self.batches.len()).collect();
        match policy {
            ConsumptionPolicy::Fefo => {
                order.sort_by(|&a, &b| cmp_expiry(&self.batches[a], &self.batches[b]));
            }
            ConsumptionPolicy::Lifo => {
                order.reverse();
            }
        }

        let mut remaining = quantity;
        let mut draws = Vec::new();
        for idx in order {
            if remaining == 0 {
                break;
            }
            let batch = &mut self.batches[idx];
            let take = batch.quantity.min(remaining);
            if take > 0 {
                batch.quantity -= take;
                remaining -= take;
                draws.push(BatchDraw {
                    batch_id: batch.id.clone(),
                    quantity: take,
                });
            }
        }

        debug_assert_eq!(remaining, 0);
        self.normalize_batches();
        Ok(draws)
    }

    /// Appends a new batch of `quantity` base units.
    ///
    /// Always a fresh batch, never merged into an existing one even when
    /// the expiry matches; each received lot stays traceable to its source.
    /// Returns the new batch id.
    pub fn append_batch(
        &mut self,
        quantity: i64,
        expiry_date: Option<NaiveDate>,
        source_id: Option<String>,
    ) -> CoreResult<String> {
        if quantity <= 0 {
            return Err(crate::error::ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let id = Uuid::new_v4().to_string();
        self.batches.push(Batch {
            id: id.clone(),
            quantity,
            expiry_date,
            source_id,
        });
        self.normalize_batches();
        Ok(id)
    }

    /// Removes every batch tagged with `source_id`.
    ///
    /// Returns the total quantity actually removed. A lot partially
    /// consumed since it was received restores less than it delivered;
    /// because `stock` is recomputed from the survivors, the aggregate can
    /// never go negative.
    pub fn remove_batches_by_source(&mut self, source_id: &str) -> i64 {
        let mut removed = 0;
        self.batches.retain(|b| {
            if b.source_id.as_deref() == Some(source_id) {
                removed += b.quantity;
                false
            } else {
                true
            }
        });
        self.normalize_batches();
        removed
    }

    /// Prunes emptied batches and recomputes the aggregate stock.
    fn normalize_batches(&mut self) {
        self.batches.retain(|b| b.quantity > 0);
        self.stock = self.batch_total();
    }
}

/// FEFO ordering: dated batches ascending, undated last.
fn cmp_expiry(a: &Batch, b: &Batch) -> Ordering {
    match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SellingMethod, Unit};
    use chrono::Utc;

    fn product_with_batches(batches: Vec<Batch>) -> Product {
        let stock = batches.iter().map(|b| b.quantity).sum();
        Product {
            id: "p1".to_string(),
            name: "Espresso".to_string(),
            sku: "800001".to_string(),
            category_id: None,
            description: None,
            units: vec![Unit {
                id: "u1".to_string(),
                name: "Cup".to_string(),
                price_cents: 1200,
                cost_price_cents: 700,
                factor: 1,
            }],
            batches,
            stock,
            selling_method: SellingMethod::Unit,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn batch(id: &str, quantity: i64, expiry: Option<&str>) -> Batch {
        Batch {
            id: id.to_string(),
            quantity,
            expiry_date: expiry.map(|d| d.parse().unwrap()),
            source_id: None,
        }
    }

    #[test]
    fn fefo_consumes_dated_batches_first() {
        // A expires, B never does; allocating 7 drains A then takes 2 of B.
        let mut product =
            product_with_batches(vec![batch("b", 10, None), batch("a", 5, Some("2024-01-01"))]);

        let draws = product.allocate(7, ConsumptionPolicy::Fefo).unwrap();

        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0], BatchDraw { batch_id: "a".to_string(), quantity: 5 });
        assert_eq!(draws[1], BatchDraw { batch_id: "b".to_string(), quantity: 2 });
        assert_eq!(product.batches.len(), 1);
        assert_eq!(product.batches[0].id, "b");
        assert_eq!(product.batches[0].quantity, 8);
        assert_eq!(product.stock, 8);
    }

    #[test]
    fn fefo_orders_dated_batches_by_expiry() {
        let mut product = product_with_batches(vec![
            batch("late", 4, Some("2025-06-01")),
            batch("soon", 4, Some("2025-01-01")),
        ]);

        let draws = product.allocate(5, ConsumptionPolicy::Fefo).unwrap();
        assert_eq!(draws[0].batch_id, "soon");
        assert_eq!(draws[1].batch_id, "late");
        assert_eq!(product.stock, 3);
    }

    #[test]
    fn lifo_consumes_newest_batch_first() {
        // Append order [C(4), D(6)]: drawing through all of D and one unit
        // of C leaves C at 3.
        let mut product = product_with_batches(vec![batch("c", 4, None), batch("d", 6, None)]);

        let draws = product.allocate(7, ConsumptionPolicy::Lifo).unwrap();

        assert_eq!(draws[0], BatchDraw { batch_id: "d".to_string(), quantity: 6 });
        assert_eq!(draws[1], BatchDraw { batch_id: "c".to_string(), quantity: 1 });
        assert_eq!(product.batches.len(), 1);
        assert_eq!(product.batches[0].id, "c");
        assert_eq!(product.batches[0].quantity, 3);
        assert_eq!(product.stock, 3);
    }

    #[test]
    fn allocation_failure_mutates_nothing() {
        let mut product =
            product_with_batches(vec![batch("a", 5, Some("2024-01-01")), batch("b", 10, None)]);
        let before = product.clone();

        let err = product.allocate(16, ConsumptionPolicy::Fefo).unwrap_err();

        match err {
            CoreError::InsufficientStock { requested, available, .. } => {
                assert_eq!(requested, 16);
                assert_eq!(available, 15);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(product.batches, before.batches);
        assert_eq!(product.stock, before.stock);
    }

    #[test]
    fn exact_stock_allocation_succeeds() {
        let mut product = product_with_batches(vec![batch("a", 5, None), batch("b", 3, None)]);

        product.allocate(8, ConsumptionPolicy::Fefo).unwrap();
        assert_eq!(product.stock, 0);
        assert!(product.batches.is_empty());
    }

    #[test]
    fn append_never_merges_batches() {
        let mut product = product_with_batches(vec![batch("a", 5, Some("2025-01-01"))]);

        product
            .append_batch(3, Some("2025-01-01".parse().unwrap()), Some("pur-1".to_string()))
            .unwrap();

        assert_eq!(product.batches.len(), 2);
        assert_eq!(product.stock, 8);
        assert_eq!(product.batches[1].source_id.as_deref(), Some("pur-1"));
    }

    #[test]
    fn remove_by_source_returns_removed_quantity() {
        let mut product = product_with_batches(vec![batch("a", 5, None)]);
        product.append_batch(10, None, Some("pur-1".to_string())).unwrap();
        product.append_batch(4, None, Some("pur-2".to_string())).unwrap();

        let removed = product.remove_batches_by_source("pur-1");

        assert_eq!(removed, 10);
        assert_eq!(product.stock, 9);
        assert!(product.batches.iter().all(|b| b.source_id.as_deref() != Some("pur-1")));
    }

    #[test]
    fn remove_by_source_after_partial_consumption() {
        // The purchase delivered 10 but 6 were since sold; deleting it only
        // removes the 4 still on hand and stock stays non-negative.
        let mut product = product_with_batches(vec![]);
        product.append_batch(10, None, Some("pur-1".to_string())).unwrap();
        product.allocate(6, ConsumptionPolicy::Fefo).unwrap();

        let removed = product.remove_batches_by_source("pur-1");

        assert_eq!(removed, 4);
        assert_eq!(product.stock, 0);
    }

    #[test]
    fn zero_quantity_allocation_is_rejected() {
        let mut product = product_with_batches(vec![batch("a", 5, None)]);
        assert!(product.allocate(0, ConsumptionPolicy::Fefo).is_err());
        assert!(product.append_batch(0, None, None).is_err());
    }

    #[test]
    fn stock_always_equals_batch_sum() {
        let mut product = product_with_batches(vec![
            batch("a", 5, Some("2025-03-01")),
            batch("b", 7, None),
        ]);

        product.allocate(3, ConsumptionPolicy::Fefo).unwrap();
        assert_eq!(product.stock, product.batch_total());

        product.append_batch(6, None, Some("pur-9".to_string())).unwrap();
        assert_eq!(product.stock, product.batch_total());

        product.remove_batches_by_source("pur-9");
        assert_eq!(product.stock, product.batch_total());

        product.allocate(2, ConsumptionPolicy::Lifo).unwrap();
        assert_eq!(product.stock, product.batch_total());
    }
}
