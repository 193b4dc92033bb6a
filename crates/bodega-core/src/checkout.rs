//! # Sale Totals Math
//!
//! Pure arithmetic for turning a list of sale lines into totals:
//!
//! ```text
//! subtotal   = Σ line.unit.price × line.quantity
//! taxable    = subtotal − discount
//! tax        = taxable × rate          (integer bps, rounded)
//! total      = taxable + tax
//! total_cost = Σ line.unit.cost × line.quantity
//! ```
//!
//! A sale edit recomputes the same formulas over the edited lines while
//! holding the *original* discount and tax rate constant.

use std::collections::HashMap;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{SaleItem, TaxRate};

// =============================================================================
// Sale Totals
// =============================================================================

/// Computed totals for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub total_cost_cents: i64,
}

/// Computes sale totals from line items, a whole-sale discount and a tax
/// rate.
///
/// The discount must lie in `[0, subtotal]`.
pub fn compute_totals(
    items: &[SaleItem],
    discount_cents: i64,
    tax_rate: TaxRate,
) -> CoreResult<SaleTotals> {
    let subtotal: Money = items.iter().map(SaleItem::line_total).sum();
    let total_cost: Money = items.iter().map(SaleItem::line_cost).sum();

    if discount_cents < 0 || discount_cents > subtotal.cents() {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: subtotal.cents(),
        }
        .into());
    }

    let taxable = subtotal - Money::from_cents(discount_cents);
    let tax = taxable.calculate_tax(tax_rate);
    let total = taxable + tax;

    Ok(SaleTotals {
        subtotal_cents: subtotal.cents(),
        discount_cents,
        tax_cents: tax.cents(),
        total_cents: total.cents(),
        total_cost_cents: total_cost.cents(),
    })
}

// =============================================================================
// Base-Unit Aggregation
// =============================================================================

/// Base units required per product, aggregated across lines.
///
/// A cart can hold the same product in several units (e.g. one box and two
/// single pieces); stock validation happens against the aggregate.
pub fn required_base_units(items: &[SaleItem]) -> HashMap<String, i64> {
    let mut required: HashMap<String, i64> = HashMap::new();
    for item in items {
        *required.entry(item.product_id.clone()).or_default() += item.base_units();
    }
    required
}

/// Net per-product base-unit change between an original and an edited line
/// list: positive means more stock must be consumed, negative means stock
/// comes back.
///
/// Lines are matched by (product, unit); lines missing from the edited list
/// count as reduced to zero, lines missing from the original as grown from
/// zero.
pub fn base_unit_deltas(original: &[SaleItem], edited: &[SaleItem]) -> HashMap<String, i64> {
    let mut deltas: HashMap<String, i64> = HashMap::new();

    let key = |item: &SaleItem| (item.product_id.clone(), item.unit.id.clone());
    let original_by_key: HashMap<_, &SaleItem> = original.iter().map(|i| (key(i), i)).collect();
    let edited_by_key: HashMap<_, &SaleItem> = edited.iter().map(|i| (key(i), i)).collect();

    for (k, item) in &original_by_key {
        let new_quantity = edited_by_key.get(k).map_or(0, |i| i.quantity);
        let change = (new_quantity - item.quantity) * item.unit.factor;
        if change != 0 {
            *deltas.entry(item.product_id.clone()).or_default() += change;
        }
    }
    for (k, item) in &edited_by_key {
        if !original_by_key.contains_key(k) {
            *deltas.entry(item.product_id.clone()).or_default() += item.base_units();
        }
    }

    deltas.retain(|_, v| *v != 0);
    deltas
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Unit;

    fn item(product_id: &str, unit_id: &str, factor: i64, price: i64, cost: i64, qty: i64) -> SaleItem {
        SaleItem {
            product_id: product_id.to_string(),
            product_name: product_id.to_string(),
            unit: Unit {
                id: unit_id.to_string(),
                name: "Piece".to_string(),
                price_cents: price,
                cost_price_cents: cost,
                factor,
            },
            quantity: qty,
        }
    }

    #[test]
    fn totals_follow_discount_then_tax() {
        // Two lines: 2 × 12.00 + 1 × 45.00 = 69.00; 9.00 discount; 14% tax.
        let items = vec![
            item("p1", "u1", 1, 1200, 700, 2),
            item("p2", "u2", 6, 4500, 2500, 1),
        ];

        let totals = compute_totals(&items, 900, TaxRate::from_bps(1400)).unwrap();

        assert_eq!(totals.subtotal_cents, 6900);
        assert_eq!(totals.tax_cents, 840); // 14% of 60.00
        assert_eq!(totals.total_cents, 6840);
        assert_eq!(totals.total_cost_cents, 3900);
    }

    #[test]
    fn discount_above_subtotal_is_rejected() {
        let items = vec![item("p1", "u1", 1, 1000, 500, 1)];
        assert!(compute_totals(&items, 1001, TaxRate::zero()).is_err());
        assert!(compute_totals(&items, -1, TaxRate::zero()).is_err());
        assert!(compute_totals(&items, 1000, TaxRate::zero()).is_ok());
    }

    #[test]
    fn required_base_units_aggregates_across_units() {
        // Same product as 2 boxes of 6 and 3 single pieces: 15 base units.
        let items = vec![
            item("p1", "box", 6, 4500, 2500, 2),
            item("p1", "piece", 1, 800, 450, 3),
            item("p2", "u", 1, 1000, 600, 4),
        ];

        let required = required_base_units(&items);
        assert_eq!(required["p1"], 15);
        assert_eq!(required["p2"], 4);
    }

    #[test]
    fn deltas_cover_shrunk_grown_added_and_dropped_lines() {
        let original = vec![
            item("p1", "u1", 1, 1000, 500, 5), // shrinks to 2 → -3
            item("p2", "u2", 6, 4500, 2500, 2), // dropped → -12
            item("p3", "u3", 1, 700, 400, 1),  // grows to 4 → +3
        ];
        let edited = vec![
            item("p1", "u1", 1, 1000, 500, 2),
            item("p3", "u3", 1, 700, 400, 4),
            item("p4", "u4", 1, 900, 500, 2), // added → +2
        ];

        let deltas = base_unit_deltas(&original, &edited);

        assert_eq!(deltas["p1"], -3);
        assert_eq!(deltas["p2"], -12);
        assert_eq!(deltas["p3"], 3);
        assert_eq!(deltas["p4"], 2);
    }

    #[test]
    fn unchanged_lines_produce_no_delta() {
        let original = vec![item("p1", "u1", 1, 1000, 500, 5)];
        let edited = original.clone();
        assert!(base_unit_deltas(&original, &edited).is_empty());
    }
}
