//! # Domain Types
//!
//! Core domain types used throughout the bodega engine.
//!
//! ## Snapshot Pattern
//! Sale and purchase lines freeze the unit (name, price, cost, factor) at
//! the moment they are recorded. Editing a product later never rewrites
//! history.
//!
//! ## Quantities
//! Stock quantities are always whole **base units**: the unit of a product
//! whose `factor` is 1. A product sold by weight picks a small base unit
//! (e.g. grams) instead of fractional quantities.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1 bps = 0.01%; 1400 bps = 14%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Product, Unit, Batch
// =============================================================================

/// A selling unit of a product (e.g. "Piece", "Box of 6", "Kilo").
///
/// `factor` is how many base units one of this unit represents; the base
/// unit itself has `factor == 1`. Exactly one unit per product is the base
/// unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub name: String,
    /// Selling price for one of this unit, in cents.
    pub price_cents: i64,
    /// Cost price for one of this unit, in cents.
    pub cost_price_cents: i64,
    /// Base units contained in one of this unit (>= 1).
    pub factor: i64,
}

impl Unit {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }
}

/// A discrete lot of stock with its own quantity and optional expiry.
///
/// `source_id` links the batch to the operation that created it (a purchase
/// id, usually) so the whole lot can be removed when that operation is
/// reversed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    /// Remaining quantity in base units (>= 0; empty batches are pruned).
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

/// How a product is sold. Classification metadata only; quantities are
/// integer base units either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellingMethod {
    Unit,
    Weight,
}

impl SellingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellingMethod::Unit => "unit",
            SellingMethod::Weight => "weight",
        }
    }
}

impl std::str::FromStr for SellingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unit" => Ok(SellingMethod::Unit),
            "weight" => Ok(SellingMethod::Weight),
            other => Err(format!("unknown selling method: {other}")),
        }
    }
}

/// A product and its stock, tracked as a set of batches.
///
/// Invariant: `stock == batches.iter().map(|b| b.quantity).sum()` at all
/// times. `stock` is recomputed from the batches after every mutation,
/// never written independently (see [`crate::inventory`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub units: Vec<Unit>,
    pub batches: Vec<Batch>,
    /// Aggregate stock in base units; always the sum of batch quantities.
    pub stock: i64,
    pub selling_method: SellingMethod,
    /// Optimistic-concurrency stamp; bumped on every persisted write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the base unit (factor 1), if the product has one.
    pub fn base_unit(&self) -> Option<&Unit> {
        self.units.iter().find(|u| u.factor == 1)
    }

    /// Sum of remaining batch quantities.
    pub fn batch_total(&self) -> i64 {
        self.batches.iter().map(|b| b.quantity).sum()
    }
}

// =============================================================================
// Sales
// =============================================================================

/// Payment method for a sale tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Settlement deferred to the customer's running balance.
    Deferred,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Deferred => "deferred",
        }
    }
}

/// One tender towards a sale. A sale can carry several for split payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalePayment {
    pub method: PaymentMethod,
    pub amount_cents: i64,
}

/// A line in a sale (or in a cart about to become a sale).
///
/// The unit snapshot freezes price/cost/factor at cart-add time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: String,
    pub product_name: String,
    pub unit: Unit,
    /// Quantity in the snapshot unit.
    pub quantity: i64,
}

impl SaleItem {
    /// Quantity expressed in base units.
    #[inline]
    pub fn base_units(&self) -> i64 {
        self.quantity * self.unit.factor
    }

    /// Line total before discount/tax.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit.price().multiply_quantity(self.quantity)
    }

    /// Line cost of goods.
    #[inline]
    pub fn line_cost(&self) -> Money {
        self.unit.cost_price().multiply_quantity(self.quantity)
    }
}

/// A completed sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: String,
    pub items: Vec<SaleItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    /// Tax rate at the time of sale, in basis points (frozen).
    pub tax_rate_bps: u32,
    pub total_cents: i64,
    /// Cost of goods sold, for margin reporting.
    pub total_cost_cents: i64,
    pub payments: Vec<SalePayment>,
    pub customer_id: String,
    pub customer_name: String,
    pub date: DateTime<Utc>,
}

impl Sale {
    /// Sum of payment amounts with the given method.
    pub fn payment_total(&self, method: PaymentMethod) -> Money {
        self.payments
            .iter()
            .filter(|p| p.method == method)
            .map(|p| Money::from_cents(p.amount_cents))
            .sum()
    }

    /// Amount deferred to the customer balance.
    #[inline]
    pub fn deferred_total(&self) -> Money {
        self.payment_total(PaymentMethod::Deferred)
    }
}

/// A suspended cart, parked to be resumed later. Never touches stock or
/// balances while parked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParkedSale {
    pub id: String,
    pub items: Vec<SaleItem>,
    pub customer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub total_cents: i64,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Purchases
// =============================================================================

/// Payment method for a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchasePaymentMethod {
    Cash,
    Deferred,
}

impl PurchasePaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchasePaymentMethod::Cash => "cash",
            PurchasePaymentMethod::Deferred => "deferred",
        }
    }
}

/// A line in a purchase, in the purchased unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub product_id: String,
    pub product_name: String,
    /// Quantity in the purchased unit.
    pub quantity: i64,
    /// Cost per purchased unit, in cents.
    pub cost_price_cents: i64,
    pub unit_name: String,
    /// Base units per purchased unit.
    pub unit_factor: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
}

impl PurchaseItem {
    /// Quantity expressed in base units.
    #[inline]
    pub fn base_units(&self) -> i64 {
        self.quantity * self.unit_factor
    }
}

/// A supplier purchase adding stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub items: Vec<PurchaseItem>,
    pub total_cents: i64,
    pub amount_paid_cents: i64,
    pub payment_method: PurchasePaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

impl Purchase {
    /// Amount still owed to the supplier for this purchase.
    #[inline]
    pub fn outstanding(&self) -> Money {
        Money::from_cents(self.total_cents - self.amount_paid_cents)
    }
}

// =============================================================================
// Adjustments
// =============================================================================

/// Why stock was adjusted. Classification metadata only; the mechanics are
/// driven by the sign of the quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    Damaged,
    Waste,
    InventoryCorrection,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::Damaged => "damaged",
            AdjustmentReason::Waste => "waste",
            AdjustmentReason::InventoryCorrection => "inventory_correction",
        }
    }
}

impl std::str::FromStr for AdjustmentReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "damaged" => Ok(AdjustmentReason::Damaged),
            "waste" => Ok(AdjustmentReason::Waste),
            "inventory_correction" => Ok(AdjustmentReason::InventoryCorrection),
            other => Err(format!("unknown adjustment reason: {other}")),
        }
    }
}

/// A line in a stock adjustment. Positive change adds stock, negative
/// removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentItem {
    pub product_id: String,
    pub product_name: String,
    /// Signed quantity change in the adjusted unit.
    pub quantity_change: i64,
    pub unit_name: String,
    pub unit_factor: i64,
}

impl AdjustmentItem {
    /// Signed change expressed in base units.
    #[inline]
    pub fn base_units(&self) -> i64 {
        self.quantity_change * self.unit_factor
    }
}

/// A manual stock adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: String,
    pub items: Vec<AdjustmentItem>,
    pub reason: AdjustmentReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Supplier Returns
// =============================================================================

/// A line in a supplier return; always a stock reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierReturnItem {
    pub product_id: String,
    pub product_name: String,
    /// Quantity in the returned unit.
    pub quantity: i64,
    pub cost_price_cents: i64,
    pub unit_name: String,
    pub unit_factor: i64,
}

impl SupplierReturnItem {
    /// Quantity expressed in base units.
    #[inline]
    pub fn base_units(&self) -> i64 {
        self.quantity * self.unit_factor
    }
}

/// Stock returned to a supplier, reducing inventory and what the store owes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierReturn {
    pub id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub items: Vec<SupplierReturnItem>,
    pub total_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Customers & Suppliers
// =============================================================================

/// A customer with an optional running balance.
///
/// `balance_cents > 0` means the customer owes the store. The walk-in cash
/// customer carries `tracks_balance = false`: ledger operations against it
/// are no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub balance_cents: i64,
    /// Whether deferred sales and payments move this customer's balance.
    pub tracks_balance: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// A supplier with a running balance.
///
/// `balance_cents > 0` means the store owes the supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub balance_cents: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// A settlement payment received from a customer, reducing their balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerPayment {
    pub id: String,
    pub customer_id: String,
    pub amount_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

/// A settlement payment made to a supplier, reducing what the store owes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierPayment {
    pub id: String,
    pub supplier_id: String,
    pub amount_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Work Sessions & Expenses
// =============================================================================

/// Lifecycle of a cash-drawer session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Closed => "closed",
        }
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// A bounded period of cash-drawer activity for a cashier.
///
/// The closing fields are populated exactly once, when the session ends,
/// and are an immutable snapshot afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkSession {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub opening_float_cents: i64,
    pub status: SessionStatus,
    pub closing_float_cents: Option<i64>,
    pub total_cash_cents: Option<i64>,
    pub total_card_cents: Option<i64>,
    pub total_deferred_cents: Option<i64>,
    pub total_expenses_cents: Option<i64>,
    pub expected_cash_cents: Option<i64>,
    /// Positive for overage, negative for shortage.
    pub difference_cents: Option<i64>,
}

/// A cash expense taken from the drawer during a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: String,
    pub session_id: String,
    pub amount_cents: i64,
    pub reason: String,
    pub date: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(factor: i64, price: i64) -> Unit {
        Unit {
            id: format!("u-{factor}"),
            name: "Piece".to_string(),
            price_cents: price,
            cost_price_cents: price / 2,
            factor,
        }
    }

    #[test]
    fn sale_item_base_units_scale_by_factor() {
        let item = SaleItem {
            product_id: "p1".to_string(),
            product_name: "Croissant".to_string(),
            unit: unit(6, 4500),
            quantity: 2,
        };
        assert_eq!(item.base_units(), 12);
        assert_eq!(item.line_total().cents(), 9000);
    }

    #[test]
    fn sale_payment_totals_by_method() {
        let sale = Sale {
            id: "s1".to_string(),
            items: vec![],
            subtotal_cents: 0,
            discount_cents: 0,
            tax_cents: 0,
            tax_rate_bps: 0,
            total_cents: 8000,
            total_cost_cents: 0,
            payments: vec![
                SalePayment {
                    method: PaymentMethod::Cash,
                    amount_cents: 3000,
                },
                SalePayment {
                    method: PaymentMethod::Deferred,
                    amount_cents: 5000,
                },
            ],
            customer_id: "c1".to_string(),
            customer_name: "Walk-in".to_string(),
            date: Utc::now(),
        };
        assert_eq!(sale.payment_total(PaymentMethod::Cash).cents(), 3000);
        assert_eq!(sale.deferred_total().cents(), 5000);
        assert_eq!(sale.payment_total(PaymentMethod::Card).cents(), 0);
    }

    #[test]
    fn enum_round_trips() {
        assert_eq!(
            "inventory_correction".parse::<AdjustmentReason>().unwrap(),
            AdjustmentReason::InventoryCorrection
        );
        assert_eq!("active".parse::<SessionStatus>().unwrap(), SessionStatus::Active);
        assert!("nope".parse::<SellingMethod>().is_err());
    }

    #[test]
    fn purchase_outstanding() {
        let purchase = Purchase {
            id: "pur1".to_string(),
            supplier_id: "s1".to_string(),
            supplier_name: "Beans Co".to_string(),
            items: vec![],
            total_cents: 5000,
            amount_paid_cents: 3000,
            payment_method: PurchasePaymentMethod::Deferred,
            reference: None,
            notes: None,
            date: Utc::now(),
        };
        assert_eq!(purchase.outstanding().cents(), 2000);
    }
}
