//! # Transaction Engine
//!
//! The orchestrator for every compound mutation: sales, purchases,
//! adjustments, supplier returns, settlement payments and parked sales.
//!
//! ## Operation Shape
//! Every operation follows the same discipline:
//! ```text
//! validate input
//!    │
//!    ▼
//! begin one transaction
//!    │  read → validate against state → mutate → persist records
//!    ▼
//! commit  ──fail──► rollback, surface typed error, nothing changed
//!    │
//!    ▼
//! notify(table) per touched table
//! ```
//! Notifications go out only after a successful commit, so receivers never
//! refetch state that is about to roll back.

use chrono::Utc;
use uuid::Uuid;

use bodega_core::alerts::{self, StockAlert};
use bodega_core::{
    Adjustment, Customer, CustomerPayment, ParkedSale, Product, Purchase, Sale, Supplier,
    SupplierPayment, SupplierReturn,
};
use bodega_db::repository;
use bodega_db::Database;
use bodega_sync::{ChangeBus, Table};

use crate::error::EngineResult;

/// The transaction engine. Cheap to clone; clones share the pool and bus.
#[derive(Debug, Clone)]
pub struct TransactionEngine {
    pub(crate) db: Database,
    pub(crate) bus: ChangeBus,
}

impl TransactionEngine {
    /// Creates an engine over a database and a change bus.
    pub fn new(db: Database, bus: ChangeBus) -> Self {
        TransactionEngine { db, bus }
    }

    /// Announces a committed mutation of `table`.
    pub(crate) fn notify(&self, table: Table) {
        self.bus.notify(table);
    }

    /// Generates a record id.
    pub(crate) fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    // =========================================================================
    // Read Surface
    // =========================================================================
    // Listing queries consumed by pages; no mutation, no transaction.

    /// Current product list with aggregate stock.
    pub async fn list_products(&self) -> EngineResult<Vec<Product>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::product::list(&mut conn).await?)
    }

    /// Sale history, newest first.
    pub async fn list_sales(&self) -> EngineResult<Vec<Sale>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::sale::list(&mut conn).await?)
    }

    /// Purchase history, newest first.
    pub async fn list_purchases(&self) -> EngineResult<Vec<Purchase>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::purchase::list(&mut conn).await?)
    }

    /// Adjustment history, newest first.
    pub async fn list_adjustments(&self) -> EngineResult<Vec<Adjustment>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::adjustment::list(&mut conn).await?)
    }

    /// Supplier return history, newest first.
    pub async fn list_supplier_returns(&self) -> EngineResult<Vec<SupplierReturn>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::supplier_return::list(&mut conn).await?)
    }

    /// All customers with current balances.
    pub async fn list_customers(&self) -> EngineResult<Vec<Customer>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::party::list_customers(&mut conn).await?)
    }

    /// All suppliers with current balances.
    pub async fn list_suppliers(&self) -> EngineResult<Vec<Supplier>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::party::list_suppliers(&mut conn).await?)
    }

    /// Parked sales, newest first.
    pub async fn list_parked_sales(&self) -> EngineResult<Vec<ParkedSale>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::parked::list(&mut conn).await?)
    }

    /// Settlement payments recorded for one customer.
    pub async fn list_customer_payments(
        &self,
        customer_id: &str,
    ) -> EngineResult<Vec<CustomerPayment>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::party::list_customer_payments(&mut conn, customer_id).await?)
    }

    /// Settlement payments recorded for one supplier.
    pub async fn list_supplier_payments(
        &self,
        supplier_id: &str,
    ) -> EngineResult<Vec<SupplierPayment>> {
        let mut conn = self.db.acquire().await?;
        Ok(repository::party::list_supplier_payments(&mut conn, supplier_id).await?)
    }

    // =========================================================================
    // Stock Alerts
    // =========================================================================

    /// Derives low-stock and expiry alerts from current inventory.
    ///
    /// Thresholds come from the settings store, falling back to the
    /// defaults. Read-only.
    pub async fn scan_stock_alerts(&self) -> EngineResult<Vec<StockAlert>> {
        let mut conn = self.db.acquire().await?;
        let config = repository::settings::alert_config(&mut conn).await?;
        let products = repository::product::list(&mut conn).await?;

        let today = Utc::now().date_naive();
        Ok(alerts::scan(&products, today, &config))
    }
}
