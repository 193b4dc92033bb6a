//! # Parked Sale Operations
//!
//! Suspending a cart to serve another customer, and resuming it later.
//! Parking is pure record-keeping: stock and balances move only when the
//! retrieved cart completes as a sale.

use chrono::Utc;
use tracing::{info, instrument};

use bodega_core::validation::{validate_id, validate_line_count, validate_quantity};
use bodega_core::{Money, ParkedSale, SaleItem};
use bodega_db::repository;
use bodega_sync::Table;

use crate::engine::TransactionEngine;
use crate::error::EngineResult;

impl TransactionEngine {
    /// Parks the current cart under a customer.
    #[instrument(skip(self, items), fields(customer = %customer_id))]
    pub async fn park_sale(
        &self,
        items: Vec<SaleItem>,
        customer_id: &str,
        notes: Option<String>,
    ) -> EngineResult<ParkedSale> {
        validate_line_count("cart items", items.len())?;
        validate_id("customer", customer_id)?;
        for item in &items {
            validate_quantity(item.quantity)?;
        }

        let total: Money = items.iter().map(SaleItem::line_total).sum();

        let parked = ParkedSale {
            id: Self::new_id(),
            items,
            customer_id: customer_id.to_string(),
            notes,
            total_cents: total.cents(),
            date: Utc::now(),
        };

        let mut tx = self.db.begin().await?;
        repository::parked::insert(&mut tx, &parked).await?;
        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::ParkedSales);

        info!(parked = %parked.id, "sale parked");
        Ok(parked)
    }

    /// Retrieves a parked sale, removing it from the parked list and
    /// returning the cart to the caller. Fetch and delete are atomic, so
    /// two cashiers cannot both resume the same cart.
    #[instrument(skip(self))]
    pub async fn retrieve_parked_sale(&self, parked_id: &str) -> EngineResult<ParkedSale> {
        let mut tx = self.db.begin().await?;

        let parked = repository::parked::fetch(&mut tx, parked_id)
            .await?
            .ok_or_else(|| bodega_db::DbError::not_found("parked sale", parked_id))?;
        repository::parked::delete(&mut tx, parked_id).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::ParkedSales);

        info!(parked = %parked_id, "parked sale retrieved");
        Ok(parked)
    }

    /// Discards a parked sale without resuming it.
    #[instrument(skip(self))]
    pub async fn discard_parked_sale(&self, parked_id: &str) -> EngineResult<()> {
        let mut tx = self.db.begin().await?;
        repository::parked::delete(&mut tx, parked_id).await?;
        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::ParkedSales);

        info!(parked = %parked_id, "parked sale discarded");
        Ok(())
    }
}
