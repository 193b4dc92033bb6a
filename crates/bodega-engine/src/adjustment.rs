//! # Adjustment Operations
//!
//! Manual stock corrections: damaged goods, waste, counting corrections.
//!
//! A positive quantity change appends a fresh batch; a negative change
//! consumes batches LIFO — the newest stock is assumed to be what went bad
//! or was miscounted. The reason is classification metadata only.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use bodega_core::validation::{validate_line_count, validate_unit_factor};
use bodega_core::{Adjustment, AdjustmentItem, AdjustmentReason, ConsumptionPolicy, Product, ValidationError};
use bodega_db::repository;
use bodega_sync::Table;

use crate::engine::TransactionEngine;
use crate::error::EngineResult;

// =============================================================================
// Draft
// =============================================================================

/// Input for recording a stock adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentDraft {
    pub items: Vec<AdjustmentItem>,
    pub reason: AdjustmentReason,
    pub notes: Option<String>,
}

// =============================================================================
// Operations
// =============================================================================

impl TransactionEngine {
    /// Records a stock adjustment.
    ///
    /// A negative line that exceeds the product's aggregate stock fails
    /// the whole adjustment with `InsufficientStock`; nothing is applied.
    #[instrument(skip(self, draft), fields(reason = draft.reason.as_str()))]
    pub async fn record_adjustment(&self, draft: AdjustmentDraft) -> EngineResult<Adjustment> {
        validate_line_count("adjustment items", draft.items.len())?;
        for item in &draft.items {
            if item.quantity_change == 0 {
                return Err(ValidationError::MustBePositive {
                    field: "quantity change".to_string(),
                }
                .into());
            }
            validate_unit_factor(item.unit_factor)?;
        }

        let mut tx = self.db.begin().await?;

        let mut staged: HashMap<String, Product> = HashMap::new();
        for item in &draft.items {
            if !staged.contains_key(&item.product_id) {
                let product = repository::product::get(&mut tx, &item.product_id).await?;
                staged.insert(item.product_id.clone(), product);
            }
        }
        for item in &draft.items {
            if let Some(product) = staged.get_mut(&item.product_id) {
                let change = item.base_units();
                if change > 0 {
                    product.append_batch(change, None, None)?;
                } else {
                    product.allocate(-change, ConsumptionPolicy::Lifo)?;
                }
            }
        }
        for product in staged.values() {
            repository::product::persist_stock(&mut tx, product).await?;
        }

        let adjustment = Adjustment {
            id: Self::new_id(),
            items: draft.items,
            reason: draft.reason,
            notes: draft.notes,
            date: Utc::now(),
        };
        repository::adjustment::insert(&mut tx, &adjustment).await?;

        tx.commit().await.map_err(bodega_db::DbError::from)?;

        self.notify(Table::Products);
        self.notify(Table::Adjustments);

        info!(adjustment = %adjustment.id, reason = adjustment.reason.as_str(), "adjustment recorded");
        Ok(adjustment)
    }
}
