//! # Stock Alert Scanner
//!
//! Derives low-stock and expiry notifications from current inventory state.
//! Strictly read-only: scanning never mutates a product.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Product;

// =============================================================================
// Configuration
// =============================================================================

/// Thresholds for the scanner. The engine loads overrides from the settings
/// store; these are the fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Low-stock alert when `0 < stock <= threshold` (base units).
    pub low_stock_threshold: i64,
    /// Expiry alert when a batch expires within this many days.
    pub expiry_window_days: i64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            low_stock_threshold: 10,
            expiry_window_days: 30,
        }
    }
}

// =============================================================================
// Alerts
// =============================================================================

/// What triggered an alert for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockAlertKind {
    /// Stock is positive but at or below the threshold.
    LowStock { remaining: i64 },
    /// At least one batch expires within the window; carries the soonest
    /// expiry and the quantity expiring on or before it.
    Expiring {
        soonest_expiry: NaiveDate,
        quantity: i64,
    },
}

/// An alert derived from a product's current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub product_id: String,
    pub product_name: String,
    #[serde(flatten)]
    pub kind: StockAlertKind,
}

/// Scans products for low stock and imminent expiry.
///
/// Emits at most one low-stock and one expiry alert per product.
pub fn scan(products: &[Product], today: NaiveDate, config: &AlertConfig) -> Vec<StockAlert> {
    let horizon = today + chrono::Duration::days(config.expiry_window_days);
    let mut alerts = Vec::new();

    for product in products {
        if product.stock > 0 && product.stock <= config.low_stock_threshold {
            alerts.push(StockAlert {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                kind: StockAlertKind::LowStock {
                    remaining: product.stock,
                },
            });
        }

        let expiring: Vec<_> = product
            .batches
            .iter()
            .filter(|b| b.expiry_date.is_some_and(|d| d <= horizon))
            .collect();
        if let Some(soonest) = expiring.iter().filter_map(|b| b.expiry_date).min() {
            let quantity = expiring.iter().map(|b| b.quantity).sum();
            alerts.push(StockAlert {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                kind: StockAlertKind::Expiring {
                    soonest_expiry: soonest,
                    quantity,
                },
            });
        }
    }

    alerts
}

// =============================================================================
// Unit Tests
// =============================================================================
