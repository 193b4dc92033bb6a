//! # Repository Modules
//!
//! One module per table family. Every function takes
//! `&mut SqliteConnection`, so the same code serves a plain pool checkout
//! (reads) and an open transaction (engine writes).
//!
//! ```text
//! product          products
//! sale             sales
//! purchase         purchases
//! adjustment       adjustments
//! supplier_return  supplier_returns
//! party            customers, suppliers, customer_payments, supplier_payments
//! session          work_sessions, expenses
//! parked           parked_sales
//! settings         settings
//! ```

pub mod adjustment;
pub mod parked;
pub mod party;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod session;
pub mod settings;
pub mod supplier_return;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DbResult;

/// Serializes a nested collection for a JSON text column.
pub(crate) fn to_json<T: Serialize>(value: &T) -> DbResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes a JSON text column back into its collection.
pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> DbResult<T> {
    Ok(serde_json::from_str(raw)?)
}
