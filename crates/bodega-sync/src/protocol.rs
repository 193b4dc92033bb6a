//! # Sync Protocol Messages
//!
//! The cross-device contract is deliberately small: whenever a device
//! mutates a table it broadcasts which table changed, and every receiver
//! refetches that table. No payload diffing, no cursors.
//!
//! ## Wire Format
//! Adjacently tagged JSON:
//! ```json
//! { "type": "DATA_CHANGED", "payload": { "table": "supplierReturns" } }
//! ```
//! Table names are camelCase on the wire; that is the published contract
//! other devices already speak.

use serde::{Deserialize, Serialize};

// =============================================================================
// Tables
// =============================================================================

/// Tables covered by change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Table {
    Products,
    Categories,
    Sales,
    Customers,
    Suppliers,
    CustomerPayments,
    SupplierPayments,
    Purchases,
    SupplierReturns,
    Adjustments,
    ParkedSales,
    Users,
    Settings,
    WorkSessions,
    Expenses,
}

impl Table {
    /// The wire name of the table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Products => "products",
            Table::Categories => "categories",
            Table::Sales => "sales",
            Table::Customers => "customers",
            Table::Suppliers => "suppliers",
            Table::CustomerPayments => "customerPayments",
            Table::SupplierPayments => "supplierPayments",
            Table::Purchases => "purchases",
            Table::SupplierReturns => "supplierReturns",
            Table::Adjustments => "adjustments",
            Table::ParkedSales => "parkedSales",
            Table::Users => "users",
            Table::Settings => "settings",
            Table::WorkSessions => "workSessions",
            Table::Expenses => "expenses",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Messages
// =============================================================================

/// All sync protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum SyncMessage {
    /// A table was mutated; receivers should refetch it.
    #[serde(rename = "DATA_CHANGED")]
    DataChanged { table: Table },
}

impl SyncMessage {
    /// Serializes for the wire.
    pub fn to_wire(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parses a wire message.
    pub fn from_wire(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_matches_contract() {
        let message = SyncMessage::DataChanged {
            table: Table::SupplierReturns,
        };

        let wire = message.to_wire().unwrap();
        assert_eq!(
            wire,
            r#"{"type":"DATA_CHANGED","payload":{"table":"supplierReturns"}}"#
        );

        let parsed = SyncMessage::from_wire(&wire).unwrap();
        assert_eq!(parsed, message);
    }

    #[test]
    fn table_names_are_camel_case() {
        assert_eq!(Table::CustomerPayments.as_str(), "customerPayments");
        assert_eq!(Table::WorkSessions.as_str(), "workSessions");
        assert_eq!(Table::Products.as_str(), "products");
    }

    #[test]
    fn unknown_message_type_is_rejected() {
        assert!(SyncMessage::from_wire(r#"{"type":"NOPE","payload":{}}"#).is_err());
    }
}
