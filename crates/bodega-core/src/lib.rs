//! # bodega-core: Pure Business Logic for the bodega POS Engine
//!
//! This crate is the heart of the engine. It contains all business logic as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      bodega workspace                               │
//! │                                                                     │
//! │   bodega-engine ── compound operations (sales, purchases, ...)      │
//! │        │                                                            │
//! │        ├──► bodega-db    ── SQLite persistence (sqlx)               │
//! │        ├──► bodega-sync  ── change-notification bus                 │
//! │        │                                                            │
//! │        └──► bodega-core (THIS CRATE)                                │
//! │             types • money • inventory • checkout • alerts           │
//! │                                                                     │
//! │             NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, Purchase, WorkSession, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`inventory`] - Batch ledger primitives (allocate/append/remove)
//! - [`checkout`] - Sale totals math
//! - [`alerts`] - Low-stock and expiry scanning
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output
//! 2. **Integer money**: all monetary values are cents (i64)
//! 3. **Integer stock**: all quantities are whole base units
//! 4. **Explicit errors**: typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod checkout;
pub mod error;
pub mod inventory;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::{BatchDraw, ConsumptionPolicy};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tax rate in basis points (1400 = 14%) when the settings store
/// has no explicit rate.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1400;

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line, in the line's selling unit.
/// Guards against typo quantities (e.g. 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999_999;
