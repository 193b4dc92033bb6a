//! # bodega-engine: Compound Operations for the bodega POS Engine
//!
//! The orchestration layer over [`bodega_core`] (pure logic) and
//! [`bodega_db`] (persistence): sales, purchases, adjustments, supplier
//! returns, settlement payments, parked sales and cash-drawer sessions.
//!
//! ## Atomicity
//! Every operation here executes inside a single database transaction.
//! Stock mutation, balance movement and record insertion either all commit
//! or all roll back; callers never observe a partial operation. Change
//! notifications go out only after a successful commit.
//!
//! ## Entry Points
//! - [`TransactionEngine`] — sales, purchases, adjustments, returns,
//!   payments, parked sales, stock alerts, the read surface
//! - [`SessionReconciler`] — work sessions and expenses
//! - [`BalanceLedger`] — debit/credit primitives used by both
//!
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("store.db")).await?;
//! let bus = ChangeBus::new();
//! let engine = TransactionEngine::new(db.clone(), bus.clone());
//! let sessions = SessionReconciler::new(db, bus);
//!
//! let sale = engine.complete_sale(draft).await?;
//! ```

pub mod adjustment;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod parked;
pub mod payment;
pub mod purchase;
pub mod sale;
pub mod session;
pub mod supplier_return;

pub use adjustment::AdjustmentDraft;
pub use engine::TransactionEngine;
pub use error::{EngineError, EngineResult};
pub use ledger::BalanceLedger;
pub use purchase::PurchaseDraft;
pub use sale::SaleDraft;
pub use session::SessionReconciler;
pub use supplier_return::SupplierReturnDraft;
