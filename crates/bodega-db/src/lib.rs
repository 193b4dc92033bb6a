//! # bodega-db: Database Layer for the bodega POS Engine
//!
//! All database operations live here, on SQLite via sqlx.
//!
//! ## Responsibilities
//! ```text
//! ✅ RESPONSIBLE FOR                 ❌ NOT RESPONSIBLE FOR
//! ──────────────────                 ─────────────────────
//! Connection pool management         Business logic (bodega-core)
//! SQL query execution                Compound operations (bodega-engine)
//! Schema migrations                  Change notification (bodega-sync)
//! Repository functions
//! ```
//!
//! ## Transactions
//! Repository functions take `&mut SqliteConnection`. Engine operations
//! call [`Database::begin`] once, thread the transaction through every
//! repository call they make, and commit at the end — stock mutation,
//! balance mutation and record insertion land together or not at all.
//!
//! ```rust,ignore
//! let mut tx = db.begin().await?;
//! repository::product::persist_stock(&mut tx, &product).await?;
//! repository::sale::insert(&mut tx, &sale).await?;
//! // (`&mut tx` derefs to `&mut SqliteConnection`)
//! tx.commit().await?;
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
