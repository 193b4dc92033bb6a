//! # Engine Error Types
//!
//! The failure taxonomy callers of the engine see. Every error is typed,
//! surfaced synchronously, and reported after the operation's transaction
//! has rolled back — a failed operation leaves no partial mutation behind.
//!
//! No operation retries internally: all operations are deterministic given
//! their inputs and the persisted state, so the only recovery path is the
//! caller deciding what to do with the typed failure.

use thiserror::Error;

use bodega_core::{CoreError, ValidationError};
use bodega_db::DbError;

/// Failures surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing input (empty line list, blank reference,
    /// negative amount, ...).
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An item requested more than the product's aggregate available stock.
    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    /// A referenced record (sale, purchase, customer, ...) is absent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation is not valid in the current lifecycle state, e.g.
    /// starting a session while one is active.
    #[error("invalid state: {0}")]
    State(String),

    /// A concurrent writer updated a record between this operation's read
    /// and its guarded write. The operation rolled back; re-read and retry
    /// is the caller's decision.
    #[error("conflicting concurrent update for {entity} {id}")]
    Conflict { entity: String, id: String },

    /// Database failure not attributable to the caller's input.
    #[error(transparent)]
    Db(DbError),
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::Conflict { entity, id } => EngineError::Conflict { entity, id },
            other => EngineError::Db(other),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InsufficientStock {
                product,
                requested,
                available,
            } => EngineError::InsufficientStock {
                product,
                requested,
                available,
            },
            CoreError::Validation(v) => EngineError::Validation(v),
            CoreError::MissingBaseUnit { product } => {
                EngineError::Validation(ValidationError::InvalidFormat {
                    field: "units".to_string(),
                    reason: format!("product {product} has no base unit"),
                })
            }
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================
