//! # Error Types
//!
//! Domain-specific error types for bodega-core.
//!
//! ## Error Hierarchy
//! ```text
//! bodega-core errors (this file)
//! ├── CoreError        - Business rule violations
//! └── ValidationError  - Input validation failures
//!
//! bodega-db errors     - DbError (separate crate)
//! bodega-engine errors - EngineError (wraps all of the above)
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impls)
//! 2. Include context in error messages (product name, quantities, ids)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested more stock than the product's batches hold in aggregate.
    ///
    /// Raised *before* any batch is mutated, so a failed allocation leaves
    /// the product untouched.
    #[error("insufficient stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product: String,
        requested: i64,
        available: i64,
    },

    /// Product has no unit with factor 1.
    ///
    /// Every product must carry exactly one base unit; stock quantities are
    /// stored in that unit.
    #[error("product {product} has no base unit (factor 1)")]
    MissingBaseUnit { product: String },

    /// Validation error (wraps ValidationError).
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements, before any
/// business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field or collection is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Invalid format (e.g. malformed id).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
