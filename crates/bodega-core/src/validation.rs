//! # Validation Module
//!
//! Input validation for engine operations. Runs before any business logic
//! so malformed input fails fast, with the database's NOT NULL / CHECK
//! constraints as the final backstop.

use crate::error::ValidationError;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier & String Validators
// =============================================================================

/// Validates that a referenced id is present and non-blank.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a free-text reason/notes field.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    if reason.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity (in the line's selling unit).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a unit factor (base units per selling unit).
pub fn validate_unit_factor(factor: i64) -> ValidationResult<()> {
    if factor < 1 {
        return Err(ValidationError::OutOfRange {
            field: "unit factor".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates an amount that must be strictly positive (payments, expenses).
pub fn validate_positive_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an amount that must not be negative (floats, amounts paid).
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates that an operation carries at least one line and no more than
/// the cart cap.
pub fn validate_line_count(field: &str, count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if count > MAX_CART_LINES {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_CART_LINES as i64,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
