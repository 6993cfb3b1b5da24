//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Sale rule violations (NotFound, InvalidAddOn,  │
//! │  │                      InsufficientStock, Forbidden, InvalidInput)    │
//! │  └── ValidationError  - Structural payload failures                    │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── EngineError      - CoreError | PersistenceFailure                 │
//! │                                                                         │
//! │  till-server errors                                                    │
//! │  └── ApiError         - What HTTP clients see (code + message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → ApiError → Client   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant that concerns a sale line names the offending product or
//! request field, so the message can be shown to the cashier as-is.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Sale engine business-rule errors.
///
/// All of these are detected before any write happens, except
/// `InsufficientStock`, which the stock ledger can also raise from inside
/// the transaction when a concurrent sale won the race.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced product, sale, sale line or payment method is absent.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// Structural violation in the submitted payload.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// An add-on is unknown, malformed, or not allowed for the product.
    ///
    /// ## When This Occurs
    /// - `additionalId` does not resolve to an add-on
    /// - add-on quantity/price is malformed
    /// - the add-on's category is not linked to the product
    #[error("Invalid add-on for product {product}: {reason}")]
    InvalidAddOn { product: String, reason: String },

    /// Insufficient stock to complete the sale or edit.
    ///
    /// ## User Workflow
    /// ```text
    /// Post sale (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Burger", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Caller role or ownership does not allow the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        CoreError::NotFound { entity, id }
    }

    /// Creates an InvalidAddOn error.
    pub fn invalid_add_on(product: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidAddOn {
            product: product.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// `field` is the request path of the offending value, e.g.
/// `items[1].quantity`, so clients can point at the line.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (not a number, not an integer, not a boolean).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., same sale line edited twice).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    pub(crate) fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
