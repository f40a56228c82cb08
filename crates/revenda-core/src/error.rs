//! # Error Types
//!
//! Domain-specific error types for revenda-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  revenda-core errors (this file)                                        │
//! │  ├── CoreError        - Domain rule violations                          │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  revenda-db errors (separate crate)                                     │
//! │  └── DbError          - Local storage failures                          │
//! │                                                                         │
//! │  revenda-sync errors (separate crate)                                   │
//! │  └── SyncError        - Config, HTTP and API failures                   │
//! │                                                                         │
//! │  Storefront errors (in app)                                             │
//! │  └── ApiError         - What the caller sees (serialized)               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation errors are always raised before any network call, so a
//! `CoreError` never leaves an order half-created.

use thiserror::Error;

use crate::checkout::CheckoutPhase;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Checkout was attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Checkout was attempted without a delivery address.
    #[error("A delivery address must be selected")]
    MissingAddress,

    /// A remove/update targeted a product that is not in the cart.
    #[error("Product {0} is not in the cart")]
    ItemNotInCart(i64),

    /// Cart has exceeded maximum allowed distinct items.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Requested installment count is above what the order total allows.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart total R$ 4.200,00 ──► max_installments = 3
    ///      │
    ///      ▼
    /// Card charge with installments = 6
    ///      │
    ///      ▼
    /// InvalidInstallments { requested: 6, max: 3 }
    /// ```
    #[error("{requested} installments requested, at most {max} allowed")]
    InvalidInstallments { requested: u32, max: u32 },

    /// The checkout state machine refused a transition.
    #[error("Cannot move checkout from {from:?} to {to:?}")]
    IllegalTransition {
        from: CheckoutPhase,
        to: CheckoutPhase,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., a card number where a token was expected).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidInstallments {
            requested: 6,
            max: 3,
        };
        assert_eq!(err.to_string(), "6 installments requested, at most 3 allowed");

        let err = CoreError::IllegalTransition {
            from: CheckoutPhase::Idle,
            to: CheckoutPhase::Approved,
        };
        assert_eq!(err.to_string(), "Cannot move checkout from Idle to Approved");
    }

    #[test]
    fn test_validation_converts_to_core() {
        let err: CoreError = ValidationError::Required {
            field: "address".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(err.to_string(), "Validation error: address is required");
    }
}
