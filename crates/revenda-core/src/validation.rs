//! # Validation Module
//!
//! Input validation for cart edits and checkout requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront command (Rust)                                     │
//! │  ├── Type validation (deserialization / CLI parsing)                    │
//! │  └── THIS MODULE: business rule validation                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Order / Payment API (remote)                                  │
//! │  └── Amounts and statuses re-validated server-side before charge        │
//! │                                                                         │
//! │  Everything here runs before any network call.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use revenda_core::validation::{validate_card_token, validate_quantity};
//!
//! validate_quantity(5).unwrap();
//! assert!(validate_card_token("tok_9f8a7b6c").is_ok());
//! assert!(validate_card_token("4111 1111 1111 1111").is_err());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError, ValidationResult};
use crate::money::Money;
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates that a delivery address was selected.
///
/// Returns `CoreError::MissingAddress` so checkout can tell the user to
/// pick one.
pub fn validate_address_id(address_id: Option<&str>) -> CoreResult<String> {
    match address_id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(CoreError::MissingAddress),
    }
}

/// Validates and normalizes a coupon code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens and underscores only
///
/// ## Returns
/// The trimmed, uppercased code.
///
/// ## Example
/// ```rust
/// use revenda_core::validation::validate_coupon_code;
///
/// assert_eq!(validate_coupon_code(" bemvinda10 ").unwrap(), "BEMVINDA10");
/// assert!(validate_coupon_code("10% OFF").is_err());
/// ```
pub fn validate_coupon_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "coupon".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "coupon".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "coupon".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates a gateway card token.
///
/// Tokenization happens in the gateway SDK. Anything that looks like a raw
/// card number (12 to 19 digits once spaces and dashes are removed) is
/// refused.
pub fn validate_card_token(token: &str) -> ValidationResult<()> {
    let token = token.trim();

    if token.is_empty() {
        return Err(ValidationError::Required {
            field: "card_token".to_string(),
        });
    }

    if token.len() > 512 {
        return Err(ValidationError::TooLong {
            field: "card_token".to_string(),
            max: 512,
        });
    }

    let digits: String = token.chars().filter(|c| *c != ' ' && *c != '-').collect();
    if (12..=19).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "card_token".to_string(),
            reason: "raw card numbers are not accepted, send the gateway token".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Cart: Set Quantity                                                     │
/// │                                                                         │
/// │  User enters quantity: 0                                                │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  CartStore::update_quantity treats qty <= 0 as remove, before this      │
/// │       │                                                                 │
/// │  User enters quantity: 5                                                │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                   │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"      │
/// │       └── OK → replace quantity in place                                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a table price. Zero is allowed.
pub fn validate_table_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "table_price".to_string(),
        });
    }
    Ok(())
}

/// Validates the commission credit the user wants to apply.
pub fn validate_credit(credit: Money) -> ValidationResult<()> {
    if credit.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "credit".to_string(),
        });
    }
    Ok(())
}

/// Validates the installment count against the cart's cap.
pub fn validate_installments(requested: u32, max: u32) -> CoreResult<()> {
    if requested == 0 || requested > max {
        return Err(CoreError::InvalidInstallments { requested, max });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
