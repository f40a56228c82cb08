//! # API Error Type
//!
//! Unified error type for storefront commands.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Storefront                         │
//! │                                                                         │
//! │  Command Function  ── Result<T, ApiError> ──►  caller / CLI             │
//! │         │                                                               │
//! │         ├── CoreError   (empty cart, address, installments) ─┐          │
//! │         ├── DbError     (local state)                        ├─► ApiError│
//! │         └── SyncError   (Order / Payment / Coupon APIs)     ─┘          │
//! │                                                                         │
//! │  { "code": "PAYMENT_ERROR", "message": "Cartão recusado" }              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use revenda_core::{CoreError, ValidationError};
use revenda_db::DbError;
use revenda_sync::SyncError;
use serde::Serialize;

/// Error returned from storefront commands.
///
/// ```json
/// {
///   "code": "VALIDATION_ERROR",
///   "message": "A delivery address must be selected"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed, nothing was sent
    ValidationError,

    /// Local storage failed
    DatabaseError,

    /// Business rule refused the operation
    BusinessLogic,

    /// Cart operation failed
    CartError,

    /// The charge did not go through
    PaymentError,

    /// A collaborator could not be reached
    Network,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn business(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BusinessLogic, message)
    }

    pub fn payment(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::PaymentError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// A charge call failed. Keeps the gateway's message when it sent one.
    pub fn from_charge(err: &SyncError) -> Self {
        let code = match err {
            SyncError::ConnectionFailed(_) | SyncError::Timeout(_) => ErrorCode::Network,
            _ => ErrorCode::PaymentError,
        };
        ApiError::new(code, err.user_message())
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::Busy => ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again"),
            DbError::Corrupt { key, reason } => {
                tracing::error!(key = %key, reason = %reason, "Corrupt local state");
                ApiError::new(ErrorCode::DatabaseError, "Stored state is unreadable")
            }
            DbError::QueryFailed(e) | DbError::Internal(e) => {
                tracing::error!("Database operation failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::EmptyCart | CoreError::MissingAddress => ApiError::validation(err.to_string()),
            CoreError::ItemNotInCart(id) => ApiError::not_found("Cart item", &id.to_string()),
            CoreError::CartTooLarge { .. } => ApiError::new(ErrorCode::CartError, err.to_string()),
            CoreError::QuantityTooLarge { .. } | CoreError::InvalidInstallments { .. } => {
                ApiError::validation(err.to_string())
            }
            CoreError::IllegalTransition { .. } => ApiError::business(err.to_string()),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match &err {
            SyncError::NotFound(path) => ApiError::not_found("Resource", path),
            SyncError::ConnectionFailed(_) | SyncError::Timeout(_) => {
                ApiError::new(ErrorCode::Network, err.user_message())
            }
            SyncError::Api { message, .. } => ApiError::business(message.clone()),
            e if e.is_config_error() => ApiError::internal(e.to_string()),
            e => {
                tracing::error!("Collaborator call failed: {}", e);
                ApiError::internal("Unexpected response from the server")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
