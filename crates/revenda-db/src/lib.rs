//! # revenda-db: Local State Storage for the Storefront
//!
//! Durable client-side state on SQLite via sqlx. The storefront keeps very
//! little locally: the cart, the id of the order being paid, the charge in
//! flight and the last order snapshot it saw. Everything else belongs to the
//! remote Order API.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront Data Flow                             │
//! │                                                                         │
//! │  CartStore::add_to_cart / CheckoutOrchestrator::ensure_order            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     revenda-db (THIS CRATE)                     │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌──────────────────┐   ┌──────────────┐  │    │
//! │  │   │   Database    │    │   Repositories   │   │  Migrations  │  │    │
//! │  │   │   (pool.rs)   │◄───│ LocalStateRepo   │   │  (embedded)  │  │    │
//! │  │   └───────────────┘    └──────────────────┘   └──────────────┘  │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ~/.local/share/storefront/storefront.db                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - The local state repository
//!
//! ## Usage
//!
//! ```rust,ignore
//! use revenda_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("storefront.db")).await?;
//! let items = db.local_state().load_cart().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::local_state::{keys, LocalStateRepository, PaymentInFlight};
