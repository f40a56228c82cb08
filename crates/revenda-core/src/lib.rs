//! # revenda-core: Pure Business Logic for the Reseller Storefront
//!
//! This crate holds the storefront's pricing and checkout rules as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Revenda Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                 Storefront (Session + CLI)                      │    │
//! │  │    CartStore ──► CheckoutOrchestrator ──► PixPoller             │    │
//! │  └─────────────────────────────┬───────────────────────────────────┘    │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐    │
//! │  │               ★ revenda-core (THIS CRATE) ★                     │    │
//! │  │                                                                 │    │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐  │    │
//! │  │   │  money  │ │ pricing │ │  cart   │ │ checkout │ │  quote  │  │    │
//! │  │   │  Money  │ │ 2-pass  │ │ LineItem│ │  phases  │ │ kit,    │  │    │
//! │  │   │  Rate   │ │ tiers   │ │ limits  │ │  FSM     │ │ coupon  │  │    │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └──────────┘ └─────────┘  │    │
//! │  │                                                                 │    │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                  │                               │                      │
//! │  ┌───────────────▼──────────────┐  ┌─────────────▼──────────────────┐   │
//! │  │ revenda-db (local state)     │  │ revenda-sync (HTTP APIs)       │   │
//! │  └──────────────────────────────┘  └────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type in integer centavos
//! - [`types`] - Domain types (LineItem, Order, PixPayment, Rate, ...)
//! - [`pricing`] - Two-pass tier pricing and the discount rule table
//! - [`cart`] - The cart and its invariants
//! - [`quote`] - Kit, coupon and credit on top of the priced cart
//! - [`payment_status`] - The "is this paid?" predicate
//! - [`checkout`] - Checkout phases and transitions
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use revenda_core::{Cart, Money, PricingRules, Product};
//!
//! let mut cart = Cart::new();
//! cart.add_product(&Product {
//!     id: 1,
//!     name: "Creme".to_string(),
//!     table_price: Money::from_reais(100, 0),
//! })
//! .unwrap();
//!
//! let summary = cart.summary(&PricingRules::default());
//! assert_eq!(summary.total_with_discount, Money::from_reais(70, 0));
//! assert_eq!(summary.total_with_pix, Money::from_cents(6_790));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod payment_status;
pub mod pricing;
pub mod quote;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::Cart;
pub use checkout::{validate_transition, CheckoutPhase, CheckoutSession};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use payment_status::{is_order_paid, is_paid_status};
pub use pricing::{compute_summary, DiscountRule, PricingRules, PricingSummary, ProductRule};
pub use quote::ChargeQuote;
pub use types::*;

// =============================================================================
// Constants
// =============================================================================

/// Maximum number of distinct products in a cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart.
pub const MAX_ITEM_QUANTITY: i64 = 999;
