//! # revenda-sync: External Collaborators
//!
//! Everything that leaves the machine: the Order, Payment and Coupon APIs,
//! the commerce mirror and the abandoned-cart tracker.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         revenda-sync                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌─────────────────────┐  │
//! │  │ config           │   │ api              │   │ notifier            │  │
//! │  │                  │   │                  │   │                     │  │
//! │  │ TOML + env       │──►│ traits + DTOs    │◄──│ debounced cart      │  │
//! │  │ [api] [pricing]  │   │ HttpClient       │   │ activity (mpsc)     │  │
//! │  │ [checkout]       │   │ (reqwest)        │   │                     │  │
//! │  └──────────────────┘   └──────────────────┘   └─────────────────────┘  │
//! │                                                                         │
//! │  Must-succeed: OrderApi, PaymentApi, CouponApi                          │
//! │  Best-effort:  CommerceMirror, CartTracker (retried, then logged)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`api`] - Collaborator traits, DTOs and the reqwest client
//! - [`config`] - Storefront configuration (file, env, defaults)
//! - [`error`] - Collaborator error types
//! - [`notifier`] - Debounced abandoned-cart telemetry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use revenda_sync::{CartActivityNotifier, HttpClient, StorefrontConfig};
//!
//! let config = StorefrontConfig::load_or_default(None);
//! let client = Arc::new(HttpClient::new(&config.api)?);
//!
//! let notifier = CartActivityNotifier::new(client.clone(), config.checkout.cart_debounce())
//!     .start();
//! let order = client.get_order("ord-1").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod config;
pub mod error;
pub mod notifier;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::{
    CardData, CartActivity, CartTracker, CommerceMirror, CouponApi, CouponValidation,
    HttpClient, MirrorOrder, NewOrder, OrderApi, OrderRef, OrderUpdate, PaymentApi,
    PaymentRequest, PaymentResponse, PixData,
};
pub use config::{ApiSettings, CheckoutSettings, PricingSettings, StorefrontConfig};
pub use error::{SyncError, SyncResult};
pub use notifier::{CartActivityNotifier, NotifierHandle};
