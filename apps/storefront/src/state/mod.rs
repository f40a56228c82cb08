//! # State Module
//!
//! Session state, split by concern so each command takes only what it needs.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐           │
//! │  │   DbState    │  │    CartStore     │  │   ConfigState    │           │
//! │  │              │  │                  │  │                  │           │
//! │  │  Database    │  │  Mutex<Cart>     │  │  StorefrontConfig│           │
//! │  │  (SQLite     │  │  + persistence   │  │  + PricingRules  │           │
//! │  │   pool)      │  │  + notifier      │  │                  │           │
//! │  └──────────────┘  └──────────────────┘  └──────────────────┘           │
//! │                                                                         │
//! │  THREAD SAFETY:                                                         │
//! │  • DbState: Database has internal connection pool (thread-safe)         │
//! │  • CartStore: tokio Mutex, held across the persist of each mutation     │
//! │  • ConfigState: Read-only after initialization                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod cart;
mod config;
mod db;

pub use cart::{ActivitySink, CartStore};
pub use config::ConfigState;
pub use db::DbState;
