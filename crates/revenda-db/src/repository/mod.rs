//! # Repository Module
//!
//! Database repositories for the storefront's local state.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CartStore / CheckoutOrchestrator                                       │
//! │       │                                                                 │
//! │       │  db.local_state().save_cart(&items)                             │
//! │       ▼                                                                 │
//! │  LocalStateRepository                                                   │
//! │  ├── get_json / put_json / delete                                       │
//! │  ├── load_cart / save_cart                                              │
//! │  └── pending_order_id / payment_in_flight / last_order_snapshot         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (local_state table)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod local_state;
