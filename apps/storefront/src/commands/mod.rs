//! # Storefront Commands
//!
//! The operations a front end (or the `revenda` CLI) invokes on a session.
//!
//! ## Command Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Pattern                                      │
//! │                                                                         │
//! │  caller ──► command(&Session, args) ──► Result<Dto, ApiError>           │
//! │                    │                                                    │
//! │                    ├── validate input (nothing sent yet)                │
//! │                    ├── delegate to CartStore / CheckoutOrchestrator     │
//! │                    └── map the result to a serializable DTO             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Commands
//!
//! ### Cart Commands (`cart.rs`)
//! - `get_cart` - Items plus pricing summary
//! - `add_to_cart` - Add one unit of a product
//! - `remove_from_cart` - Remove a line
//! - `update_cart_item` - Set a line's quantity (0 removes)
//! - `clear_cart` - Empty the cart
//!
//! ### Checkout Commands (`checkout.rs`)
//! - `checkout_card` - Create or reuse the order, charge a card token
//! - `checkout_pix` - Create or reuse the order, generate a PIX code
//! - `retry_order` - Make a failed order chargeable again
//! - `get_checkout` - Current checkout session
//! - `wait_for_payment` - Block until a pending payment settles

pub mod cart;
pub mod checkout;

pub use cart::*;
pub use checkout::*;

#[cfg(test)]
pub(crate) mod testing {
    //! A session with no reachable collaborators.

    use std::sync::Arc;

    use async_trait::async_trait;
    use revenda_core::{Money, Order};
    use revenda_db::{Database, DbConfig};
    use revenda_sync::{
        CartActivity, CartTracker, CommerceMirror, CouponApi, CouponValidation, MirrorOrder,
        NewOrder, OrderApi, OrderRef, OrderUpdate, PaymentApi, PaymentRequest, PaymentResponse,
        StorefrontConfig, SyncError, SyncResult,
    };

    use crate::checkout::CheckoutServices;
    use crate::Session;

    pub struct Offline;

    fn unreachable_service<T>() -> SyncResult<T> {
        Err(SyncError::ConnectionFailed("offline".into()))
    }

    #[async_trait]
    impl OrderApi for Offline {
        async fn create_order(&self, _order: NewOrder) -> SyncResult<OrderRef> {
            unreachable_service()
        }
        async fn get_order(&self, _order_id: &str) -> SyncResult<Order> {
            unreachable_service()
        }
        async fn update_order(&self, _order_id: &str, _update: OrderUpdate) -> SyncResult<Order> {
            unreachable_service()
        }
        async fn sync_order(&self, _order_id: &str) -> SyncResult<()> {
            unreachable_service()
        }
        async fn retry_payment(&self, _order_id: &str) -> SyncResult<()> {
            unreachable_service()
        }
    }

    #[async_trait]
    impl PaymentApi for Offline {
        async fn process_payment(&self, _request: PaymentRequest) -> SyncResult<PaymentResponse> {
            unreachable_service()
        }
    }

    #[async_trait]
    impl CouponApi for Offline {
        async fn validate_coupon(&self, _code: &str, _total: Money) -> SyncResult<CouponValidation> {
            unreachable_service()
        }
    }

    #[async_trait]
    impl CommerceMirror for Offline {
        async fn mirror_order(&self, _order: MirrorOrder) -> SyncResult<()> {
            unreachable_service()
        }
    }

    #[async_trait]
    impl CartTracker for Offline {
        async fn record_activity(&self, _activity: CartActivity) -> SyncResult<()> {
            unreachable_service()
        }
        async fn clear(&self, _customer_id: &str) -> SyncResult<()> {
            unreachable_service()
        }
    }

    pub async fn offline_session() -> Session {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let offline = Arc::new(Offline);
        let services = CheckoutServices {
            orders: offline.clone(),
            payments: offline.clone(),
            coupons: offline.clone(),
            mirror: offline.clone(),
        };
        Session::with_services(StorefrontConfig::default(), db, services, offline).await
    }
}
