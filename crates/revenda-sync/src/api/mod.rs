//! # Collaborator APIs
//!
//! Traits for every external service the storefront talks to, plus the JSON
//! bodies they exchange.
//!
//! ## Collaborators
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Storefront Collaborators                          │
//! │                                                                         │
//! │  Checkout orchestrator                      Cart store                  │
//! │     │        │        │         │                │                      │
//! │     ▼        ▼        ▼         ▼                ▼                      │
//! │  OrderApi PaymentApi CouponApi CommerceMirror  CartTracker              │
//! │  (must)   (must)     (must)    (best effort)   (best effort)            │
//! │     │        │        │         │                │                      │
//! │     └────────┴────────┴─────────┴────────────────┘                      │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                 HttpClient (JSON over HTTPS)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every trait is `Send + Sync` and used as `Arc<dyn Trait>`, so tests swap
//! in fakes without an HTTP server.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use revenda_core::{AppliedCoupon, Customer, LineItem, Money, Order, PaymentMethod, PixPayment};
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

pub use http::HttpClient;

// =============================================================================
// Order DTOs
// =============================================================================

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub items: Vec<LineItem>,
    pub total: Money,
    pub address_id: String,
    /// Priced snapshot: summary, quote, kit, coupon and credit.
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
}

/// Identity of a freshly created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    pub id: String,
    #[serde(default)]
    pub order_number: Option<String>,
}

/// Body of `PUT /orders/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
}

impl OrderUpdate {
    pub fn is_empty(&self) -> bool {
        self == &OrderUpdate::default()
    }
}

// =============================================================================
// Payment DTOs
// =============================================================================

/// Gateway-issued card token. Raw card numbers never get here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    pub token: String,
}

/// Body of `POST /payments/process`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Amount in centavos.
    pub amount: Money,
    pub order_id: String,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_data: Option<CardData>,
    pub customer: Customer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
    /// Sent as the `Idempotency-Key` header, not in the body.
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

/// PIX code returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixData {
    pub qrcode: String,
    #[serde(alias = "qrcode_text")]
    pub qrcode_text: String,
    #[serde(default, alias = "expires_at")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "transaction_id")]
    pub transaction_id: Option<String>,
}

impl PixData {
    /// Converts to a payment, defaulting the expiry to `now + default_ttl`
    /// when the gateway sent none.
    pub fn into_payment(self, now: DateTime<Utc>, default_ttl: Duration) -> PixPayment {
        PixPayment {
            qrcode: self.qrcode,
            qrcode_text: self.qrcode_text,
            expires_at: self.expires_at.unwrap_or(now + default_ttl),
            transaction_id: self.transaction_id,
        }
    }
}

/// Response of `POST /payments/process`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub success: bool,
    /// Gateway status, e.g. `approved`, `pending`, `5`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub pix: Option<PixData>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

// =============================================================================
// Coupon DTOs
// =============================================================================

/// Response of `POST /coupons/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponValidation {
    pub valid: bool,
    #[serde(default)]
    pub code: String,
    /// Discount in centavos for the given order total.
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub message: Option<String>,
}

impl CouponValidation {
    /// The applied coupon, if the API accepted it.
    pub fn into_applied(self, requested_code: &str) -> Option<AppliedCoupon> {
        if !self.valid {
            return None;
        }
        let code = if self.code.is_empty() {
            requested_code.to_string()
        } else {
            self.code
        };
        Some(AppliedCoupon {
            code,
            discount: self.discount.non_negative(),
        })
    }
}

// =============================================================================
// Advisory DTOs
// =============================================================================

/// Body of `POST /commerce/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorOrder {
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    /// Commerce status: `processing` once paid, `on-hold` while a PIX code
    /// waits.
    pub status: String,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub items: Vec<LineItem>,
    pub customer_id: String,
}

impl MirrorOrder {
    pub const STATUS_PROCESSING: &'static str = "processing";
    pub const STATUS_ON_HOLD: &'static str = "on-hold";
}

/// Body of `POST /abandoned-carts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartActivity {
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub item_count: i64,
}

// =============================================================================
// Traits
// =============================================================================

/// The Order API.
#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> SyncResult<OrderRef>;

    async fn get_order(&self, order_id: &str) -> SyncResult<Order>;

    async fn update_order(&self, order_id: &str, update: OrderUpdate) -> SyncResult<Order>;

    /// Asks the Order API to reconcile the order with the gateway.
    async fn sync_order(&self, order_id: &str) -> SyncResult<()>;

    /// Resets a failed order so it can be charged again.
    async fn retry_payment(&self, order_id: &str) -> SyncResult<()>;
}

/// The Payment API.
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn process_payment(&self, request: PaymentRequest) -> SyncResult<PaymentResponse>;
}

/// The Coupon API.
#[async_trait]
pub trait CouponApi: Send + Sync {
    async fn validate_coupon(&self, code: &str, order_total: Money) -> SyncResult<CouponValidation>;
}

/// The external commerce system orders are mirrored into.
#[async_trait]
pub trait CommerceMirror: Send + Sync {
    async fn mirror_order(&self, order: MirrorOrder) -> SyncResult<()>;
}

/// Abandoned-cart tracking.
#[async_trait]
pub trait CartTracker: Send + Sync {
    async fn record_activity(&self, activity: CartActivity) -> SyncResult<()>;

    async fn clear(&self, customer_id: &str) -> SyncResult<()>;
}
