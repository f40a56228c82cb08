//! # Domain Types
//!
//! Core domain types used throughout the storefront.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │    LineItem     │   │      Order      │   │   PixPayment    │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  id (product)   │   │  id (server)    │   │  qrcode         │        │
//! │  │  name           │   │  order_number   │   │  qrcode_text    │        │
//! │  │  table_price    │   │  status         │   │  expires_at     │        │
//! │  │  quantity       │   │  total          │   │  transaction_id │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐        │
//! │  │      Rate       │   │   OrderStatus   │   │ PaymentMethod   │        │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │        │
//! │  │  bps (u32)      │   │  Pending, Paid  │   │  CreditCard     │        │
//! │  │  3000 = 30%     │   │  Failed, ...    │   │  Pix            │        │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! Orders belong to the remote Order API. The client only keeps the order id
//! and the last snapshot it saw; everything here is plain data.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Catalog product identifier.
pub type ProductId = i64;

// =============================================================================
// Rate
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 3000 bps = 30% (standard reseller discount), 300 bps = 3% (PIX discount)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// 100%.
    pub const FULL: Rate = Rate(10_000);

    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from whole percent.
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        Rate(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A catalog product as offered to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// List price before any reseller discount.
    pub table_price: Money,
}

/// One product line in the cart.
///
/// `quantity` is always at least 1. A line whose quantity would drop to
/// zero is removed by the cart instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub id: ProductId,
    pub name: String,
    pub table_price: Money,
    pub quantity: i64,
}

impl LineItem {
    /// Creates a line with quantity 1.
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            table_price: product.table_price,
            quantity: 1,
        }
    }

    /// `table_price × quantity`, before any discount.
    #[inline]
    pub fn table_total(&self) -> Money {
        self.table_price.multiply_quantity(self.quantity)
    }
}

/// First-order-only starter bundle.
///
/// Charged at list price on top of the discounted cart, never discounted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Kit {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
}

/// A coupon after the Coupon API accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedCoupon {
    pub code: String,
    pub discount: Money,
}

/// Who is paying, as the Payment API expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    /// CPF or CNPJ, digits only.
    pub document: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Order
// =============================================================================

/// Order status as reported by the Order API.
///
/// Statuses this client does not know deserialize to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether an existing order can still be charged.
    #[inline]
    pub const fn is_reusable(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Failed)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// Payment method as sent to the Payment API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    Pix,
}

impl PaymentMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::Pix => "pix",
        }
    }
}

/// An order as returned by the Order API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub status: OrderStatus,
    /// Total in centavos.
    #[serde(default)]
    pub total: Money,
    /// Snapshot taken at creation: items, summary, kit, coupon, credit and
    /// payment metadata.
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub address_id: Option<String>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub installments: Option<u32>,
    /// Raw gateway status string or code from the last reconciliation.
    #[serde(default)]
    pub gateway_status: Option<String>,
}

// =============================================================================
// PIX
// =============================================================================

/// A generated PIX charge waiting to be paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PixPayment {
    /// QR code image URL.
    pub qrcode: String,
    /// Copy-and-paste payload.
    pub qrcode_text: String,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    pub transaction_id: Option<String>,
}

impl PixPayment {
    /// True once `now` is at or past `expires_at`.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let left = self.expires_at - now;
        if left < Duration::zero() {
            Duration::zero()
        } else {
            left
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_constructors() {
        assert_eq!(Rate::from_percent(30).bps(), 3000);
        assert!((Rate::from_bps(350).percentage() - 3.5).abs() < 0.001);
        assert!(Rate::default().is_zero());
    }

    #[test]
    fn test_line_item_table_total() {
        let product = Product {
            id: 3,
            name: "Serum".to_string(),
            table_price: Money::from_cents(12_990),
        };
        let mut line = LineItem::from_product(&product);
        assert_eq!(line.quantity, 1);
        line.quantity = 3;
        assert_eq!(line.table_total().cents(), 38_970);
    }

    #[test]
    fn test_order_status_unknown_fallback() {
        let status: OrderStatus = serde_json::from_str("\"processing\"").unwrap();
        assert_eq!(status, OrderStatus::Unknown);
        let status: OrderStatus = serde_json::from_str("\"failed\"").unwrap();
        assert!(status.is_reusable());
        assert!(!OrderStatus::Paid.is_reusable());
    }

    #[test]
    fn test_order_minimal_payload() {
        let order: Order = serde_json::from_str(r#"{"id":"ord-1","status":"pending"}"#).unwrap();
        assert_eq!(order.id, "ord-1");
        assert_eq!(order.total, Money::zero());
        assert!(order.gateway_status.is_none());
    }

    #[test]
    fn test_payment_method_wire_format() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::CreditCard).unwrap(),
            "\"credit_card\""
        );
        assert_eq!(PaymentMethod::Pix.as_str(), "pix");
    }

    #[test]
    fn test_pix_expiry() {
        let now = Utc::now();
        let pix = PixPayment {
            qrcode: "https://pix.example/qr.png".to_string(),
            qrcode_text: "000201...".to_string(),
            expires_at: now + Duration::minutes(10),
            transaction_id: None,
        };
        assert!(!pix.is_expired(now));
        assert_eq!(pix.remaining(now), Duration::minutes(10));
        assert!(pix.is_expired(now + Duration::minutes(10)));
        assert_eq!(pix.remaining(now + Duration::hours(1)), Duration::zero());
    }
}
