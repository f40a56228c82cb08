//! # Checkout
//!
//! Turns the session's cart into a paid order.
//!
//! ## Checkout Flow
//! ```text
//! Idle ──ensure_order──► OrderCreated ──pay_with_card / pay_with_pix──► Charging
//!
//! Charging ──approved─────────► Approved ──next checkout──► Idle
//!          ──pending / PIX────► PendingAsync ──paid─────► Approved
//!                                             ──expiry───► Expired
//!          ──declined─────────► Failed
//!          ──transport error──► OrderCreated   (same order id)
//!
//! Failed | Expired | PendingAsync ──ensure_order / reset_for_retry──► OrderCreated
//!
//! OrderCreated ──pending order already paid──► Approved   (nothing charged)
//! ```
//!
//! ## Module Organization
//! - [`orchestrator`] - Order creation, charging and reconciliation
//! - [`pix`] - Background polling of a pending payment

pub mod orchestrator;
pub mod pix;

use revenda_core::{CheckoutPhase, CheckoutSession, Money, PaymentMethod, PixPayment};
use serde::{Deserialize, Serialize};

pub use orchestrator::{CheckoutOrchestrator, CheckoutServices, CheckoutTiming, PreparedOrder};
pub use pix::{PixPoller, PollOutcome, PollerHandle};

/// What the user chose at checkout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub address_id: Option<String>,
    pub coupon_code: Option<String>,
    /// Commission credit to apply.
    #[serde(default)]
    pub credit: Money,
    /// Whether the customer has no previous paid order (starter kit).
    #[serde(default)]
    pub is_first_order: bool,
}

/// Gateway-tokenized card payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPayment {
    pub token: String,
    pub installments: u32,
}

/// Result of a charge attempt.
///
/// A declined card is an outcome (phase `failed` with the gateway
/// message), not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    pub phase: CheckoutPhase,
    pub order_id: String,
    pub order_number: Option<String>,
    pub method: PaymentMethod,
    pub amount: Money,
    pub installments: Option<u32>,
    pub pix: Option<PixPayment>,
    pub message: Option<String>,
}

impl CheckoutOutcome {
    pub(crate) fn from_session(
        session: &CheckoutSession,
        prepared: &PreparedOrder,
        method: PaymentMethod,
        installments: Option<u32>,
    ) -> Self {
        CheckoutOutcome {
            phase: session.phase,
            order_id: prepared.order_id.clone(),
            order_number: prepared.order_number.clone(),
            method,
            amount: prepared.quote.amount_for(method),
            installments,
            pix: session.pix.clone(),
            message: session.last_error.clone(),
        }
    }
}
