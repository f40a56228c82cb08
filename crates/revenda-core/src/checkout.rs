//! # Checkout State Machine
//!
//! Phases of one checkout session and the transitions between them.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Idle ──ensure_order──► OrderCreated ──charge──► Charging               │
//! │                              ▲                      │                   │
//! │                              │ network error        ├──► Approved       │
//! │                              └──────────────────────┤                   │
//! │                                                     ├──► Failed         │
//! │                                                     │      │            │
//! │                                                     │      └─ retry ──► │
//! │                                                     │      OrderCreated │
//! │                                                     └──► PendingAsync   │
//! │                                                            │            │
//! │                                      poll: paid ◄──────────┤            │
//! │                                      (Approved)            │            │
//! │                                                 expires_at ▼            │
//! │                                                         Expired         │
//! │                                                                         │
//! │  Approved ──► Idle (next checkout)                                      │
//! │  Expired / PendingAsync ──► OrderCreated (new charge, same order)       │
//! │  OrderCreated ──► Approved (order found already paid, no charge)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The order id survives every transition back to `OrderCreated`, so a
//! retry never creates a second order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{PaymentMethod, PixPayment};

// =============================================================================
// Phase
// =============================================================================

/// Where a checkout session is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    /// No order yet.
    Idle,
    /// An order exists and can be charged.
    OrderCreated,
    /// A charge request is in flight.
    Charging,
    /// Paid. Terminal for this order.
    Approved,
    /// Waiting for PIX payment or card review.
    PendingAsync,
    /// The gateway declined the charge.
    Failed,
    /// The PIX code expired unpaid.
    Expired,
}

impl CheckoutPhase {
    /// Phases reachable from this one.
    pub fn allowed_transitions(&self) -> &'static [CheckoutPhase] {
        use CheckoutPhase::*;
        match self {
            Idle => &[OrderCreated],
            OrderCreated => &[Charging, Approved, Idle],
            Charging => &[Approved, PendingAsync, Failed, OrderCreated],
            PendingAsync => &[Approved, Expired, OrderCreated],
            Failed => &[OrderCreated],
            Expired => &[OrderCreated],
            Approved => &[Idle],
        }
    }

    #[inline]
    pub fn can_transition_to(&self, to: CheckoutPhase) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// True for phases where nothing else happens without user action.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, CheckoutPhase::Approved | CheckoutPhase::Expired)
    }
}

impl Default for CheckoutPhase {
    fn default() -> Self {
        CheckoutPhase::Idle
    }
}

/// Checks a transition.
pub fn validate_transition(from: CheckoutPhase, to: CheckoutPhase) -> CoreResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::IllegalTransition { from, to })
    }
}

// =============================================================================
// Session
// =============================================================================

/// State of one checkout session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutSession {
    pub phase: CheckoutPhase,
    pub order_id: Option<String>,
    pub order_number: Option<String>,
    pub method: Option<PaymentMethod>,
    pub pix: Option<PixPayment>,
    /// Message from the last failed charge.
    pub last_error: Option<String>,
}

impl CheckoutSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves to `to` if the state machine allows it.
    pub fn transition(&mut self, to: CheckoutPhase) -> CoreResult<()> {
        validate_transition(self.phase, to)?;
        self.phase = to;
        if to == CheckoutPhase::Idle {
            *self = CheckoutSession::new();
        }
        Ok(())
    }

    /// Idle → OrderCreated with the order's identity.
    pub fn order_created(&mut self, order_id: String, order_number: Option<String>) -> CoreResult<()> {
        self.transition(CheckoutPhase::OrderCreated)?;
        self.order_id = Some(order_id);
        self.order_number = order_number;
        Ok(())
    }

    /// OrderCreated → Charging.
    pub fn start_charge(&mut self, method: PaymentMethod) -> CoreResult<()> {
        self.transition(CheckoutPhase::Charging)?;
        self.method = Some(method);
        self.last_error = None;
        Ok(())
    }

    /// Charging → Failed, keeping the gateway message.
    pub fn declined(&mut self, message: String) -> CoreResult<()> {
        self.transition(CheckoutPhase::Failed)?;
        self.last_error = Some(message);
        Ok(())
    }

    /// Charging → OrderCreated after a transport or validation error.
    pub fn charge_errored(&mut self, message: String) -> CoreResult<()> {
        self.transition(CheckoutPhase::OrderCreated)?;
        self.last_error = Some(message);
        Ok(())
    }

    /// Charging → PendingAsync, with the PIX code when there is one.
    pub fn awaiting_payment(&mut self, pix: Option<PixPayment>) -> CoreResult<()> {
        self.transition(CheckoutPhase::PendingAsync)?;
        self.pix = pix;
        Ok(())
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
