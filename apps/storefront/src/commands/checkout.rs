//! # Checkout Commands
//!
//! Thin wrappers over the session's [`CheckoutOrchestrator`].
//!
//! ```text
//! checkout_card ──► OrderCreated ──► Charging ──► Approved | Failed | PendingAsync
//! checkout_pix  ──► OrderCreated ──► Charging ──► PendingAsync (QR code returned)
//! wait_for_payment ──► blocks until PendingAsync resolves (Approved | Expired)
//! retry_order   ──► Failed/Expired order back to OrderCreated
//! ```
//!
//! [`CheckoutOrchestrator`]: crate::checkout::CheckoutOrchestrator

use revenda_core::CheckoutSession;
use tracing::debug;

use crate::checkout::{CardPayment, CheckoutOutcome, CheckoutRequest};
use crate::error::ApiError;
use crate::Session;

/// Charges a gateway card token for the current cart.
pub async fn checkout_card(
    session: &Session,
    request: CheckoutRequest,
    card: CardPayment,
) -> Result<CheckoutOutcome, ApiError> {
    debug!(installments = card.installments, "checkout_card command");
    session.checkout().pay_with_card(&request, &card).await
}

/// Generates a PIX code for the current cart.
pub async fn checkout_pix(
    session: &Session,
    request: CheckoutRequest,
) -> Result<CheckoutOutcome, ApiError> {
    debug!("checkout_pix command");
    session.checkout().pay_with_pix(&request).await
}

pub async fn retry_order(session: &Session) -> Result<CheckoutSession, ApiError> {
    debug!("retry_order command");
    session.checkout().reset_for_retry().await
}

pub async fn get_checkout(session: &Session) -> CheckoutSession {
    session.checkout().session().await
}

/// Waits for a pending payment to be confirmed or to expire.
pub async fn wait_for_payment(session: &Session) -> CheckoutSession {
    debug!("wait_for_payment command");
    session.checkout().wait_until_settled().await;
    session.checkout().session().await
}
