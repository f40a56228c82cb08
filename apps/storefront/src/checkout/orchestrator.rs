//! # Checkout Orchestrator
//!
//! Drives one session's checkout: creates (or reuses) the order, charges
//! it, and reconciles asynchronous payments.
//!
//! ## Charge Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Charge Sequence                                      │
//! │                                                                         │
//! │  1. Validate ─────────────────────────────────────────────────────────► │
//! │     • cart not empty, address selected, installments <= cap             │
//! │     • card token is a gateway token, customer configured                │
//! │     • nothing has touched the network yet                               │
//! │                                                                         │
//! │  2. Ensure order ─────────────────────────────────────────────────────► │
//! │     • pending order id persisted? GET it                                │
//! │         pending/failed ──► reuse (PUT if the quote changed)             │
//! │         already paid   ──► approve it, skip the charge                  │
//! │         anything else  ──► discard                                      │
//! │         lookup failed  ──► log, create fresh                            │
//! │     • otherwise POST /orders, persist the new id                        │
//! │                                                                         │
//! │  3. Charge ───────────────────────────────────────────────────────────► │
//! │     • persist in-flight payment (attempt id = idempotency key)          │
//! │     • POST /payments/process                                            │
//! │                                                                         │
//! │  4. Settle ───────────────────────────────────────────────────────────► │
//! │     • approved  ──► snapshot, clear cart, clear pending state, mirror   │
//! │     • pending   ──► PixPoller until paid or expired                     │
//! │     • declined  ──► Failed, gateway message kept                        │
//! │     • error     ──► OrderCreated, same order id                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every public operation holds the session mutex for its whole duration,
//! so a session never has two orders or two charges in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use revenda_core::validation::{
    validate_address_id, validate_card_token, validate_coupon_code, validate_credit,
    validate_installments,
};
use revenda_core::{
    is_order_paid, is_paid_status, AppliedCoupon, ChargeQuote, CheckoutPhase, CheckoutSession,
    CoreError, CoreResult, Customer, Kit, LineItem, Money, Order, OrderStatus, PaymentMethod,
    PricingSummary, ValidationError,
};
use revenda_db::{LocalStateRepository, PaymentInFlight};
use revenda_sync::{
    CardData, CheckoutSettings, CommerceMirror, CouponApi, HttpClient, MirrorOrder, NewOrder,
    OrderApi, OrderRef, OrderUpdate, PaymentApi, PaymentRequest, PaymentResponse,
};
use serde_json::json;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use super::pix::{PixPoller, PollOutcome, PollerHandle};
use super::{CardPayment, CheckoutOutcome, CheckoutRequest};
use crate::error::ApiError;
use crate::state::{CartStore, ConfigState};

// =============================================================================
// Collaborators
// =============================================================================

/// The services a checkout talks to.
#[derive(Clone)]
pub struct CheckoutServices {
    pub orders: Arc<dyn OrderApi>,
    pub payments: Arc<dyn PaymentApi>,
    pub coupons: Arc<dyn CouponApi>,
    pub mirror: Arc<dyn CommerceMirror>,
}

impl CheckoutServices {
    /// Every service backed by one HTTP client.
    pub fn http(client: Arc<HttpClient>) -> Self {
        CheckoutServices {
            orders: client.clone(),
            payments: client.clone(),
            coupons: client.clone(),
            mirror: client,
        }
    }
}

/// Polling cadence and PIX expiry fallback.
#[derive(Debug, Clone, Copy)]
pub struct CheckoutTiming {
    pub poll_interval: Duration,
    /// Used when the gateway does not say when a PIX code expires.
    pub pix_default_ttl: chrono::Duration,
}

impl From<&CheckoutSettings> for CheckoutTiming {
    fn from(settings: &CheckoutSettings) -> Self {
        CheckoutTiming {
            poll_interval: settings.pix_poll_interval(),
            pix_default_ttl: settings.pix_default_ttl(),
        }
    }
}

/// An order ready to be charged.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedOrder {
    pub order_id: String,
    pub order_number: Option<String>,
    pub items: Vec<LineItem>,
    pub quote: ChargeQuote,
    pub address_id: String,
    /// Snapshot sent with the order.
    pub details: serde_json::Value,
    /// True when an existing pending order was reused.
    pub reused: bool,
    /// True when the pending order turned out to be paid already. The
    /// session is then `Approved` and there is nothing to charge.
    pub already_paid: bool,
}

/// What became of the persisted pending order.
enum PendingOrder {
    Reusable(OrderRef),
    Paid(Order),
    /// Missing, unreadable or no longer chargeable.
    Gone,
}

/// A charge waiting on the poller.
struct PendingCharge {
    generation: u64,
    prepared: PreparedOrder,
    method: PaymentMethod,
    installments: Option<u32>,
    /// None only for an order approved outside a charge with no customer
    /// configured. Such an order is not mirrored.
    customer_id: Option<String>,
}

struct ActivePoll {
    generation: u64,
    handle: PollerHandle,
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Session checkout. Cheap to clone: clones share the session.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    services: CheckoutServices,
    repo: LocalStateRepository,
    cart: Arc<CartStore>,
    config: ConfigState,
    timing: CheckoutTiming,
    session: Mutex<CheckoutSession>,
    poller: Mutex<Option<ActivePoll>>,
    generation: AtomicU64,
    phase_tx: watch::Sender<CheckoutPhase>,
}

impl CheckoutOrchestrator {
    pub fn new(
        services: CheckoutServices,
        repo: LocalStateRepository,
        cart: Arc<CartStore>,
        config: ConfigState,
    ) -> Self {
        let timing = CheckoutTiming::from(config.checkout());
        Self::with_timing(services, repo, cart, config, timing)
    }

    pub fn with_timing(
        services: CheckoutServices,
        repo: LocalStateRepository,
        cart: Arc<CartStore>,
        config: ConfigState,
        timing: CheckoutTiming,
    ) -> Self {
        let (phase_tx, _) = watch::channel(CheckoutPhase::Idle);

        CheckoutOrchestrator {
            inner: Arc::new(Inner {
                services,
                repo,
                cart,
                config,
                timing,
                session: Mutex::new(CheckoutSession::new()),
                poller: Mutex::new(None),
                generation: AtomicU64::new(0),
                phase_tx,
            }),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn session(&self) -> CheckoutSession {
        self.inner.session.lock().await.clone()
    }

    pub fn phase(&self) -> CheckoutPhase {
        *self.inner.phase_tx.borrow()
    }

    /// Resolves once the session is neither charging nor waiting on an
    /// asynchronous payment.
    pub async fn wait_until_settled(&self) -> CheckoutPhase {
        let mut rx = self.inner.phase_tx.subscribe();
        let settled = rx
            .wait_for(|phase| {
                !matches!(phase, CheckoutPhase::Charging | CheckoutPhase::PendingAsync)
            })
            .await;

        match settled {
            Ok(phase) => *phase,
            Err(_) => self.phase(),
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Makes sure the session has an order matching the current cart.
    ///
    /// Reuses the persisted pending order when the Order API still reports
    /// it as `pending` or `failed`. If that order has been paid in the
    /// meantime it is approved instead, and the result has `already_paid`
    /// set.
    pub async fn ensure_order(&self, request: &CheckoutRequest) -> Result<PreparedOrder, ApiError> {
        let mut session = self.inner.session.lock().await;
        let result = self.prepare(&mut session, request, None, None).await;
        self.publish(&session);
        result
    }

    /// Charges a tokenized card.
    ///
    /// A decline is returned as an outcome in phase `Failed`. Transport and
    /// API errors come back as `Err` with the session back in
    /// `OrderCreated` on the same order.
    pub async fn pay_with_card(
        &self,
        request: &CheckoutRequest,
        card: &CardPayment,
    ) -> Result<CheckoutOutcome, ApiError> {
        validate_card_token(&card.token)?;
        let customer = self.customer()?;

        let mut session = self.inner.session.lock().await;
        let result = self.card_checkout(&mut session, request, card, customer).await;
        self.publish(&session);
        result
    }

    /// Generates a PIX code and starts polling for its payment.
    pub async fn pay_with_pix(&self, request: &CheckoutRequest) -> Result<CheckoutOutcome, ApiError> {
        let customer = self.customer()?;

        let mut session = self.inner.session.lock().await;
        let result = self.pix_checkout(&mut session, request, customer).await;
        self.publish(&session);
        result
    }

    /// Puts a failed or expired order back in `OrderCreated` so it can be
    /// charged again. Server-side failed orders are reset first.
    pub async fn reset_for_retry(&self) -> Result<CheckoutSession, ApiError> {
        let mut session = self.inner.session.lock().await;
        let result = self.reset(&mut session).await;
        self.publish(&session);
        result
    }

    /// Stops any polling. The session state is kept.
    pub async fn shutdown(&self) {
        self.cancel_poller().await;
        info!("Checkout shut down");
    }

    // =========================================================================
    // Order
    // =========================================================================

    async fn prepare(
        &self,
        session: &mut CheckoutSession,
        request: &CheckoutRequest,
        method: Option<PaymentMethod>,
        installments: Option<u32>,
    ) -> Result<PreparedOrder, ApiError> {
        let (items, summary) = self.inner.cart.snapshot().await;
        if items.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        let address_id = validate_address_id(request.address_id.as_deref())?;
        validate_credit(request.credit)?;
        if let Some(requested) = installments {
            validate_installments(requested, summary.max_installments)?;
        }
        let coupon_code = request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(validate_coupon_code)
            .transpose()?;

        match session.phase {
            CheckoutPhase::Charging => {
                return Err(ApiError::business("A payment is already being processed"));
            }
            CheckoutPhase::Approved => session.transition(CheckoutPhase::Idle)?,
            CheckoutPhase::PendingAsync => self.cancel_poller().await,
            _ => {}
        }

        let kit = if request.is_first_order {
            self.inner.config.starter_kit()
        } else {
            None
        };

        let coupon = match coupon_code {
            Some(code) => {
                let kit_price = kit.map(|k| k.price.non_negative()).unwrap_or_default();
                Some(self.apply_coupon(&code, summary.total_with_discount + kit_price).await?)
            }
            None => None,
        };

        let quote = ChargeQuote::build(
            &summary,
            kit,
            coupon.as_ref(),
            request.credit,
            self.inner.config.pix_rate(),
        );
        let details = order_details(&items, &summary, &quote, kit, coupon.as_ref(), &address_id);

        let pending = match self.inner.repo.pending_order_id().await {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Could not read pending order id");
                None
            }
        };

        let pending = match pending {
            Some(order_id) => {
                self.reuse_order(&order_id, &quote, coupon.as_ref(), &details)
                    .await?
            }
            None => PendingOrder::Gone,
        };

        let (order, reused, paid) = match pending {
            PendingOrder::Reusable(order) => (order, true, None),
            PendingOrder::Paid(order) => {
                let order_ref = OrderRef {
                    id: order.id.clone(),
                    order_number: order.order_number.clone(),
                };
                (order_ref, true, Some(order))
            }
            PendingOrder::Gone => {
                let order = self
                    .create_order(&items, &quote, &address_id, &details, coupon.as_ref())
                    .await?;
                (order, false, None)
            }
        };

        let charged_method = session.method;
        attach_order(session, &order)?;

        let prepared = PreparedOrder {
            order_id: order.id,
            order_number: order.order_number,
            items,
            quote,
            address_id,
            details,
            reused,
            already_paid: paid.is_some(),
        };

        if let Some(mut order) = paid {
            // Settled out of band with no recorded method: PIX
            let method = order
                .payment_method
                .or(charged_method)
                .or(method)
                .unwrap_or(PaymentMethod::Pix);
            order.status = OrderStatus::Paid;
            order.payment_method = Some(method);
            if order.details.is_null() {
                order.details = prepared.details.clone();
            }

            info!(order_id = %prepared.order_id, "Pending order is already paid, nothing to charge");
            let settled = PendingCharge {
                generation: self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1,
                prepared: prepared.clone(),
                method,
                installments: order.installments.or(installments),
                customer_id: self.inner.config.customer().map(|c| c.id.clone()),
            };
            self.approve(session, &settled, order).await?;
        }

        Ok(prepared)
    }

    async fn apply_coupon(&self, code: &str, order_total: Money) -> Result<AppliedCoupon, ApiError> {
        let validation = self
            .inner
            .services
            .coupons
            .validate_coupon(code, order_total)
            .await?;
        let message = validation.message.clone();

        match validation.into_applied(code) {
            Some(coupon) => {
                debug!(code = %coupon.code, discount = %coupon.discount, "Coupon applied");
                Ok(coupon)
            }
            None => Err(ApiError::validation(
                message.unwrap_or_else(|| format!("Coupon {} is not valid", code)),
            )),
        }
    }

    /// Looks up the persisted pending order. A paid one is handed back for
    /// approval and must never be replaced by a new order.
    async fn reuse_order(
        &self,
        order_id: &str,
        quote: &ChargeQuote,
        coupon: Option<&AppliedCoupon>,
        details: &serde_json::Value,
    ) -> Result<PendingOrder, ApiError> {
        let orders = &self.inner.services.orders;

        let order = match orders.get_order(order_id).await {
            Ok(order) => order,
            Err(e) => {
                warn!(order_id, error = %e, "Pending order lookup failed, creating a fresh order");
                return Ok(PendingOrder::Gone);
            }
        };

        if is_order_paid(order.status, order.gateway_status.as_deref()) {
            return Ok(PendingOrder::Paid(order));
        }

        if !order.status.is_reusable() {
            info!(order_id, status = ?order.status, "Discarding pending order");
            if let Err(e) = self.inner.repo.clear_pending_order_id().await {
                warn!(order_id, error = %e, "Failed to forget pending order");
            }
            return Ok(PendingOrder::Gone);
        }

        if order.status == OrderStatus::Failed {
            orders.retry_payment(order_id).await?;
            info!(order_id, "Failed order reset for a new charge");
        }

        let previous_coupon = order
            .details
            .get("coupon")
            .and_then(|c| c.get("code"))
            .and_then(serde_json::Value::as_str);
        let coupon_code = coupon.map(|c| c.code.as_str());

        let mut update = OrderUpdate::default();
        if order.total != quote.card_amount || previous_coupon != coupon_code {
            update.total = Some(quote.card_amount);
            update.details = Some(details.clone());
            update.coupon_code = coupon_code.map(str::to_string);
        }

        if !update.is_empty() {
            orders.update_order(order_id, update).await?;
            debug!(order_id, total = %quote.card_amount, "Pending order updated");
        }

        info!(order_id, "Reusing pending order");
        Ok(PendingOrder::Reusable(OrderRef {
            id: order.id,
            order_number: order.order_number,
        }))
    }

    async fn create_order(
        &self,
        items: &[LineItem],
        quote: &ChargeQuote,
        address_id: &str,
        details: &serde_json::Value,
        coupon: Option<&AppliedCoupon>,
    ) -> Result<OrderRef, ApiError> {
        let created = self
            .inner
            .services
            .orders
            .create_order(NewOrder {
                items: items.to_vec(),
                total: quote.card_amount,
                address_id: address_id.to_string(),
                details: details.clone(),
                coupon_code: coupon.map(|c| c.code.clone()),
            })
            .await?;

        info!(order_id = %created.id, total = %quote.card_amount, items = items.len(), "Order created");

        if let Err(e) = self.inner.repo.set_pending_order_id(&created.id).await {
            warn!(order_id = %created.id, error = %e, "Failed to persist pending order id");
        }

        self.save_snapshot(&Order {
            id: created.id.clone(),
            order_number: created.order_number.clone(),
            status: OrderStatus::Pending,
            total: quote.card_amount,
            details: details.clone(),
            address_id: Some(address_id.to_string()),
            payment_method: None,
            installments: None,
            gateway_status: None,
        })
        .await;

        Ok(created)
    }

    // =========================================================================
    // Charge
    // =========================================================================

    async fn card_checkout(
        &self,
        session: &mut CheckoutSession,
        request: &CheckoutRequest,
        card: &CardPayment,
        customer: Customer,
    ) -> Result<CheckoutOutcome, ApiError> {
        let method = PaymentMethod::CreditCard;
        let installments = Some(card.installments);
        let prepared = self.prepare(session, request, Some(method), installments).await?;
        if prepared.already_paid {
            return Ok(CheckoutOutcome::from_session(session, &prepared, method, installments));
        }

        let response = self
            .charge(
                session,
                PaymentRequest {
                    amount: prepared.quote.card_amount,
                    order_id: prepared.order_id.clone(),
                    payment_method: method,
                    card_data: Some(CardData {
                        token: card.token.trim().to_string(),
                    }),
                    customer: customer.clone(),
                    installments,
                    idempotency_key: None,
                },
            )
            .await?;

        if response.success {
            let approved = response.status.as_deref().map(is_paid_status).unwrap_or(false);
            let pending = PendingCharge {
                generation: self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1,
                prepared: prepared.clone(),
                method,
                installments,
                customer_id: Some(customer.id),
            };

            if approved {
                let order = paid_order(&prepared, method, installments, response.status);
                self.approve(session, &pending, order).await?;
            } else {
                info!(
                    order_id = %prepared.order_id,
                    status = ?response.status,
                    "Card payment awaiting confirmation"
                );
                session.awaiting_payment(None)?;
                let expires_at = Utc::now() + self.inner.timing.pix_default_ttl;
                self.watch_payment(pending, expires_at).await;
            }
        }

        Ok(CheckoutOutcome::from_session(session, &prepared, method, installments))
    }

    async fn pix_checkout(
        &self,
        session: &mut CheckoutSession,
        request: &CheckoutRequest,
        customer: Customer,
    ) -> Result<CheckoutOutcome, ApiError> {
        let method = PaymentMethod::Pix;
        let prepared = self.prepare(session, request, Some(method), None).await?;
        if prepared.already_paid {
            return Ok(CheckoutOutcome::from_session(session, &prepared, method, None));
        }

        let response = self
            .charge(
                session,
                PaymentRequest {
                    amount: prepared.quote.pix_amount,
                    order_id: prepared.order_id.clone(),
                    payment_method: method,
                    card_data: None,
                    customer: customer.clone(),
                    installments: None,
                    idempotency_key: None,
                },
            )
            .await?;

        if !response.success {
            return Ok(CheckoutOutcome::from_session(session, &prepared, method, None));
        }

        let Some(pix) = response.pix else {
            let message = "The payment service returned no PIX code";
            warn!(order_id = %prepared.order_id, "PIX response without a code");
            session.charge_errored(message.to_string())?;
            self.clear_in_flight().await;
            return Err(ApiError::payment(message));
        };

        let pix = pix.into_payment(Utc::now(), self.inner.timing.pix_default_ttl);
        let expires_at = pix.expires_at;
        info!(order_id = %prepared.order_id, expires_at = %expires_at, "PIX code generated");
        session.awaiting_payment(Some(pix))?;

        self.spawn_mirror(MirrorOrder {
            order_id: prepared.order_id.clone(),
            order_number: prepared.order_number.clone(),
            status: MirrorOrder::STATUS_ON_HOLD.to_string(),
            total: prepared.quote.pix_amount,
            payment_method: method,
            items: prepared.items.clone(),
            customer_id: customer.id.clone(),
        });

        let pending = PendingCharge {
            generation: self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1,
            prepared: prepared.clone(),
            method,
            installments: None,
            customer_id: Some(customer.id),
        };
        self.watch_payment(pending, expires_at).await;

        Ok(CheckoutOutcome::from_session(session, &prepared, method, None))
    }

    /// OrderCreated → Charging → (response). A decline moves the session to
    /// `Failed` and still returns the response.
    async fn charge(
        &self,
        session: &mut CheckoutSession,
        mut payment: PaymentRequest,
    ) -> Result<PaymentResponse, ApiError> {
        let method = payment.payment_method;
        let order_id = payment.order_id.clone();

        session.start_charge(method)?;
        self.publish(session);

        let in_flight = PaymentInFlight::new(order_id.as_str(), method, payment.amount);
        payment.idempotency_key = Some(in_flight.attempt_id.clone());
        if let Err(e) = self.inner.repo.set_payment_in_flight(&in_flight).await {
            warn!(order_id = %order_id, error = %e, "Failed to persist in-flight payment");
        }

        info!(
            order_id = %order_id,
            method = method.as_str(),
            amount = %payment.amount,
            "Charging order"
        );

        let response = match self.inner.services.payments.process_payment(payment).await {
            Ok(response) => response,
            Err(e) => {
                warn!(order_id = %order_id, error = %e, "Charge failed");
                session.charge_errored(e.user_message())?;
                self.clear_in_flight().await;
                return Err(ApiError::from_charge(&e));
            }
        };

        if !response.success {
            let message = response
                .error
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Payment failed".to_string());
            info!(order_id = %order_id, message = %message, "Charge declined");
            session.declined(message)?;
            self.clear_in_flight().await;
        }

        Ok(response)
    }

    // =========================================================================
    // Settlement
    // =========================================================================

    /// → Approved with every local side effect of a paid order.
    async fn approve(
        &self,
        session: &mut CheckoutSession,
        pending: &PendingCharge,
        order: Order,
    ) -> Result<(), ApiError> {
        session.transition(CheckoutPhase::Approved)?;
        session.last_error = None;
        info!(order_id = %order.id, method = pending.method.as_str(), "Order paid");

        self.save_snapshot(&order).await;
        self.inner.cart.clear_cart().await;
        if let Err(e) = self.inner.repo.clear_checkout_state().await {
            warn!(order_id = %order.id, error = %e, "Failed to clear checkout state");
        }

        let Some(customer_id) = pending.customer_id.clone() else {
            warn!(order_id = %order.id, "No customer configured, paid order not mirrored");
            return Ok(());
        };
        self.spawn_mirror(MirrorOrder {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            status: MirrorOrder::STATUS_PROCESSING.to_string(),
            total: order.total,
            payment_method: order.payment_method.unwrap_or(pending.method),
            items: pending.prepared.items.clone(),
            customer_id,
        });

        Ok(())
    }

    async fn expire(&self, session: &mut CheckoutSession, order_id: &str) -> Result<(), ApiError> {
        session.transition(CheckoutPhase::Expired)?;
        session.last_error = Some("PIX code expired".to_string());
        info!(order_id, "Payment window closed");
        self.clear_in_flight().await;
        Ok(())
    }

    async fn watch_payment(&self, pending: PendingCharge, expires_at: DateTime<Utc>) {
        let (handle, outcome) = PixPoller::new(
            self.inner.services.orders.clone(),
            pending.prepared.order_id.clone(),
            expires_at,
            self.inner.timing.poll_interval,
        )
        .start();

        let previous = self.inner.poller.lock().await.replace(ActivePoll {
            generation: pending.generation,
            handle,
        });
        if let Some(previous) = previous {
            previous.handle.cancel();
        }

        let this = self.clone();
        tokio::spawn(async move {
            if let Ok(outcome) = outcome.await {
                this.settle(pending, outcome).await;
            }
        });
    }

    /// Applies a poller outcome, unless a newer charge replaced it.
    async fn settle(&self, pending: PendingCharge, outcome: PollOutcome) {
        if outcome == PollOutcome::Cancelled {
            return;
        }

        let mut session = self.inner.session.lock().await;
        {
            let mut active = self.inner.poller.lock().await;
            match active.as_ref() {
                Some(poll) if poll.generation == pending.generation => {
                    active.take();
                }
                _ => {
                    debug!(order_id = %pending.prepared.order_id, "Ignoring superseded poll outcome");
                    return;
                }
            }
        }

        let order_id = pending.prepared.order_id.clone();
        let result = match outcome {
            PollOutcome::Paid(mut order) => {
                order.status = OrderStatus::Paid;
                order.payment_method = order.payment_method.or(Some(pending.method));
                order.installments = order.installments.or(pending.installments);
                if order.details.is_null() {
                    order.details = pending.prepared.details.clone();
                }
                self.approve(&mut session, &pending, order).await
            }
            PollOutcome::Expired => self.expire(&mut session, &order_id).await,
            PollOutcome::Cancelled => Ok(()),
        };

        if let Err(e) = result {
            error!(order_id = %order_id, error = %e, "Could not settle payment");
        }
        self.publish(&session);
    }

    // =========================================================================
    // Retry
    // =========================================================================

    async fn reset(&self, session: &mut CheckoutSession) -> Result<CheckoutSession, ApiError> {
        if session.phase == CheckoutPhase::Charging {
            return Err(ApiError::business("A payment is already being processed"));
        }

        let order_id = match session.order_id.clone() {
            Some(id) => id,
            None => self
                .inner
                .repo
                .pending_order_id()
                .await?
                .ok_or_else(|| ApiError::business("There is no order to retry"))?,
        };

        let orders = &self.inner.services.orders;
        let order = orders.get_order(&order_id).await?;

        if is_order_paid(order.status, order.gateway_status.as_deref()) {
            return Err(ApiError::business(format!("Order {} is already paid", order_id)));
        }
        if !order.status.is_reusable() {
            return Err(ApiError::business(format!(
                "Order {} can no longer be paid",
                order_id
            )));
        }

        if order.status == OrderStatus::Failed {
            orders.retry_payment(&order_id).await?;
        }
        self.cancel_poller().await;

        attach_order(
            session,
            &OrderRef {
                id: order_id.clone(),
                order_number: order.order_number,
            },
        )?;
        info!(order_id = %order_id, "Order ready for another charge");

        Ok(session.clone())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn customer(&self) -> Result<Customer, ApiError> {
        self.inner.config.customer().cloned().ok_or_else(|| {
            ValidationError::Required {
                field: "customer".to_string(),
            }
            .into()
        })
    }

    fn publish(&self, session: &CheckoutSession) {
        self.inner.phase_tx.send_replace(session.phase);
    }

    async fn cancel_poller(&self) {
        if let Some(active) = self.inner.poller.lock().await.take() {
            active.handle.cancel();
            debug!("Payment polling cancelled");
        }
    }

    async fn clear_in_flight(&self) {
        if let Err(e) = self.inner.repo.clear_payment_in_flight().await {
            warn!(error = %e, "Failed to clear in-flight payment");
        }
    }

    async fn save_snapshot(&self, order: &Order) {
        if let Err(e) = self.inner.repo.save_order_snapshot(order).await {
            warn!(order_id = %order.id, error = %e, "Failed to save order snapshot");
        }
    }

    fn spawn_mirror(&self, order: MirrorOrder) {
        let mirror = self.inner.services.mirror.clone();
        tokio::spawn(async move {
            let order_id = order.order_id.clone();
            let status = order.status.clone();
            match mirror.mirror_order(order).await {
                Ok(()) => debug!(order_id = %order_id, status = %status, "Order mirrored"),
                Err(e) => warn!(order_id = %order_id, error = %e, "Order mirror failed"),
            }
        });
    }
}

/// Moves the session onto `order`, from wherever it was.
fn attach_order(session: &mut CheckoutSession, order: &OrderRef) -> CoreResult<()> {
    match session.phase {
        CheckoutPhase::Idle => {
            session.order_created(order.id.clone(), order.order_number.clone())?;
        }
        CheckoutPhase::OrderCreated => {}
        _ => session.transition(CheckoutPhase::OrderCreated)?,
    }
    session.order_id = Some(order.id.clone());
    session.order_number = order.order_number.clone();
    session.pix = None;
    session.last_error = None;
    Ok(())
}

fn order_details(
    items: &[LineItem],
    summary: &PricingSummary,
    quote: &ChargeQuote,
    kit: Option<&Kit>,
    coupon: Option<&AppliedCoupon>,
    address_id: &str,
) -> serde_json::Value {
    json!({
        "items": items,
        "summary": summary,
        "quote": quote,
        "kit": kit,
        "coupon": coupon,
        "credit": quote.credit_applied,
        "address_id": address_id,
    })
}

fn paid_order(
    prepared: &PreparedOrder,
    method: PaymentMethod,
    installments: Option<u32>,
    gateway_status: Option<String>,
) -> Order {
    Order {
        id: prepared.order_id.clone(),
        order_number: prepared.order_number.clone(),
        status: OrderStatus::Paid,
        total: prepared.quote.amount_for(method),
        details: prepared.details.clone(),
        address_id: Some(prepared.address_id.clone()),
        payment_method: Some(method),
        installments,
        gateway_status,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
