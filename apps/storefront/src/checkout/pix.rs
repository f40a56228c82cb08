//! # PIX Poller
//!
//! Watches a pending order until it is paid, its PIX code expires, or the
//! session cancels it.
//!
//! ```text
//! every interval (5s):
//!     POST /orders/:id/sync      (errors logged)
//!     GET  /orders/:id
//!     paid status or paid gateway status?  ──► Paid(order)
//!
//! expires_at reached               ──► Expired
//! handle cancelled or dropped      ──► Cancelled
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use revenda_core::{is_order_paid, Order};
use revenda_sync::OrderApi;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// How polling ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Paid(Order),
    Expired,
    Cancelled,
}

/// Stops the poller when cancelled or dropped.
#[derive(Debug)]
pub struct PollerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl PollerHandle {
    pub fn cancel(&self) {
        let _ = self.shutdown_tx.try_send(());
    }
}

/// Polls one order's payment status.
pub struct PixPoller {
    orders: Arc<dyn OrderApi>,
    order_id: String,
    expires_at: DateTime<Utc>,
    interval: Duration,
}

impl PixPoller {
    pub fn new(
        orders: Arc<dyn OrderApi>,
        order_id: impl Into<String>,
        expires_at: DateTime<Utc>,
        interval: Duration,
    ) -> Self {
        PixPoller {
            orders,
            order_id: order_id.into(),
            expires_at,
            interval,
        }
    }

    /// Spawns the poller. The receiver resolves once with the outcome.
    pub fn start(self) -> (PollerHandle, oneshot::Receiver<PollOutcome>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        tokio::spawn(async move {
            let outcome = self.run(shutdown_rx).await;
            let _ = outcome_tx.send(outcome);
        });

        (PollerHandle { shutdown_tx }, outcome_rx)
    }

    async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) -> PollOutcome {
        let remaining = (self.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let deadline = Instant::now() + remaining;

        info!(
            order_id = %self.order_id,
            expires_in_secs = remaining.as_secs(),
            "PIX polling started"
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!(order_id = %self.order_id, "PIX polling cancelled");
                    return PollOutcome::Cancelled;
                }
                _ = sleep_until(deadline) => {
                    info!(order_id = %self.order_id, "PIX code expired");
                    return PollOutcome::Expired;
                }
                _ = ticker.tick() => {
                    if let Some(order) = self.check().await {
                        info!(order_id = %self.order_id, "PIX payment confirmed");
                        return PollOutcome::Paid(order);
                    }
                }
            }
        }
    }

    /// One reconcile-then-read round.
    async fn check(&self) -> Option<Order> {
        if let Err(e) = self.orders.sync_order(&self.order_id).await {
            warn!(order_id = %self.order_id, error = %e, "Order sync failed");
        }

        match self.orders.get_order(&self.order_id).await {
            Ok(order) if is_order_paid(order.status, order.gateway_status.as_deref()) => {
                Some(order)
            }
            Ok(order) => {
                debug!(
                    order_id = %self.order_id,
                    status = ?order.status,
                    gateway_status = ?order.gateway_status,
                    "Still waiting for payment"
                );
                None
            }
            Err(e) => {
                warn!(order_id = %self.order_id, error = %e, "Order lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use revenda_core::{Money, OrderStatus};
    use revenda_sync::{NewOrder, OrderRef, OrderUpdate, SyncError, SyncResult};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::sleep;

    /// Reports `statuses[n]` on the n-th lookup, repeating the last one.
    struct ScriptedOrders {
        statuses: Vec<(OrderStatus, Option<&'static str>)>,
        gets: AtomicU32,
        syncs: AtomicU32,
        fail_sync: bool,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedOrders {
        fn new(statuses: Vec<(OrderStatus, Option<&'static str>)>) -> Arc<Self> {
            Arc::new(ScriptedOrders {
                statuses,
                gets: AtomicU32::new(0),
                syncs: AtomicU32::new(0),
                fail_sync: false,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl OrderApi for ScriptedOrders {
        async fn create_order(&self, _order: NewOrder) -> SyncResult<OrderRef> {
            unreachable!("poller never creates orders")
        }

        async fn get_order(&self, order_id: &str) -> SyncResult<Order> {
            self.seen.lock().unwrap().push(order_id.to_string());
            let n = self.gets.fetch_add(1, Ordering::SeqCst) as usize;
            let (status, gateway) = self.statuses[n.min(self.statuses.len() - 1)];
            Ok(Order {
                id: order_id.to_string(),
                order_number: None,
                status,
                total: Money::from_cents(6_790),
                details: serde_json::Value::Null,
                address_id: None,
                payment_method: None,
                installments: None,
                gateway_status: gateway.map(str::to_string),
            })
        }

        async fn update_order(&self, _id: &str, _update: OrderUpdate) -> SyncResult<Order> {
            unreachable!("poller never updates orders")
        }

        async fn sync_order(&self, _order_id: &str) -> SyncResult<()> {
            self.syncs.fetch_add(1, Ordering::SeqCst);
            if self.fail_sync {
                return Err(SyncError::ConnectionFailed("down".into()));
            }
            Ok(())
        }

        async fn retry_payment(&self, _order_id: &str) -> SyncResult<()> {
            unreachable!("poller never retries payments")
        }
    }

    fn poller(orders: Arc<ScriptedOrders>, ttl_secs: i64) -> PixPoller {
        PixPoller::new(
            orders,
            "ord-1",
            Utc::now() + chrono::Duration::seconds(ttl_secs),
            Duration::from_secs(5),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_paid_on_captured_gateway_status() {
        let orders = ScriptedOrders::new(vec![
            (OrderStatus::Pending, Some("Aguardando Pagamento")),
            (OrderStatus::Pending, Some("Capturado")),
        ]);
        let (_handle, outcome) = poller(orders.clone(), 3600).start();

        match outcome.await.unwrap() {
            PollOutcome::Paid(order) => assert_eq!(order.gateway_status.as_deref(), Some("Capturado")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(orders.gets.load(Ordering::SeqCst), 2);
        assert_eq!(orders.syncs.load(Ordering::SeqCst), 2);
        assert!(orders.seen.lock().unwrap().iter().all(|id| id == "ord-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_paid_on_order_status() {
        let orders = ScriptedOrders::new(vec![(OrderStatus::Paid, None)]);
        let (_handle, outcome) = poller(orders, 3600).start();

        assert!(matches!(outcome.await.unwrap(), PollOutcome::Paid(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_paid_on_numeric_code() {
        let orders = ScriptedOrders::new(vec![(OrderStatus::Pending, Some("5"))]);
        let (_handle, outcome) = poller(orders, 3600).start();

        assert!(matches!(outcome.await.unwrap(), PollOutcome::Paid(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_without_payment() {
        let orders = ScriptedOrders::new(vec![(OrderStatus::Pending, Some("Aguardando Pagamento"))]);
        let (_handle, outcome) = poller(orders.clone(), 12).start();

        assert_eq!(outcome.await.unwrap(), PollOutcome::Expired);
        // Polled at 5s and 10s, expired before 15s
        assert_eq!(orders.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_expired_code() {
        let orders = ScriptedOrders::new(vec![(OrderStatus::Pending, None)]);
        let (_handle, outcome) = poller(orders.clone(), -60).start();

        assert_eq!(outcome.await.unwrap(), PollOutcome::Expired);
        assert_eq!(orders.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_failure_still_reads_order() {
        let orders = Arc::new(ScriptedOrders {
            statuses: vec![(OrderStatus::Pending, Some("aprovado"))],
            gets: AtomicU32::new(0),
            syncs: AtomicU32::new(0),
            fail_sync: true,
            seen: Mutex::new(Vec::new()),
        });
        let (_handle, outcome) = poller(orders, 3600).start();

        assert!(matches!(outcome.await.unwrap(), PollOutcome::Paid(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let orders = ScriptedOrders::new(vec![(OrderStatus::Pending, None)]);
        let (handle, outcome) = poller(orders.clone(), 3600).start();

        sleep(Duration::from_secs(11)).await;
        handle.cancel();

        assert_eq!(outcome.await.unwrap(), PollOutcome::Cancelled);
        assert_eq!(orders.gets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels() {
        let orders = ScriptedOrders::new(vec![(OrderStatus::Pending, None)]);
        let (handle, outcome) = poller(orders, 3600).start();
        drop(handle);

        assert_eq!(outcome.await.unwrap(), PollOutcome::Cancelled);
    }
}
