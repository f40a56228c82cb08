//! # Cart Activity Notifier
//!
//! Debounced abandoned-cart telemetry.
//!
//! ## Message Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cart Activity Notifier                              │
//! │                                                                         │
//! │  CartStore ──Touched(snapshot)──┐                                       │
//! │  CartStore ──Cleared(customer)──┼──► mpsc ──► worker                    │
//! │  Session   ──Flush / Shutdown───┘               │                       │
//! │                                                 │                       │
//! │                    ┌────────────────────────────┴───────────────┐       │
//! │                    │ pending: Option<CartActivity>              │       │
//! │                    │ deadline: last Touched + debounce (5s)     │       │
//! │                    └────────────────────────────┬───────────────┘       │
//! │                                                 │                       │
//! │   Touched  → replace pending, push deadline back                        │
//! │   deadline → record_activity(pending)                                   │
//! │   Cleared  → drop pending, clear(customer) right away                   │
//! │   Flush    → record_activity(pending) now                               │
//! │   Shutdown → flush, stop                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A burst of edits inside the window produces one call carrying the last
//! snapshot. Tracker failures are logged and dropped.
//!
//! `touched` and `cleared` never wait: callers hold the cart lock while
//! reporting. If the worker is stuck on a slow tracker and the queue
//! fills, further reports are refused with `ChannelError` and the caller
//! logs and moves on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::api::{CartActivity, CartTracker};
use crate::error::{SyncError, SyncResult};

/// Default quiet period before activity is reported.
pub const DEFAULT_DEBOUNCE_SECS: u64 = 5;

const QUEUE_CAPACITY: usize = 64;

/// Commands for the notifier worker.
#[derive(Debug)]
enum NotifierCommand {
    Touched(CartActivity),
    Cleared { customer_id: String },
    Flush,
    Shutdown,
}

/// Handle for feeding the notifier. Cheap to clone.
#[derive(Clone, Debug)]
pub struct NotifierHandle {
    cmd_tx: mpsc::Sender<NotifierCommand>,
}

impl NotifierHandle {
    /// Reports a cart change. Sent after the debounce window unless
    /// superseded. Does not wait for queue space.
    pub fn touched(&self, activity: CartActivity) -> SyncResult<()> {
        self.try_send(NotifierCommand::Touched(activity))
    }

    /// Reports that the cart is now empty. Sent immediately. Does not wait
    /// for queue space.
    pub fn cleared(&self, customer_id: impl Into<String>) -> SyncResult<()> {
        self.try_send(NotifierCommand::Cleared {
            customer_id: customer_id.into(),
        })
    }

    /// Sends any pending activity now.
    pub async fn flush(&self) -> SyncResult<()> {
        self.send(NotifierCommand::Flush).await
    }

    /// Flushes pending activity and stops the worker.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.send(NotifierCommand::Shutdown).await
    }

    /// Resolves once the worker has exited.
    pub async fn stopped(&self) {
        self.cmd_tx.closed().await
    }

    async fn send(&self, cmd: NotifierCommand) -> SyncResult<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SyncError::ChannelError("Notifier channel closed".into()))
    }

    fn try_send(&self, cmd: NotifierCommand) -> SyncResult<()> {
        self.cmd_tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => SyncError::ChannelError("Notifier queue is full".into()),
            TrySendError::Closed(_) => SyncError::ChannelError("Notifier channel closed".into()),
        })
    }
}

/// Worker that coalesces cart activity before reporting it.
pub struct CartActivityNotifier {
    tracker: Arc<dyn CartTracker>,
    debounce: Duration,
}

impl CartActivityNotifier {
    pub fn new(tracker: Arc<dyn CartTracker>, debounce: Duration) -> Self {
        CartActivityNotifier { tracker, debounce }
    }

    /// Spawns the worker and returns its handle.
    pub fn start(self) -> NotifierHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(QUEUE_CAPACITY);

        tokio::spawn(async move {
            self.run(cmd_rx).await;
        });

        NotifierHandle { cmd_tx }
    }

    async fn run(self, mut cmd_rx: mpsc::Receiver<NotifierCommand>) {
        info!(debounce_ms = self.debounce.as_millis() as u64, "Cart activity notifier started");

        let mut pending: Option<CartActivity> = None;
        let deadline = sleep_until(Instant::now() + self.debounce);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NotifierCommand::Touched(activity)) => {
                            debug!(
                                customer_id = %activity.customer_id,
                                items = activity.items.len(),
                                "Cart touched"
                            );
                            pending = Some(activity);
                            deadline.as_mut().reset(Instant::now() + self.debounce);
                        }
                        Some(NotifierCommand::Cleared { customer_id }) => {
                            if pending.take().is_some() {
                                debug!(customer_id = %customer_id, "Dropped pending cart activity");
                            }
                            self.send_clear(&customer_id).await;
                        }
                        Some(NotifierCommand::Flush) => {
                            self.flush(&mut pending).await;
                        }
                        Some(NotifierCommand::Shutdown) | None => {
                            info!("Cart activity notifier shutting down");
                            self.flush(&mut pending).await;
                            break;
                        }
                    }
                }
                _ = &mut deadline, if pending.is_some() => {
                    self.flush(&mut pending).await;
                }
            }
        }
    }

    async fn flush(&self, pending: &mut Option<CartActivity>) {
        let Some(activity) = pending.take() else {
            return;
        };

        let customer_id = activity.customer_id.clone();
        match self.tracker.record_activity(activity).await {
            Ok(()) => debug!(customer_id = %customer_id, "Cart activity recorded"),
            Err(e) => warn!(customer_id = %customer_id, error = %e, "Failed to record cart activity"),
        }
    }

    async fn send_clear(&self, customer_id: &str) {
        match self.tracker.clear(customer_id).await {
            Ok(()) => debug!(customer_id = %customer_id, "Abandoned cart cleared"),
            Err(e) => warn!(customer_id = %customer_id, error = %e, "Failed to clear abandoned cart"),
        }
    }
}
