//! # Revenda Storefront Library
//!
//! The session layer of the reseller storefront: one `Session` owns the
//! cart, the configuration, local storage and the checkout orchestrator.
//!
//! ## Module Organization
//! ```text
//! storefront_lib/
//! ├── lib.rs          ◄─── You are here (Session, logging setup)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state wrapper
//! │   ├── cart.rs     ◄─── Cart store (persisted, debounced telemetry)
//! │   └── config.rs   ◄─── Configuration state
//! ├── checkout/
//! │   ├── mod.rs          ◄─── Checkout DTOs
//! │   ├── orchestrator.rs ◄─── Order creation, charge, reconciliation
//! │   └── pix.rs          ◄─── PIX payment poller
//! ├── commands/
//! │   ├── mod.rs      ◄─── Command exports
//! │   ├── cart.rs     ◄─── Cart manipulation commands
//! │   └── checkout.rs ◄─── Checkout commands
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Session Wiring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           Session                                       │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────────┐     │
//! │  │   DbState    │   │ ConfigState  │   │ CartStore                │     │
//! │  │              │   │              │   │                          │     │
//! │  │ SQLite pool  │──►│ rules, kit,  │──►│ cart mutex ──► notifier ─┼──► CartTracker
//! │  │ local_state  │   │ customer     │   │                          │     │
//! │  └──────────────┘   └──────────────┘   └────────────┬─────────────┘     │
//! │                                                     │                   │
//! │                                                     ▼                   │
//! │                                  ┌──────────────────────────────────┐   │
//! │                                  │ CheckoutOrchestrator             │   │
//! │                                  │  OrderApi, PaymentApi, CouponApi │   │
//! │                                  │  CommerceMirror, PixPoller       │   │
//! │                                  └──────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no global state: everything hangs off the `Session` the caller
//! opens, and `close` stops the background tasks.

pub mod checkout;
pub mod commands;
pub mod error;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use revenda_db::{Database, DbConfig};
use revenda_sync::{CartActivityNotifier, CartTracker, HttpClient, NotifierHandle, StorefrontConfig};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use checkout::{CheckoutOrchestrator, CheckoutServices};
use error::ApiError;
use state::{ActivitySink, CartStore, ConfigState, DbState};

/// How long `close` waits for the notifier's final flush.
const NOTIFIER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,revenda=debug,storefront_lib=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}

/// One user's storefront session.
pub struct Session {
    db: DbState,
    config: ConfigState,
    cart: Arc<CartStore>,
    checkout: CheckoutOrchestrator,
    notifier: Option<NotifierHandle>,
}

impl Session {
    /// Opens a session backed by the configured database and HTTP APIs.
    ///
    /// ## Startup Sequence
    /// ```text
    /// 1. Resolve database path (config, REVENDA_DB_PATH, or data dir)
    /// 2. Connect to SQLite, run migrations
    /// 3. Build the HTTP client (bearer token from config)
    /// 4. Restore the persisted cart
    /// 5. Start the cart activity notifier (only with a configured customer)
    /// ```
    pub async fn open(config: StorefrontConfig) -> Result<Self, ApiError> {
        let db_path = config
            .db_path()
            .ok_or_else(|| ApiError::internal("Could not determine a data directory"))?;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::internal(format!("Could not create {}: {}", parent.display(), e))
            })?;
        }

        info!(path = %db_path.display(), "Opening database");
        let db = Database::new(DbConfig::new(db_path.clone())).await?;

        let client = Arc::new(HttpClient::new(&config.api)?);
        info!(base_url = %client.base_url(), "API client ready");

        let services = CheckoutServices::http(client.clone());
        Ok(Session::with_services(config, db, services, client).await)
    }

    /// Opens a session over explicit collaborators.
    pub async fn with_services(
        config: StorefrontConfig,
        db: Database,
        services: CheckoutServices,
        tracker: Arc<dyn CartTracker>,
    ) -> Self {
        let config = ConfigState::new(config);
        let db = DbState::new(db);

        let mut cart = CartStore::restore(db.local_state(), config.pricing_rules().clone()).await;

        let notifier = match config.customer() {
            Some(customer) => {
                let handle =
                    CartActivityNotifier::new(tracker, config.checkout().cart_debounce()).start();
                cart = cart.with_activity(ActivitySink {
                    notifier: handle.clone(),
                    customer_id: customer.id.clone(),
                });
                Some(handle)
            }
            None => {
                warn!("No customer configured, abandoned-cart tracking is off");
                None
            }
        };

        let cart = Arc::new(cart);
        let checkout =
            CheckoutOrchestrator::new(services, db.local_state(), cart.clone(), config.clone());

        info!("Session opened");

        Session {
            db,
            config,
            cart,
            checkout,
            notifier,
        }
    }

    pub fn db(&self) -> &DbState {
        &self.db
    }

    pub fn config(&self) -> &ConfigState {
        &self.config
    }

    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    pub fn checkout(&self) -> &CheckoutOrchestrator {
        &self.checkout
    }

    /// Stops polling, flushes pending cart activity and closes the pool.
    pub async fn close(self) {
        self.checkout.shutdown().await;

        if let Some(notifier) = &self.notifier {
            // A wedged tracker can keep the queue full, so the shutdown send
            // shares the drain deadline
            let drain = async {
                notifier.shutdown().await?;
                notifier.stopped().await;
                Ok::<(), revenda_sync::SyncError>(())
            };
            match tokio::time::timeout(NOTIFIER_DRAIN_TIMEOUT, drain).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Cart activity notifier already stopped"),
                Err(_) => warn!("Cart activity notifier did not stop in time"),
            }
        }

        self.db.inner().close().await;
        info!("Session closed");
    }
}
