//! # Cart Store
//!
//! The session's cart: the one piece of mutable state shared by commands
//! and the checkout orchestrator.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Store Operations                                │
//! │                                                                         │
//! │  Operation            Cart change            Side effects               │
//! │  ─────────            ───────────            ────────────               │
//! │                                                                         │
//! │  add_to_cart ───────► qty+1 or insert ─────► persist, touched (5s)      │
//! │                                                                         │
//! │  update_quantity ───► qty = n ─────────────► persist, touched (5s)      │
//! │    (n <= 0) ────────► same as remove                                    │
//! │                                                                         │
//! │  remove_from_cart ──► drop line ───────────► persist, then              │
//! │    (absent id) ─────► nothing                  empty? cleared (now)     │
//! │                                                else   touched (5s)      │
//! │                                                                         │
//! │  clear_cart ────────► drop all ────────────► persist, cleared (now)     │
//! │                                                                         │
//! │  get_summary ───────► (read only) ─────────► pricing engine             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation holds the mutex across its persist, so writes reach the
//! database in the order they were applied. Notifications are queued with
//! a non-blocking send under the same lock, so a stalled tracker can only
//! cost dropped notifications, never a stuck cart. A failed persist or
//! notification is logged and the in-memory cart stays authoritative.

use revenda_core::{Cart, CoreResult, LineItem, PricingRules, PricingSummary, Product, ProductId};
use revenda_db::LocalStateRepository;
use revenda_sync::{CartActivity, NotifierHandle};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Where cart activity is reported, and for whom.
#[derive(Debug, Clone)]
pub struct ActivitySink {
    pub notifier: NotifierHandle,
    pub customer_id: String,
}

/// Session-owned cart with persistence and activity reporting.
#[derive(Debug)]
pub struct CartStore {
    cart: Mutex<Cart>,
    repo: LocalStateRepository,
    rules: PricingRules,
    activity: Option<ActivitySink>,
}

impl CartStore {
    /// Creates an empty store.
    pub fn new(repo: LocalStateRepository, rules: PricingRules) -> Self {
        CartStore {
            cart: Mutex::new(Cart::new()),
            repo,
            rules,
            activity: None,
        }
    }

    /// Reports cart activity through `sink`.
    pub fn with_activity(mut self, sink: ActivitySink) -> Self {
        self.activity = Some(sink);
        self
    }

    /// Creates a store holding the persisted cart.
    ///
    /// A missing or unreadable cart yields an empty one.
    pub async fn restore(repo: LocalStateRepository, rules: PricingRules) -> Self {
        let cart = match repo.load_cart().await {
            Ok(items) => Cart::from_items(items).unwrap_or_else(|e| {
                warn!(error = %e, "Persisted cart is invalid, starting empty");
                Cart::new()
            }),
            Err(e) => {
                warn!(error = %e, "Could not load persisted cart, starting empty");
                Cart::new()
            }
        };

        info!(items = cart.len(), "Cart restored");

        CartStore {
            cart: Mutex::new(cart),
            repo,
            rules,
            activity: None,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds one unit of `product`. Returns the line's new quantity.
    pub async fn add_to_cart(&self, product: &Product) -> CoreResult<i64> {
        let mut cart = self.cart.lock().await;
        let quantity = cart.add_product(product)?;
        debug!(product_id = product.id, quantity, "Added to cart");

        self.persist(&cart).await;
        self.report(&cart);
        Ok(quantity)
    }

    /// Removes a line. Removing a product that is not in the cart is a
    /// no-op.
    pub async fn remove_from_cart(&self, id: ProductId) -> CoreResult<()> {
        let mut cart = self.cart.lock().await;
        if !cart.remove_item(id) {
            debug!(product_id = id, "Product not in cart, nothing to remove");
            return Ok(());
        }
        debug!(product_id = id, "Removed from cart");

        self.persist(&cart).await;
        self.report(&cart);
        Ok(())
    }

    /// Sets a line's quantity. `quantity <= 0` removes the line.
    pub async fn update_quantity(&self, id: ProductId, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return self.remove_from_cart(id).await;
        }

        let mut cart = self.cart.lock().await;
        cart.update_quantity(id, quantity)?;
        debug!(product_id = id, quantity, "Updated cart quantity");

        self.persist(&cart).await;
        self.report(&cart);
        Ok(())
    }

    /// Empties the cart.
    pub async fn clear_cart(&self) {
        let mut cart = self.cart.lock().await;
        cart.clear();
        debug!("Cart cleared");

        self.persist(&cart).await;
        self.report(&cart);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Prices the current cart. Never cached.
    pub async fn get_summary(&self) -> PricingSummary {
        self.cart.lock().await.summary(&self.rules)
    }

    pub async fn items(&self) -> Vec<LineItem> {
        self.cart.lock().await.items().to_vec()
    }

    /// Items and their pricing, read under one lock.
    pub async fn snapshot(&self) -> (Vec<LineItem>, PricingSummary) {
        let cart = self.cart.lock().await;
        (cart.items().to_vec(), cart.summary(&self.rules))
    }

    pub fn rules(&self) -> &PricingRules {
        &self.rules
    }

    // =========================================================================
    // Side effects
    // =========================================================================

    async fn persist(&self, cart: &Cart) {
        if let Err(e) = self.repo.save_cart(cart.items()).await {
            warn!(error = %e, items = cart.len(), "Failed to persist cart");
        }
    }

    /// Empty cart: clear the tracker record now. Otherwise: debounced
    /// activity with the current snapshot.
    fn report(&self, cart: &Cart) {
        let Some(sink) = &self.activity else {
            return;
        };

        let result = if cart.is_empty() {
            sink.notifier.cleared(sink.customer_id.clone())
        } else {
            let summary = cart.summary(&self.rules);
            sink.notifier
                .touched(CartActivity {
                    customer_id: sink.customer_id.clone(),
                    items: cart.items().to_vec(),
                    total: summary.total_with_discount,
                    item_count: summary.item_count,
                })
        };

        if let Err(e) = result {
            warn!(error = %e, "Failed to report cart activity");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use revenda_core::{CoreError, Money};
    use revenda_db::{keys, Database, DbConfig};
    use revenda_sync::{CartActivityNotifier, CartTracker, SyncResult};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;
    use tokio::time::sleep;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Record(Vec<(ProductId, i64)>),
        Clear(String),
    }

    #[derive(Default)]
    struct FakeTracker {
        calls: StdMutex<Vec<Call>>,
    }

    impl FakeTracker {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CartTracker for FakeTracker {
        async fn record_activity(&self, activity: CartActivity) -> SyncResult<()> {
            let lines = activity.items.iter().map(|i| (i.id, i.quantity)).collect();
            self.calls.lock().unwrap().push(Call::Record(lines));
            Ok(())
        }

        async fn clear(&self, customer_id: &str) -> SyncResult<()> {
            self.calls.lock().unwrap().push(Call::Clear(customer_id.to_string()));
            Ok(())
        }
    }

    fn product(id: ProductId, name: &str, cents: i64) -> Product {
        Product {
            id,
            name: name.to_string(),
            table_price: Money::from_cents(cents),
        }
    }

    async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    // Real time: the SQLite worker thread does not cooperate with a paused clock
    const DEBOUNCE: Duration = Duration::from_millis(200);

    fn tracked(db: &Database, tracker: &Arc<FakeTracker>) -> CartStore {
        let notifier = CartActivityNotifier::new(tracker.clone(), DEBOUNCE).start();
        CartStore::new(db.local_state(), PricingRules::default()).with_activity(ActivitySink {
            notifier,
            customer_id: "cus_1".to_string(),
        })
    }

    #[tokio::test]
    async fn test_repeated_add_never_duplicates() {
        let db = database().await;
        let store = CartStore::new(db.local_state(), PricingRules::default());
        let serum = product(3, "Sérum", 12_990);

        assert_eq!(store.add_to_cart(&serum).await.unwrap(), 1);
        assert_eq!(store.add_to_cart(&serum).await.unwrap(), 2);

        let items = store.items().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_update_to_zero_is_remove() {
        let db = database().await;
        let a = CartStore::new(db.local_state(), PricingRules::default());
        a.add_to_cart(&product(1, "A", 100)).await.unwrap();
        a.add_to_cart(&product(2, "B", 200)).await.unwrap();
        a.update_quantity(1, 0).await.unwrap();

        let other = database().await;
        let b = CartStore::new(other.local_state(), PricingRules::default());
        b.add_to_cart(&product(1, "A", 100)).await.unwrap();
        b.add_to_cart(&product(2, "B", 200)).await.unwrap();
        b.remove_from_cart(1).await.unwrap();

        assert_eq!(a.items().await, b.items().await);
        assert!(matches!(
            a.update_quantity(9, 3).await,
            Err(CoreError::ItemNotInCart(9))
        ));
    }

    #[tokio::test]
    async fn test_removing_absent_product_changes_nothing() {
        let db = database().await;
        let tracker = Arc::new(FakeTracker::default());
        let store = tracked(&db, &tracker);
        store.add_to_cart(&product(1, "A", 100)).await.unwrap();
        sleep(DEBOUNCE * 3).await;
        let calls_before = tracker.calls();

        store.remove_from_cart(7).await.unwrap();
        store.update_quantity(7, 0).await.unwrap();
        sleep(DEBOUNCE * 3).await;

        assert_eq!(store.items().await.len(), 1);
        assert_eq!(db.local_state().load_cart().await.unwrap().len(), 1);
        assert_eq!(tracker.calls(), calls_before);
    }

    #[tokio::test]
    async fn test_restore_round_trip() {
        let db = database().await;
        let store = CartStore::new(db.local_state(), PricingRules::default());
        store.add_to_cart(&product(8, "Oferta Especial", 10_000)).await.unwrap();
        store.add_to_cart(&product(1, "Hidratante", 4_550)).await.unwrap();
        store.update_quantity(1, 4).await.unwrap();

        let restored = CartStore::restore(db.local_state(), PricingRules::default()).await;
        assert_eq!(restored.items().await, store.items().await);
        assert_eq!(restored.get_summary().await, store.get_summary().await);
    }

    #[tokio::test]
    async fn test_restore_corrupt_cart_is_empty() {
        let db = database().await;
        db.local_state()
            .put_json(keys::CART, &serde_json::json!("garbage"))
            .await
            .unwrap();

        let store = CartStore::restore(db.local_state(), PricingRules::default()).await;
        assert!(store.items().await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_memory_cart() {
        let db = database().await;
        let store = CartStore::new(db.local_state(), PricingRules::default());
        db.close().await;

        store.add_to_cart(&product(1, "A", 100)).await.unwrap();
        assert_eq!(store.items().await.len(), 1);
    }

    #[tokio::test]
    async fn test_summary_is_live() {
        let db = database().await;
        let store = CartStore::new(db.local_state(), PricingRules::default());
        store.add_to_cart(&product(1, "A", 10_000)).await.unwrap();
        assert_eq!(store.get_summary().await.total_with_discount, Money::from_cents(7_000));

        store.update_quantity(1, 2).await.unwrap();
        assert_eq!(store.get_summary().await.total_with_discount, Money::from_cents(14_000));
    }

    #[tokio::test]
    async fn test_edits_are_debounced() {
        let db = database().await;
        let tracker = Arc::new(FakeTracker::default());
        let store = tracked(&db, &tracker);

        store.add_to_cart(&product(1, "A", 100)).await.unwrap();
        store.add_to_cart(&product(1, "A", 100)).await.unwrap();
        store.add_to_cart(&product(2, "B", 200)).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        assert!(tracker.calls().is_empty());

        sleep(DEBOUNCE * 3).await;
        assert_eq!(tracker.calls(), vec![Call::Record(vec![(1, 2), (2, 1)])]);
    }

    #[tokio::test]
    async fn test_removing_last_item_clears_immediately() {
        let db = database().await;
        let tracker = Arc::new(FakeTracker::default());
        let store = tracked(&db, &tracker);

        store.add_to_cart(&product(1, "A", 100)).await.unwrap();
        store.remove_from_cart(1).await.unwrap();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(tracker.calls(), vec![Call::Clear("cus_1".to_string())]);

        // The earlier touch was cancelled
        sleep(DEBOUNCE * 3).await;
        assert_eq!(tracker.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_remove_is_debounced() {
        let db = database().await;
        let tracker = Arc::new(FakeTracker::default());
        let store = tracked(&db, &tracker);

        store.add_to_cart(&product(1, "A", 100)).await.unwrap();
        store.add_to_cart(&product(2, "B", 200)).await.unwrap();
        store.remove_from_cart(1).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        assert!(tracker.calls().is_empty());

        sleep(DEBOUNCE * 3).await;
        assert_eq!(tracker.calls(), vec![Call::Record(vec![(2, 1)])]);
    }

    #[tokio::test]
    async fn test_clear_cart_clears_tracker() {
        let db = database().await;
        let tracker = Arc::new(FakeTracker::default());
        let store = tracked(&db, &tracker);

        store.add_to_cart(&product(1, "A", 100)).await.unwrap();
        store.clear_cart().await;
        sleep(Duration::from_millis(50)).await;

        assert_eq!(tracker.calls(), vec![Call::Clear("cus_1".to_string())]);
        assert!(db.local_state().load_cart().await.unwrap().is_empty());
    }

    struct HungTracker;

    #[async_trait]
    impl CartTracker for HungTracker {
        async fn record_activity(&self, _activity: CartActivity) -> SyncResult<()> {
            std::future::pending().await
        }

        async fn clear(&self, _customer_id: &str) -> SyncResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_hung_tracker_never_blocks_cart_edits() {
        let db = database().await;
        let notifier = CartActivityNotifier::new(Arc::new(HungTracker), DEBOUNCE).start();
        let store = CartStore::new(db.local_state(), PricingRules::default()).with_activity(
            ActivitySink {
                notifier,
                customer_id: "cus_1".to_string(),
            },
        );

        // The first clear wedges the worker inside the tracker
        store.clear_cart().await;
        sleep(Duration::from_millis(20)).await;

        let edits = async {
            for i in 0..200 {
                store.add_to_cart(&product(1, "A", 100)).await.unwrap();
                if i % 2 == 0 {
                    store.update_quantity(1, 1).await.unwrap();
                }
            }
        };
        tokio::time::timeout(Duration::from_secs(5), edits)
            .await
            .expect("cart edits stalled behind the tracker");

        let (items, summary) = store.snapshot().await;
        assert_eq!(items.len(), 1);
        assert_eq!(summary.item_count, items[0].quantity);
    }
}
