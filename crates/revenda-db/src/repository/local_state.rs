//! # Local State Repository
//!
//! Key/value store of JSON documents for the client session.
//!
//! ## Keys
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  key                   value                     written by             │
//! │  ───────────────────   ───────────────────────   ─────────────────────  │
//! │  cart                  [LineItem, ...]           every cart mutation    │
//! │  pending_order_id      "ord_..."                 ensure_order           │
//! │  payment_in_flight     PaymentInFlight           charge start           │
//! │  last_order_snapshot   Order                     ensure_order, approval │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A missing key reads as `None`. A value that fails to decode is reported
//! as `DbError::Corrupt` and the caller decides whether to fall back.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use revenda_core::{LineItem, Money, Order, PaymentMethod};

/// Well-known state keys.
pub mod keys {
    pub const CART: &str = "cart";
    pub const PENDING_ORDER_ID: &str = "pending_order_id";
    pub const PAYMENT_IN_FLIGHT: &str = "payment_in_flight";
    pub const LAST_ORDER_SNAPSHOT: &str = "last_order_snapshot";
}

/// A charge request that was sent and whose outcome is not recorded yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInFlight {
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    /// Sent as the idempotency key of the charge request.
    pub attempt_id: String,
    pub started_at: DateTime<Utc>,
}

impl PaymentInFlight {
    pub fn new(order_id: impl Into<String>, method: PaymentMethod, amount: Money) -> Self {
        Self {
            order_id: order_id.into(),
            method,
            amount,
            attempt_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }
}

/// Repository for the `local_state` table.
#[derive(Debug, Clone)]
pub struct LocalStateRepository {
    pool: SqlitePool,
}

impl LocalStateRepository {
    /// Creates a new LocalStateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LocalStateRepository { pool }
    }

    // =========================================================================
    // Generic JSON access
    // =========================================================================

    /// Reads and decodes the value stored under `key`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT value FROM local_state WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| DbError::corrupt(key, e)),
            None => Ok(None),
        }
    }

    /// Encodes and stores `value` under `key`, replacing any previous value.
    pub async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> DbResult<()> {
        let raw = serde_json::to_string(value).map_err(|e| DbError::corrupt(key, e))?;

        debug!(key = %key, bytes = raw.len(), "Writing local state");

        sqlx::query(
            r#"
            INSERT INTO local_state (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes `key`. Returns whether a value was present.
    pub async fn delete(&self, key: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM local_state WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Loads the persisted cart lines. A missing cart is empty.
    pub async fn load_cart(&self) -> DbResult<Vec<LineItem>> {
        Ok(self.get_json(keys::CART).await?.unwrap_or_default())
    }

    /// Persists the cart lines in order.
    pub async fn save_cart(&self, items: &[LineItem]) -> DbResult<()> {
        self.put_json(keys::CART, items).await
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    pub async fn pending_order_id(&self) -> DbResult<Option<String>> {
        self.get_json(keys::PENDING_ORDER_ID).await
    }

    pub async fn set_pending_order_id(&self, order_id: &str) -> DbResult<()> {
        self.put_json(keys::PENDING_ORDER_ID, order_id).await
    }

    pub async fn clear_pending_order_id(&self) -> DbResult<()> {
        self.delete(keys::PENDING_ORDER_ID).await.map(|_| ())
    }

    pub async fn payment_in_flight(&self) -> DbResult<Option<PaymentInFlight>> {
        self.get_json(keys::PAYMENT_IN_FLIGHT).await
    }

    pub async fn set_payment_in_flight(&self, payment: &PaymentInFlight) -> DbResult<()> {
        self.put_json(keys::PAYMENT_IN_FLIGHT, payment).await
    }

    pub async fn clear_payment_in_flight(&self) -> DbResult<()> {
        self.delete(keys::PAYMENT_IN_FLIGHT).await.map(|_| ())
    }

    pub async fn last_order_snapshot(&self) -> DbResult<Option<Order>> {
        self.get_json(keys::LAST_ORDER_SNAPSHOT).await
    }

    pub async fn save_order_snapshot(&self, order: &Order) -> DbResult<()> {
        self.put_json(keys::LAST_ORDER_SNAPSHOT, order).await
    }

    /// Removes the pending order id and in-flight payment together.
    ///
    /// Called once an order is paid, so the next checkout starts fresh.
    pub async fn clear_checkout_state(&self) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM local_state WHERE key IN (?1, ?2)")
            .bind(keys::PENDING_ORDER_ID)
            .bind(keys::PAYMENT_IN_FLIGHT)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!("Cleared pending order and in-flight payment");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use revenda_core::OrderStatus;

    async fn repo() -> LocalStateRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.local_state()
    }

    fn line(id: i64, name: &str, cents: i64, quantity: i64) -> LineItem {
        LineItem {
            id,
            name: name.to_string(),
            table_price: Money::from_cents(cents),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_cart_round_trip_preserves_order() {
        let repo = repo().await;
        let items = vec![
            line(3, "Sérum Vitamina C", 12_990, 2),
            line(1, "Hidratante", 4_550, 1),
            line(999, "Produto Teste", 100, 5),
        ];

        repo.save_cart(&items).await.unwrap();
        let loaded = repo.load_cart().await.unwrap();

        assert_eq!(loaded, items);
    }

    #[tokio::test]
    async fn test_missing_cart_is_empty() {
        let repo = repo().await;
        assert!(repo.load_cart().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let repo = repo().await;
        repo.save_cart(&[line(1, "A", 100, 1)]).await.unwrap();
        repo.save_cart(&[]).await.unwrap();
        assert!(repo.load_cart().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_value_is_reported() {
        let repo = repo().await;
        repo.put_json(keys::CART, &serde_json::json!({"not": "a list"}))
            .await
            .unwrap();

        let err = repo.load_cart().await.unwrap_err();
        assert!(matches!(err, DbError::Corrupt { ref key, .. } if key == "cart"));
    }

    #[tokio::test]
    async fn test_pending_order_id() {
        let repo = repo().await;
        assert_eq!(repo.pending_order_id().await.unwrap(), None);

        repo.set_pending_order_id("ord-42").await.unwrap();
        assert_eq!(repo.pending_order_id().await.unwrap().as_deref(), Some("ord-42"));

        repo.clear_pending_order_id().await.unwrap();
        assert_eq!(repo.pending_order_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_checkout_state() {
        let repo = repo().await;
        repo.set_pending_order_id("ord-1").await.unwrap();
        repo.set_payment_in_flight(&PaymentInFlight::new(
            "ord-1",
            PaymentMethod::Pix,
            Money::from_cents(6_790),
        ))
        .await
        .unwrap();
        repo.save_cart(&[line(1, "A", 100, 1)]).await.unwrap();

        repo.clear_checkout_state().await.unwrap();

        assert_eq!(repo.pending_order_id().await.unwrap(), None);
        assert_eq!(repo.payment_in_flight().await.unwrap(), None);
        // Cart is cleared by the cart store, not here
        assert_eq!(repo.load_cart().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_order_snapshot() {
        let repo = repo().await;
        let order = Order {
            id: "ord-7".to_string(),
            order_number: Some("1007".to_string()),
            status: OrderStatus::Paid,
            total: Money::from_cents(7_000),
            details: serde_json::json!({"items": []}),
            address_id: Some("addr-1".to_string()),
            payment_method: Some(PaymentMethod::CreditCard),
            installments: Some(3),
            gateway_status: Some("approved".to_string()),
        };

        repo.save_order_snapshot(&order).await.unwrap();
        assert_eq!(repo.last_order_snapshot().await.unwrap(), Some(order));
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let repo = repo().await;
        assert!(!repo.delete("anything").await.unwrap());
        repo.put_json("anything", &1).await.unwrap();
        assert!(repo.delete("anything").await.unwrap());
    }
}
