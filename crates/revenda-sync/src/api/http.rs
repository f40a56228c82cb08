//! # HTTP Client
//!
//! reqwest implementation of every collaborator trait.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST   /orders                        OrderApi::create_order           │
//! │  GET    /orders/:id                    OrderApi::get_order              │
//! │  PUT    /orders/:id                    OrderApi::update_order           │
//! │  POST   /orders/:id/sync               OrderApi::sync_order             │
//! │  PUT    /orders/:id/retry-payment      OrderApi::retry_payment          │
//! │  POST   /payments/process              PaymentApi::process_payment      │
//! │  POST   /coupons/validate              CouponApi::validate_coupon       │
//! │  POST   /commerce/orders               CommerceMirror (retried)         │
//! │  POST   /abandoned-carts               CartTracker (retried)            │
//! │  DELETE /abandoned-carts/:customer_id  CartTracker (retried)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the advisory calls (mirror, tracker) are retried with backoff. A
//! charge is never retried here: the orchestrator decides what happens
//! after a failed payment.

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use revenda_core::{Money, Order};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, warn};
use url::Url;

use super::{
    CartActivity, CartTracker, CommerceMirror, CouponApi, CouponValidation, MirrorOrder,
    NewOrder, OrderApi, OrderRef, OrderUpdate, PaymentApi, PaymentRequest, PaymentResponse,
};
use crate::config::ApiSettings;
use crate::error::{SyncError, SyncResult};

/// Header carrying the per-attempt charge key.
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// JSON-over-HTTPS client for every collaborator.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    /// Always ends with `/` so relative paths join under it.
    base_url: Url,
    token: Option<SecretString>,
    backoff: ExponentialBackoff,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Builds a client from the `[api]` settings.
    pub fn new(settings: &ApiSettings) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_base(&settings.base_url)?,
            token: settings
                .token
                .clone()
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            backoff: settings.backoff(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> SyncResult<RequestBuilder> {
        let url = self.endpoint(path)?;
        debug!(%method, %url, "API request");

        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> SyncResult<T> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> SyncResult<()> {
        check_status(builder.send().await?).await?;
        Ok(())
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> SyncResult<T> {
        self.send_json(self.request(Method::POST, path)?.json(body)).await
    }

    /// Runs an advisory call, retrying transient failures with backoff.
    async fn with_retry<F, Fut>(&self, operation: &'static str, mut call: F) -> SyncResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SyncResult<()>>,
    {
        let mut backoff = self.backoff.clone();
        backoff.reset();
        let mut attempt = 1u32;

        loop {
            match call().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() => match backoff.next_backoff() {
                    Some(delay) => {
                        warn!(
                            operation,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "Advisory call failed, retrying"
                        );
                        attempt += 1;
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }
}

/// Parses the base URL and makes sure it ends with `/`.
fn normalize_base(raw: &str) -> SyncResult<Url> {
    let mut url = Url::parse(raw)?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(SyncError::InvalidUrl(raw.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Turns non-2xx responses into errors carrying the API's message.
async fn check_status(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status, &url, &body))
}

fn error_from_body(status: StatusCode, path: &str, body: &str) -> SyncError {
    if status == StatusCode::NOT_FOUND {
        return SyncError::NotFound(path.to_string());
    }

    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    SyncError::Api {
        status: status.as_u16(),
        message,
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

#[async_trait]
impl OrderApi for HttpClient {
    async fn create_order(&self, order: NewOrder) -> SyncResult<OrderRef> {
        self.post_json("orders", &order).await
    }

    async fn get_order(&self, order_id: &str) -> SyncResult<Order> {
        self.send_json(self.request(Method::GET, &format!("orders/{}", order_id))?)
            .await
    }

    async fn update_order(&self, order_id: &str, update: OrderUpdate) -> SyncResult<Order> {
        let builder = self
            .request(Method::PUT, &format!("orders/{}", order_id))?
            .json(&update);
        self.send_json(builder).await
    }

    async fn sync_order(&self, order_id: &str) -> SyncResult<()> {
        self.send_empty(self.request(Method::POST, &format!("orders/{}/sync", order_id))?)
            .await
    }

    async fn retry_payment(&self, order_id: &str) -> SyncResult<()> {
        let path = format!("orders/{}/retry-payment", order_id);
        self.send_empty(self.request(Method::PUT, &path)?).await
    }
}

#[async_trait]
impl PaymentApi for HttpClient {
    async fn process_payment(&self, request: PaymentRequest) -> SyncResult<PaymentResponse> {
        let mut builder = self.request(Method::POST, "payments/process")?.json(&request);
        if let Some(key) = &request.idempotency_key {
            builder = builder.header(IDEMPOTENCY_HEADER, key);
        }
        self.send_json(builder).await
    }
}

#[async_trait]
impl CouponApi for HttpClient {
    async fn validate_coupon(&self, code: &str, order_total: Money) -> SyncResult<CouponValidation> {
        let body = serde_json::json!({ "code": code, "order_total": order_total });
        self.post_json("coupons/validate", &body).await
    }
}

#[async_trait]
impl CommerceMirror for HttpClient {
    async fn mirror_order(&self, order: MirrorOrder) -> SyncResult<()> {
        self.with_retry("mirror_order", || async {
            self.send_empty(self.request(Method::POST, "commerce/orders")?.json(&order))
                .await
        })
        .await
    }
}

#[async_trait]
impl CartTracker for HttpClient {
    async fn record_activity(&self, activity: CartActivity) -> SyncResult<()> {
        self.with_retry("record_cart_activity", || async {
            self.send_empty(self.request(Method::POST, "abandoned-carts")?.json(&activity))
                .await
        })
        .await
    }

    async fn clear(&self, customer_id: &str) -> SyncResult<()> {
        let path = format!("abandoned-carts/{}", customer_id);
        self.with_retry("clear_abandoned_cart", || async {
            self.send_empty(self.request(Method::DELETE, &path)?).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn client(base_url: &str) -> HttpClient {
        let settings = ApiSettings {
            base_url: base_url.to_string(),
            token: Some("secret-token".to_string()),
            initial_backoff_ms: 1,
            max_backoff_secs: 1,
            max_elapsed_secs: 1,
            ..Default::default()
        };
        HttpClient::new(&settings).unwrap()
    }

    #[test]
    fn test_endpoints_join_under_base_path() {
        let client = client("https://api.example.com/v1");
        assert_eq!(client.base_url().as_str(), "https://api.example.com/v1/");
        assert_eq!(
            client.endpoint("orders/ord-1/sync").unwrap().as_str(),
            "https://api.example.com/v1/orders/ord-1/sync"
        );
        assert_eq!(
            client.endpoint("/payments/process").unwrap().as_str(),
            "https://api.example.com/v1/payments/process"
        );
    }

    #[test]
    fn test_rejects_non_http_base() {
        let settings = ApiSettings {
            base_url: "ftp://api.example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpClient::new(&settings),
            Err(SyncError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", client("https://api.example.com"));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_error_body_message() {
        let err = error_from_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            "/payments/process",
            r#"{"error":"Cartão recusado"}"#,
        );
        assert!(matches!(
            err,
            SyncError::Api { status: 422, ref message } if message == "Cartão recusado"
        ));

        let err = error_from_body(StatusCode::BAD_GATEWAY, "/orders", "<html>");
        assert!(matches!(
            err,
            SyncError::Api { status: 502, ref message } if message == "Bad Gateway"
        ));

        let err = error_from_body(StatusCode::NOT_FOUND, "/orders/x", "");
        assert!(matches!(err, SyncError::NotFound(ref p) if p == "/orders/x"));
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let client = client("https://api.example.com");
        let calls = AtomicU32::new(0);

        let result = client
            .with_retry("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SyncError::Api {
                    status: 400,
                    message: "bad".into(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient_error() {
        let client = client("https://api.example.com");
        let calls = AtomicU32::new(0);

        let result = client
            .with_retry("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SyncError::ConnectionFailed("reset".into()))
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
