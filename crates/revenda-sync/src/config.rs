//! # Storefront Configuration
//!
//! Configuration for the collaborator APIs, the pricing rules and checkout
//! timings.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     REVENDA_API_URL=https://api.example.com                             │
//! │     REVENDA_API_TOKEN=...                                               │
//! │     REVENDA_DB_PATH=/var/lib/revenda/storefront.db                      │
//! │     REVENDA_PIX_POLL_SECS=5                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/storefront/storefront.toml (Linux)                        │
//! │     ~/Library/Application Support/com.revenda.storefront/... (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [api]
//! base_url = "https://api.example.com"
//! token = "..."
//! timeout_secs = 15
//!
//! [pricing]
//! high_ticket_threshold_cents = 1000000
//! base_discount_bps = 3000
//! high_ticket_discount_bps = 3500
//!
//! [[pricing.rules]]
//! product_id = 8
//! rule = { fixed = 7000 }
//!
//! [[pricing.rules]]
//! product_id = 999
//! rule = "no_discount"
//!
//! [checkout]
//! pix_poll_interval_secs = 5
//! pix_default_ttl_secs = 10800
//! cart_debounce_secs = 5
//!
//! [checkout.starter_kit]
//! id = 500
//! name = "Kit Inicial"
//! price = 19900
//!
//! [customer]
//! id = "cus_123"
//! name = "Maria Revendedora"
//! email = "maria@example.com"
//! ```

use revenda_core::pricing::{default_product_rules, InstallmentTier, PricingRules, ProductRule};
use revenda_core::{Customer, Kit, Money, Rate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// API Settings
// =============================================================================

/// Where the collaborator APIs live and how to call them.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL shared by the Order, Payment, Coupon, mirror and tracker
    /// endpoints.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for every call.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Initial backoff (milliseconds) for advisory retries.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff between advisory retries (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Give up on an advisory call after this long (seconds).
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_secs: u64,
}

impl std::fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .field("max_backoff_secs", &self.max_backoff_secs)
            .field("max_elapsed_secs", &self.max_elapsed_secs)
            .finish()
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}
fn default_timeout() -> u64 {
    15
}
fn default_initial_backoff() -> u64 {
    500
}
fn default_max_backoff() -> u64 {
    10
}
fn default_max_elapsed() -> u64 {
    30
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            token: None,
            timeout_secs: default_timeout(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_elapsed_secs: default_max_elapsed(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff policy for advisory calls (mirror, tracker).
    pub fn backoff(&self) -> backoff::ExponentialBackoff {
        backoff::ExponentialBackoff {
            initial_interval: Duration::from_millis(self.initial_backoff_ms),
            max_interval: Duration::from_secs(self.max_backoff_secs),
            max_elapsed_time: Some(Duration::from_secs(self.max_elapsed_secs)),
            ..Default::default()
        }
    }
}

// =============================================================================
// Pricing Settings
// =============================================================================

/// Discount tiers and the product rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSettings {
    #[serde(default = "default_threshold")]
    pub high_ticket_threshold_cents: i64,

    #[serde(default = "default_base_discount")]
    pub base_discount_bps: u32,

    #[serde(default = "default_high_ticket_discount")]
    pub high_ticket_discount_bps: u32,

    #[serde(default = "default_pix_discount")]
    pub pix_discount_bps: u32,

    #[serde(default = "default_close_to_unlock")]
    pub close_to_unlock_cents: i64,

    /// Products outside the standard tier.
    #[serde(default = "default_product_rules")]
    pub rules: Vec<ProductRule>,

    #[serde(default = "default_installment_tiers")]
    pub installment_tiers: Vec<InstallmentTier>,

    #[serde(default = "default_min_installments")]
    pub min_installments: u32,
}

fn default_threshold() -> i64 {
    1_000_000
}
fn default_base_discount() -> u32 {
    3000
}
fn default_high_ticket_discount() -> u32 {
    3500
}
fn default_pix_discount() -> u32 {
    300
}
fn default_close_to_unlock() -> i64 {
    200_000
}
fn default_installment_tiers() -> Vec<InstallmentTier> {
    PricingRules::default().installment_tiers
}
fn default_min_installments() -> u32 {
    3
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            high_ticket_threshold_cents: default_threshold(),
            base_discount_bps: default_base_discount(),
            high_ticket_discount_bps: default_high_ticket_discount(),
            pix_discount_bps: default_pix_discount(),
            close_to_unlock_cents: default_close_to_unlock(),
            rules: default_product_rules(),
            installment_tiers: default_installment_tiers(),
            min_installments: default_min_installments(),
        }
    }
}

impl PricingSettings {
    /// Builds the rules the pricing engine runs with.
    pub fn to_rules(&self) -> PricingRules {
        PricingRules {
            high_ticket_threshold: Money::from_cents(self.high_ticket_threshold_cents),
            base_discount: Rate::from_bps(self.base_discount_bps),
            high_ticket_discount: Rate::from_bps(self.high_ticket_discount_bps),
            pix_discount: Rate::from_bps(self.pix_discount_bps),
            close_to_unlock: Money::from_cents(self.close_to_unlock_cents),
            rules: self.rules.clone(),
            installment_tiers: self.installment_tiers.clone(),
            min_installments: self.min_installments,
        }
    }
}

// =============================================================================
// Checkout Settings
// =============================================================================

/// Timings for checkout and telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Interval between PIX status polls (seconds).
    #[serde(default = "default_poll_interval")]
    pub pix_poll_interval_secs: u64,

    /// PIX lifetime when the gateway does not send `expires_at` (seconds).
    #[serde(default = "default_pix_ttl")]
    pub pix_default_ttl_secs: u64,

    /// Quiet period before a cart-activity notification is sent (seconds).
    #[serde(default = "default_cart_debounce")]
    pub cart_debounce_secs: u64,

    /// Starter bundle offered on a reseller's first order.
    #[serde(default)]
    pub starter_kit: Option<Kit>,
}

fn default_poll_interval() -> u64 {
    5
}
fn default_pix_ttl() -> u64 {
    3 * 60 * 60
}
fn default_cart_debounce() -> u64 {
    5
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            pix_poll_interval_secs: default_poll_interval(),
            pix_default_ttl_secs: default_pix_ttl(),
            cart_debounce_secs: default_cart_debounce(),
            starter_kit: None,
        }
    }
}

impl CheckoutSettings {
    pub fn pix_poll_interval(&self) -> Duration {
        Duration::from_secs(self.pix_poll_interval_secs)
    }

    pub fn pix_default_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.pix_default_ttl_secs as i64)
    }

    pub fn cart_debounce(&self) -> Duration {
        Duration::from_secs(self.cart_debounce_secs)
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where local state lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete storefront configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    /// The signed-in reseller, as the Payment API and cart tracker see them.
    #[serde(default)]
    pub customer: Option<Customer>,
}

impl StorefrontConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (storefront.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading storefront config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load storefront config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Storefront config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let url = url::Url::parse(&self.api.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        for (name, value) in [
            ("api.timeout_secs", self.api.timeout_secs),
            ("checkout.pix_poll_interval_secs", self.checkout.pix_poll_interval_secs),
            ("checkout.pix_default_ttl_secs", self.checkout.pix_default_ttl_secs),
            ("checkout.cart_debounce_secs", self.checkout.cart_debounce_secs),
        ] {
            if value == 0 {
                return Err(SyncError::InvalidConfig(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        let pricing = &self.pricing;
        for (name, bps) in [
            ("pricing.base_discount_bps", pricing.base_discount_bps),
            ("pricing.high_ticket_discount_bps", pricing.high_ticket_discount_bps),
            ("pricing.pix_discount_bps", pricing.pix_discount_bps),
        ]
        .into_iter()
        .chain(pricing.rules.iter().map(|r| ("pricing.rules", r.rule.rate().bps())))
        {
            if bps > Rate::FULL.bps() {
                return Err(SyncError::InvalidConfig(format!(
                    "{} must be at most 10000 bps, got {}",
                    name, bps
                )));
            }
        }

        if pricing.high_ticket_threshold_cents < 0 || pricing.close_to_unlock_cents < 0 {
            return Err(SyncError::InvalidConfig(
                "pricing amounts cannot be negative".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("REVENDA_API_URL") {
            debug!(url = %url, "Overriding API URL from environment");
            self.api.base_url = url;
        }

        if let Some(token) = lookup("REVENDA_API_TOKEN") {
            debug!("Overriding API token from environment");
            self.api.token = Some(token);
        }

        if let Some(path) = lookup("REVENDA_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.db_path = Some(PathBuf::from(path));
        }

        if let Some(secs) = lookup("REVENDA_PIX_POLL_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.checkout.pix_poll_interval_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid REVENDA_PIX_POLL_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "revenda", "storefront")
            .map(|dirs| dirs.config_dir().join("storefront.toml"))
    }

    /// Database path: configured, or the platform data directory.
    pub fn db_path(&self) -> Option<PathBuf> {
        self.storage.db_path.clone().or_else(|| {
            directories::ProjectDirs::from("com", "revenda", "storefront")
                .map(|dirs| dirs.data_dir().join("storefront.db"))
        })
    }

    /// Pricing rules for the engine.
    pub fn pricing_rules(&self) -> PricingRules {
        self.pricing.to_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revenda_core::DiscountRule;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = StorefrontConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.checkout.pix_poll_interval_secs, 5);
        assert_eq!(config.checkout.pix_default_ttl_secs, 10_800);
        assert_eq!(config.pricing_rules(), PricingRules::default());
    }

    #[test]
    fn test_parse_toml_with_rules() {
        let toml_str = r#"
            [api]
            base_url = "https://api.example.com"
            token = "secret"

            [pricing]
            base_discount_bps = 2500

            [[pricing.rules]]
            product_id = 8
            rule = { fixed = 6000 }

            [[pricing.rules]]
            product_id = 999
            rule = "no_discount"

            [checkout]
            pix_poll_interval_secs = 3

            [checkout.starter_kit]
            id = 500
            name = "Kit Inicial"
            price = 19900

            [customer]
            id = "cus_1"
            name = "Maria"
            email = "maria@example.com"
        "#;

        let config: StorefrontConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.pricing.base_discount_bps, 2500);
        assert_eq!(config.pricing.high_ticket_discount_bps, 3500);
        assert_eq!(config.checkout.pix_poll_interval_secs, 3);
        assert_eq!(config.checkout.cart_debounce_secs, 5);
        assert_eq!(
            config.checkout.starter_kit.as_ref().map(|k| k.price),
            Some(Money::from_cents(19_900))
        );
        let customer = config.customer.as_ref().unwrap();
        assert_eq!(customer.id, "cus_1");
        assert_eq!(customer.document, None);

        let rules = config.pricing_rules();
        assert_eq!(
            rules.rule_for(8),
            Some(DiscountRule::Fixed(Rate::from_bps(6000)))
        );
        assert_eq!(rules.rule_for(999), Some(DiscountRule::NoDiscount));
    }

    #[test]
    fn test_config_validation() {
        let mut config = StorefrontConfig::default();

        config.api.base_url = "ftp://files.example.com".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        config.api.base_url = "https://api.example.com".to_string();
        config.checkout.pix_poll_interval_secs = 0;
        assert!(config.validate().is_err());

        config.checkout.pix_poll_interval_secs = 5;
        config.pricing.pix_discount_bps = 10_001;
        assert!(config.validate().is_err());

        config.pricing.pix_discount_bps = 300;
        config.pricing.rules.push(ProductRule {
            product_id: 1,
            rule: DiscountRule::Fixed(Rate::from_bps(20_000)),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("REVENDA_API_URL", "https://staging.example.com"),
            ("REVENDA_API_TOKEN", "tok"),
            ("REVENDA_DB_PATH", "/tmp/revenda.db"),
            ("REVENDA_PIX_POLL_SECS", "2"),
        ]
        .into_iter()
        .collect();

        let mut config = StorefrontConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://staging.example.com");
        assert_eq!(config.api.token.as_deref(), Some("tok"));
        assert_eq!(config.db_path(), Some(PathBuf::from("/tmp/revenda.db")));
        assert_eq!(config.checkout.pix_poll_interval_secs, 2);
    }

    #[test]
    fn test_invalid_poll_override_ignored() {
        let mut config = StorefrontConfig::default();
        config.apply_overrides(|k| (k == "REVENDA_PIX_POLL_SECS").then(|| "soon".to_string()));
        assert_eq!(config.checkout.pix_poll_interval_secs, 5);
    }

    #[test]
    fn test_token_redacted_in_debug() {
        let mut config = StorefrontConfig::default();
        config.api.token = Some("super-secret".to_string());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_toml_serialization() {
        let config = StorefrontConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[checkout]"));
        let back: StorefrontConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.pricing_rules(), PricingRules::default());
    }
}
