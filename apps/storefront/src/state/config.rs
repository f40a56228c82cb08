//! # Configuration State
//!
//! Storefront configuration as loaded at startup, plus the pricing rules
//! derived from it.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`REVENDA_*`)
//! 2. Config file (`storefront.toml`)
//! 3. Defaults
//!
//! Read-only after initialization, so no mutex.

use revenda_core::{Customer, Kit, PricingRules, Rate};
use revenda_sync::{CheckoutSettings, StorefrontConfig};

/// Session configuration.
#[derive(Debug, Clone)]
pub struct ConfigState {
    config: StorefrontConfig,
    rules: PricingRules,
}

impl ConfigState {
    pub fn new(config: StorefrontConfig) -> Self {
        let rules = config.pricing_rules();
        ConfigState { config, rules }
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    pub fn pricing_rules(&self) -> &PricingRules {
        &self.rules
    }

    pub fn pix_rate(&self) -> Rate {
        self.rules.pix_discount
    }

    pub fn checkout(&self) -> &CheckoutSettings {
        &self.config.checkout
    }

    /// The signed-in reseller, if configured.
    pub fn customer(&self) -> Option<&Customer> {
        self.config.customer.as_ref()
    }

    /// Starter kit offered on a first order.
    pub fn starter_kit(&self) -> Option<&Kit> {
        self.config.checkout.starter_kit.as_ref()
    }
}

impl Default for ConfigState {
    fn default() -> Self {
        ConfigState::new(StorefrontConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revenda_core::{DiscountRule, ProductRule};

    #[test]
    fn test_rules_follow_config() {
        let mut config = StorefrontConfig::default();
        config.pricing.pix_discount_bps = 500;
        config.pricing.rules = vec![ProductRule {
            product_id: 42,
            rule: DiscountRule::NoDiscount,
        }];

        let state = ConfigState::new(config);
        assert_eq!(state.pix_rate(), Rate::from_bps(500));
        assert_eq!(state.pricing_rules().rule_for(42), Some(DiscountRule::NoDiscount));
        assert_eq!(state.pricing_rules().rule_for(8), None);
    }

    #[test]
    fn test_defaults() {
        let state = ConfigState::default();
        assert_eq!(state.pricing_rules(), &PricingRules::default());
        assert!(state.customer().is_none());
        assert!(state.starter_kit().is_none());
    }
}
