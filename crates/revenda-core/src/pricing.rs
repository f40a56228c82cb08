//! # Pricing Engine
//!
//! Turns a list of line items into a [`PricingSummary`]. Pure and
//! deterministic: the same items and rules always give the same summary.
//!
//! ## Two-Pass Tier Computation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PASS 1: what would this cost at the minimum discount?                  │
//! │                                                                         │
//! │    standard lines  ── base rate (30%) ──┐                               │
//! │    rule-table lines ── their own rule ──┼──► preliminary_total          │
//! │                                         │                               │
//! │  TIER:  is_high_ticket = preliminary_total > threshold (strict)         │
//! │                                                                         │
//! │  PASS 2: what does it actually cost?                                    │
//! │                                                                         │
//! │    standard lines  ── 35% if high-ticket, else 30% ──┐                  │
//! │    rule-table lines ── their own rule ───────────────┼──► total_with_   │
//! │                                                      │    discount      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tier must be decided on the pass-1 baseline. Deciding it on the final
//! total would move the threshold customers have to cross.
//!
//! ## Rule Table
//! Products that do not follow the standard tier are listed in
//! [`PricingRules::rules`]. The default table is the special-offer product
//! (id 8, fixed 70%) and the internal test product (id 999, no discount).
//!
//! ## Rounding
//! Each line's discount is computed on `table_price × quantity` and rounded
//! half-up to the centavo, then the lines are summed.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{LineItem, ProductId, Rate};

// =============================================================================
// Constants
// =============================================================================

/// Special-offer product, always 70% off.
pub const SPECIAL_OFFER_PRODUCT_ID: ProductId = 8;

/// Internal test product, never discounted.
pub const TEST_PRODUCT_ID: ProductId = 999;

// =============================================================================
// Rule Table
// =============================================================================

/// How a product in the rule table is discounted.
///
/// ## TOML
/// ```toml
/// [[pricing.rules]]
/// product_id = 8
/// rule = { fixed = 7000 }
///
/// [[pricing.rules]]
/// product_id = 999
/// rule = "no_discount"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountRule {
    /// Same rate in both passes, whatever the tier.
    Fixed(Rate),
    /// Priced at table price in both passes.
    NoDiscount,
}

impl DiscountRule {
    #[inline]
    pub const fn rate(&self) -> Rate {
        match self {
            DiscountRule::Fixed(rate) => *rate,
            DiscountRule::NoDiscount => Rate::zero(),
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductRule {
    pub product_id: ProductId,
    pub rule: DiscountRule,
}

/// Minimum discounted total needed for an installment count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InstallmentTier {
    pub min_total: Money,
    pub installments: u32,
}

/// Everything the engine needs besides the items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRules {
    /// `preliminary_total` must be strictly above this to be high-ticket.
    pub high_ticket_threshold: Money,
    /// Standard rate used in pass 1, and in pass 2 for regular orders.
    pub base_discount: Rate,
    /// Standard rate used in pass 2 for high-ticket orders.
    pub high_ticket_discount: Rate,
    pub pix_discount: Rate,
    /// Gap to the threshold at or below which the customer is nudged.
    pub close_to_unlock: Money,
    /// Products that skip the standard tier.
    pub rules: Vec<ProductRule>,
    /// Checked highest `min_total` first.
    pub installment_tiers: Vec<InstallmentTier>,
    /// Installments when no tier matches.
    pub min_installments: u32,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            high_ticket_threshold: Money::from_reais(10_000, 0),
            base_discount: Rate::from_percent(30),
            high_ticket_discount: Rate::from_percent(35),
            pix_discount: Rate::from_percent(3),
            close_to_unlock: Money::from_reais(2_000, 0),
            rules: default_product_rules(),
            installment_tiers: vec![
                InstallmentTier {
                    min_total: Money::from_reais(10_000, 0),
                    installments: 6,
                },
                InstallmentTier {
                    min_total: Money::from_reais(5_000, 0),
                    installments: 5,
                },
            ],
            min_installments: 3,
        }
    }
}

/// The special-offer and test-product carve-outs.
pub fn default_product_rules() -> Vec<ProductRule> {
    vec![
        ProductRule {
            product_id: SPECIAL_OFFER_PRODUCT_ID,
            rule: DiscountRule::Fixed(Rate::from_percent(70)),
        },
        ProductRule {
            product_id: TEST_PRODUCT_ID,
            rule: DiscountRule::NoDiscount,
        },
    ]
}

impl PricingRules {
    /// Rule-table entry for a product. First match wins.
    pub fn rule_for(&self, product_id: ProductId) -> Option<DiscountRule> {
        self.rules
            .iter()
            .find(|r| r.product_id == product_id)
            .map(|r| r.rule)
    }

    /// Rate reported as `discount_modelat`: the first fixed-rate rule.
    pub fn special_rate(&self) -> Rate {
        self.rules
            .iter()
            .find_map(|r| match r.rule {
                DiscountRule::Fixed(rate) => Some(rate),
                DiscountRule::NoDiscount => None,
            })
            .unwrap_or_default()
    }

    /// Standard rate for the given tier.
    #[inline]
    pub fn standard_rate(&self, high_ticket: bool) -> Rate {
        if high_ticket {
            self.high_ticket_discount
        } else {
            self.base_discount
        }
    }

    /// Discounted total of one line given the tier's standard rate.
    pub fn line_total(&self, item: &LineItem, standard: Rate) -> Money {
        let rate = match self.rule_for(item.id) {
            Some(rule) => rule.rate(),
            None => standard,
        };
        item.table_total().apply_discount(rate)
    }

    /// Installment cap for a discounted total.
    pub fn max_installments(&self, total: Money) -> u32 {
        let mut tiers: Vec<&InstallmentTier> = self.installment_tiers.iter().collect();
        tiers.sort_by(|a, b| b.min_total.cmp(&a.min_total));
        tiers
            .into_iter()
            .find(|t| total >= t.min_total)
            .map(|t| t.installments)
            .unwrap_or(self.min_installments)
    }

    fn discounted_total(&self, items: &[LineItem], standard: Rate) -> Money {
        items.iter().map(|i| self.line_total(i, standard)).sum()
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Derived pricing of a cart. Recomputed on every read, never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingSummary {
    /// Σ `table_price × quantity`, no discount.
    pub total_table: Money,
    /// Pass-1 total, only used to decide the tier.
    pub preliminary_total: Money,
    pub is_high_ticket: bool,
    /// Standard rate actually applied.
    pub discount_standard: Rate,
    /// Special-offer rate.
    pub discount_modelat: Rate,
    pub total_with_discount: Money,
    pub pix_discount: Money,
    pub total_with_pix: Money,
    pub max_installments: u32,
    /// Σ quantities.
    pub item_count: i64,
    pub remaining_to_unlock_35: Money,
    pub is_close_to_unlock: bool,
}

/// Prices a cart.
///
/// Items with a quantity of zero must already have been removed by the
/// caller.
///
/// ## Example
/// ```rust
/// use revenda_core::money::Money;
/// use revenda_core::pricing::{compute_summary, PricingRules};
/// use revenda_core::types::LineItem;
///
/// let items = vec![LineItem {
///     id: 1,
///     name: "Creme".to_string(),
///     table_price: Money::from_reais(1_000, 0),
///     quantity: 2,
/// }];
/// let summary = compute_summary(&items, &PricingRules::default());
/// assert_eq!(summary.total_with_discount, Money::from_reais(1_400, 0));
/// assert_eq!(summary.max_installments, 3);
/// ```
pub fn compute_summary(items: &[LineItem], rules: &PricingRules) -> PricingSummary {
    let total_table: Money = items.iter().map(LineItem::table_total).sum();
    let item_count: i64 = items.iter().map(|i| i.quantity).sum();

    // Pass 1
    let preliminary_total = rules.discounted_total(items, rules.base_discount);
    let is_high_ticket = preliminary_total > rules.high_ticket_threshold;

    // Pass 2
    let discount_standard = rules.standard_rate(is_high_ticket);
    let total_with_discount = rules.discounted_total(items, discount_standard);

    let pix_discount = total_with_discount.portion(rules.pix_discount);
    let total_with_pix = total_with_discount - pix_discount;

    let remaining_to_unlock_35 = if is_high_ticket {
        Money::zero()
    } else {
        (rules.high_ticket_threshold - preliminary_total).non_negative()
    };

    PricingSummary {
        total_table,
        preliminary_total,
        is_high_ticket,
        discount_standard,
        discount_modelat: rules.special_rate(),
        total_with_discount,
        pix_discount,
        total_with_pix,
        max_installments: rules.max_installments(total_with_discount),
        item_count,
        remaining_to_unlock_35,
        is_close_to_unlock: !is_high_ticket && remaining_to_unlock_35 <= rules.close_to_unlock,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ProductId, cents: i64, quantity: i64) -> LineItem {
        LineItem {
            id,
            name: format!("Produto {}", id),
            table_price: Money::from_cents(cents),
            quantity,
        }
    }

    #[test]
    fn test_empty_cart() {
        let summary = compute_summary(&[], &PricingRules::default());
        assert_eq!(summary.total_table, Money::zero());
        assert_eq!(summary.preliminary_total, Money::zero());
        assert_eq!(summary.total_with_discount, Money::zero());
        assert_eq!(summary.total_with_pix, Money::zero());
        assert_eq!(summary.item_count, 0);
        assert!(!summary.is_high_ticket);
        assert_eq!(summary.max_installments, 3);
    }

    #[test]
    fn test_deterministic() {
        let rules = PricingRules::default();
        let items = vec![item(1, 4_990, 3), item(8, 12_000, 1), item(999, 100, 2)];
        assert_eq!(compute_summary(&items, &rules), compute_summary(&items, &rules));
    }

    #[test]
    fn test_threshold_is_strict() {
        let rules = PricingRules::default();

        // 14285.72 at 30% off lands exactly on 10000.00
        let summary = compute_summary(&[item(1, 1_428_572, 1)], &rules);
        assert_eq!(summary.preliminary_total.cents(), 1_000_000);
        assert!(!summary.is_high_ticket);
        assert_eq!(summary.discount_standard, Rate::from_percent(30));
        assert_eq!(summary.total_with_discount.cents(), 1_000_000);
        assert_eq!(summary.remaining_to_unlock_35, Money::zero());
        assert!(summary.is_close_to_unlock);

        // One centavo above
        let summary = compute_summary(&[item(1, 1_428_573, 1)], &rules);
        assert_eq!(summary.preliminary_total.cents(), 1_000_001);
        assert!(summary.is_high_ticket);
        assert_eq!(summary.discount_standard, Rate::from_percent(35));
        // 1_428_573 * 0.35 = 500_000.55 -> 500_001 off
        assert_eq!(summary.total_with_discount.cents(), 928_572);
        assert_eq!(summary.remaining_to_unlock_35, Money::zero());
        assert!(!summary.is_close_to_unlock);
    }

    #[test]
    fn test_special_offer_ignores_tier() {
        let rules = PricingRules::default();

        let alone = compute_summary(&[item(8, 10_000, 1)], &rules);
        assert_eq!(alone.total_with_discount.cents(), 3_000);

        let with_big_order = compute_summary(&[item(8, 10_000, 1), item(1, 2_000_000, 1)], &rules);
        assert!(with_big_order.is_high_ticket);
        assert_eq!(with_big_order.total_with_discount.cents(), 3_000 + 1_300_000);
        assert_eq!(with_big_order.discount_modelat, Rate::from_percent(70));
    }

    #[test]
    fn test_test_product_never_discounted() {
        let rules = PricingRules::default();
        let summary = compute_summary(&[item(999, 1_000, 3)], &rules);
        assert_eq!(summary.preliminary_total.cents(), 3_000);
        assert_eq!(summary.total_with_discount.cents(), 3_000);

        let summary = compute_summary(&[item(999, 1_000, 3), item(1, 2_000_000, 1)], &rules);
        assert!(summary.is_high_ticket);
        assert_eq!(summary.total_with_discount.cents(), 3_000 + 1_300_000);
    }

    #[test]
    fn test_tier_decided_on_base_pass() {
        let rules = PricingRules::default();
        // Base pass: 1_450_000 * 0.7 = 1_015_000 > threshold
        // Final pass at 35% drops below the threshold, tier still holds.
        let summary = compute_summary(&[item(1, 1_450_000, 1)], &rules);
        assert!(summary.is_high_ticket);
        assert_eq!(summary.total_with_discount.cents(), 942_500);
        assert_eq!(summary.max_installments, 5);
    }

    #[test]
    fn test_installment_tiers() {
        let rules = PricingRules::default();
        assert_eq!(rules.max_installments(Money::from_cents(499_999)), 3);
        assert_eq!(rules.max_installments(Money::from_cents(500_000)), 5);
        assert_eq!(rules.max_installments(Money::from_cents(999_999)), 5);
        assert_eq!(rules.max_installments(Money::from_cents(1_000_000)), 6);
    }

    #[test]
    fn test_pix_discount_and_counts() {
        let rules = PricingRules::default();
        // 2 x 50.00 at 30% = 70.00; pix 3% = 2.10
        let summary = compute_summary(&[item(1, 5_000, 2)], &rules);
        assert_eq!(summary.total_table.cents(), 10_000);
        assert_eq!(summary.total_with_discount.cents(), 7_000);
        assert_eq!(summary.pix_discount.cents(), 210);
        assert_eq!(summary.total_with_pix.cents(), 6_790);
        assert_eq!(summary.item_count, 2);
    }

    #[test]
    fn test_close_to_unlock() {
        let rules = PricingRules::default();
        // preliminary 7_000.00 -> 3_000.00 away
        let far = compute_summary(&[item(1, 1_000_000, 1)], &rules);
        assert_eq!(far.remaining_to_unlock_35.cents(), 300_000);
        assert!(!far.is_close_to_unlock);

        // preliminary 8_400.00 -> 1_600.00 away
        let close = compute_summary(&[item(1, 1_200_000, 1)], &rules);
        assert_eq!(close.remaining_to_unlock_35.cents(), 160_000);
        assert!(close.is_close_to_unlock);
    }

    #[test]
    fn test_custom_rule_table() {
        let mut rules = PricingRules::default();
        rules.rules.push(ProductRule {
            product_id: 42,
            rule: DiscountRule::Fixed(Rate::from_percent(50)),
        });
        let summary = compute_summary(&[item(42, 1_000, 1)], &rules);
        assert_eq!(summary.total_with_discount.cents(), 500);
        assert_eq!(rules.rule_for(999), Some(DiscountRule::NoDiscount));
        assert_eq!(rules.rule_for(1), None);
    }

    #[test]
    fn test_rule_serialization() {
        let fixed: ProductRule =
            serde_json::from_str(r#"{"product_id":8,"rule":{"fixed":7000}}"#).unwrap();
        assert_eq!(fixed.rule, DiscountRule::Fixed(Rate::from_bps(7000)));

        let none: ProductRule =
            serde_json::from_str(r#"{"product_id":999,"rule":"no_discount"}"#).unwrap();
        assert_eq!(none.rule, DiscountRule::NoDiscount);
    }
}
