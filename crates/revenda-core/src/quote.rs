//! # Charge Quote
//!
//! What the customer is actually charged once the kit, coupon and
//! commission credit are applied on top of the priced cart.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  gross   = summary.total_with_discount + kit.price                      │
//! │  coupon  = min(coupon.discount, gross)                                  │
//! │  credit  = min(credit, gross − coupon)                                  │
//! │  payable = gross − coupon − credit            (never below zero)        │
//! │                                                                         │
//! │  card_amount = payable                                                  │
//! │  pix_amount  = payable − pix_rate × payable                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::pricing::PricingSummary;
use crate::types::{AppliedCoupon, Kit, PaymentMethod, Rate};

/// Amounts to charge for one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChargeQuote {
    pub total_with_discount: Money,
    pub kit_price: Money,
    pub gross: Money,
    /// Coupon discount actually used.
    pub coupon_discount: Money,
    /// Commission credit actually used.
    pub credit_applied: Money,
    pub payable: Money,
    pub pix_discount: Money,
    pub pix_amount: Money,
    pub card_amount: Money,
    pub max_installments: u32,
}

impl ChargeQuote {
    pub fn build(
        summary: &PricingSummary,
        kit: Option<&Kit>,
        coupon: Option<&AppliedCoupon>,
        credit: Money,
        pix_rate: Rate,
    ) -> Self {
        let kit_price = kit.map(|k| k.price.non_negative()).unwrap_or_default();
        let gross = summary.total_with_discount + kit_price;

        let coupon_discount = coupon
            .map(|c| c.discount.non_negative().min(gross))
            .unwrap_or_default();
        let credit_applied = credit.non_negative().min(gross - coupon_discount);
        let payable = (gross - coupon_discount - credit_applied).non_negative();

        let pix_discount = payable.portion(pix_rate);

        Self {
            total_with_discount: summary.total_with_discount,
            kit_price,
            gross,
            coupon_discount,
            credit_applied,
            payable,
            pix_discount,
            pix_amount: payable - pix_discount,
            card_amount: payable,
            max_installments: summary.max_installments,
        }
    }

    /// Amount sent to the Payment API for a method.
    #[inline]
    pub fn amount_for(&self, method: PaymentMethod) -> Money {
        match method {
            PaymentMethod::CreditCard => self.card_amount,
            PaymentMethod::Pix => self.pix_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{compute_summary, PricingRules};
    use crate::types::LineItem;

    fn summary_for(cents: i64) -> PricingSummary {
        let items = vec![LineItem {
            id: 1,
            name: "Produto".to_string(),
            table_price: Money::from_cents(cents),
            quantity: 1,
        }];
        compute_summary(&items, &PricingRules::default())
    }

    fn kit(cents: i64) -> Kit {
        Kit {
            id: 500,
            name: "Kit Inicial".to_string(),
            price: Money::from_cents(cents),
        }
    }

    #[test]
    fn test_plain_quote() {
        // 100.00 at 30% = 70.00
        let quote = ChargeQuote::build(&summary_for(10_000), None, None, Money::zero(), Rate::from_bps(300));
        assert_eq!(quote.gross.cents(), 7_000);
        assert_eq!(quote.card_amount.cents(), 7_000);
        assert_eq!(quote.pix_amount.cents(), 6_790);
        assert_eq!(quote.amount_for(PaymentMethod::Pix).cents(), 6_790);
    }

    #[test]
    fn test_kit_is_not_discounted() {
        let quote = ChargeQuote::build(
            &summary_for(10_000),
            Some(&kit(5_000)),
            None,
            Money::zero(),
            Rate::from_bps(300),
        );
        assert_eq!(quote.kit_price.cents(), 5_000);
        assert_eq!(quote.gross.cents(), 12_000);
        assert_eq!(quote.card_amount.cents(), 12_000);
    }

    #[test]
    fn test_coupon_and_credit() {
        let coupon = AppliedCoupon {
            code: "BEMVINDA".to_string(),
            discount: Money::from_cents(1_000),
        };
        let quote = ChargeQuote::build(
            &summary_for(10_000),
            None,
            Some(&coupon),
            Money::from_cents(2_000),
            Rate::from_bps(300),
        );
        assert_eq!(quote.payable.cents(), 4_000);
        assert_eq!(quote.pix_discount.cents(), 120);
        assert_eq!(quote.pix_amount.cents(), 3_880);
    }

    #[test]
    fn test_payable_never_negative() {
        let coupon = AppliedCoupon {
            code: "TUDO".to_string(),
            discount: Money::from_cents(5_000),
        };
        let quote = ChargeQuote::build(
            &summary_for(10_000),
            None,
            Some(&coupon),
            Money::from_cents(9_000),
            Rate::from_bps(300),
        );
        assert_eq!(quote.coupon_discount.cents(), 5_000);
        // Credit capped at what was still due
        assert_eq!(quote.credit_applied.cents(), 2_000);
        assert_eq!(quote.payable, Money::zero());
        assert_eq!(quote.pix_amount, Money::zero());
    }
}
