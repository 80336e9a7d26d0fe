//! Order pricing: per-line net/tax/gross amounts and order totals.
//!
//! Everything here is pure. Line amounts are rounded to cents before they are
//! summed, and the order tax is the sum of the already-rounded line taxes.

use super::money::{Money, Quantity};
use super::tax::TaxPolicy;
use crate::error::{Result, ShopError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Flat shipping charged below the free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRule {
    pub free_shipping_threshold: Decimal,
    pub flat_rate: Decimal,
}

impl ShippingRule {
    pub fn cost_for(&self, subtotal_net: Money) -> Money {
        if subtotal_net.value() >= self.free_shipping_threshold {
            Money::ZERO
        } else {
            Money::new(self.flat_rate)
        }
    }
}

impl Default for ShippingRule {
    fn default() -> Self {
        Self {
            free_shipping_threshold: dec!(75.00),
            flat_rate: dec!(7.99),
        }
    }
}

/// Input line for pricing: a snapshotted unit price and a requested quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceableItem {
    pub unit_net_price: Money,
    pub quantity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub unit_net_price: Money,
    pub quantity: Quantity,
    pub line_net: Money,
    pub line_tax: Money,
    pub line_gross: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSummary {
    pub lines: Vec<PricedLine>,
    pub subtotal_net: Money,
    pub tax_amount: Money,
    pub shipping_cost: Money,
    pub total_gross: Money,
}

#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    shipping: ShippingRule,
}

impl PricingEngine {
    pub fn new(shipping: ShippingRule) -> Self {
        Self { shipping }
    }

    pub fn shipping(&self) -> &ShippingRule {
        &self.shipping
    }

    /// Prices `items` in order under `policy`.
    ///
    /// Fails with a validation error on an empty item list, any
    /// non-positive quantity, or an amount too large to represent.
    pub fn price(&self, items: &[PriceableItem], policy: &TaxPolicy) -> Result<PriceSummary> {
        if items.is_empty() {
            return Err(ShopError::validation(
                "Order must contain at least one item",
            ));
        }

        let lines = items
            .iter()
            .map(|item| {
                let quantity = Quantity::new(item.quantity)?;
                let line_net = item.unit_net_price.times(quantity.get())?;
                let line_tax = policy.tax(line_net)?;
                Ok(PricedLine {
                    unit_net_price: item.unit_net_price,
                    quantity,
                    line_net,
                    line_tax,
                    line_gross: line_net.checked_add(line_tax)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let subtotal_net = Money::total(lines.iter().map(|l| l.line_net))?;
        let tax_amount = Money::total(lines.iter().map(|l| l.line_tax))?;
        let shipping_cost = self.shipping.cost_for(subtotal_net);
        let total_gross = Money::total([subtotal_net, tax_amount, shipping_cost])?;

        Ok(PriceSummary {
            lines,
            subtotal_net,
            tax_amount,
            shipping_cost,
            total_gross,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tax::TaxPolicyRegistry;

    fn item(price: Decimal, quantity: i64) -> PriceableItem {
        PriceableItem {
            unit_net_price: Money::new(price),
            quantity,
        }
    }

    #[test]
    fn test_single_line_with_shipping() {
        let registry = TaxPolicyRegistry::standard();
        let summary = PricingEngine::default()
            .price(&[item(dec!(10.00), 2)], registry.resolve("AT"))
            .unwrap();

        assert_eq!(summary.lines[0].line_net, Money::new(dec!(20.00)));
        assert_eq!(summary.lines[0].line_tax, Money::new(dec!(4.00)));
        assert_eq!(summary.lines[0].line_gross, Money::new(dec!(24.00)));
        assert_eq!(summary.shipping_cost, Money::new(dec!(7.99)));
        assert_eq!(summary.total_gross, Money::new(dec!(31.99)));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let registry = TaxPolicyRegistry::standard();
        let engine = PricingEngine::default();

        let at_threshold = engine
            .price(&[item(dec!(25.00), 3)], registry.resolve("AT"))
            .unwrap();
        assert_eq!(at_threshold.subtotal_net, Money::new(dec!(75.00)));
        assert_eq!(at_threshold.shipping_cost, Money::ZERO);

        let just_below = engine
            .price(&[item(dec!(74.99), 1)], registry.resolve("AT"))
            .unwrap();
        assert_eq!(just_below.shipping_cost, Money::new(dec!(7.99)));
    }

    #[test]
    fn test_tax_summed_from_rounded_lines() {
        // Each line: 0.33 net, 0.066 tax -> 0.07. Recomputing from the
        // 0.99 subtotal would give 0.20 instead of 0.21.
        let registry = TaxPolicyRegistry::standard();
        let items = vec![item(dec!(0.33), 1); 3];
        let summary = PricingEngine::default()
            .price(&items, registry.resolve("AT"))
            .unwrap();

        assert_eq!(summary.subtotal_net, Money::new(dec!(0.99)));
        assert_eq!(summary.tax_amount, Money::new(dec!(0.21)));
        assert_eq!(
            summary.total_gross.value(),
            summary.subtotal_net.value() + summary.tax_amount.value() + summary.shipping_cost.value()
        );
    }

    #[test]
    fn test_overflow_is_rejected() {
        let registry = TaxPolicyRegistry::standard();
        let err = PricingEngine::default()
            .price(
                &[item(dec!(10000000000000000000000000000), 10)],
                registry.resolve("AT"),
            )
            .unwrap_err();
        assert!(matches!(err, ShopError::ValidationError(_)));
        assert!(err.to_string().contains("Amount out of range"));
    }

    #[test]
    fn test_rejects_empty_and_non_positive() {
        let registry = TaxPolicyRegistry::standard();
        let engine = PricingEngine::default();
        let policy = registry.resolve("AT");

        assert!(matches!(
            engine.price(&[], policy),
            Err(ShopError::ValidationError(_))
        ));
        assert!(matches!(
            engine.price(&[item(dec!(1.00), 1), item(dec!(1.00), 0)], policy),
            Err(ShopError::ValidationError(_))
        ));
        assert!(matches!(
            engine.price(&[item(dec!(1.00), -1)], policy),
            Err(ShopError::ValidationError(_))
        ));
    }

    #[test]
    fn test_custom_shipping_rule() {
        let registry = TaxPolicyRegistry::standard();
        let engine = PricingEngine::new(ShippingRule {
            free_shipping_threshold: dec!(10),
            flat_rate: dec!(4.5),
        });
        let summary = engine
            .price(&[item(dec!(9.99), 1)], registry.resolve("DE"))
            .unwrap();
        assert_eq!(summary.shipping_cost, Money::new(dec!(4.50)));
        assert_eq!(summary.tax_amount, Money::new(dec!(1.90)));
    }
}
