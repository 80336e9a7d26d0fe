use super::money::Money;
use crate::error::{Result, ShopError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Country used when a lookup misses and nothing else was configured.
pub const DEFAULT_TAX_COUNTRY: &str = "AT";

/// A country's VAT rule: a single fractional rate applied to net amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxPolicy {
    country_code: String,
    rate: Decimal,
}

impl TaxPolicy {
    pub fn new(country_code: &str, rate: Decimal) -> Result<Self> {
        let country_code = country_code.trim().to_uppercase();
        if country_code.is_empty() {
            return Err(ShopError::validation("Tax country code is required"));
        }
        if rate < Decimal::ZERO {
            return Err(ShopError::validation("Tax rate must not be negative"));
        }
        Ok(Self { country_code, rate })
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Tax owed on `net`, rounded half away from zero to cents.
    pub fn tax(&self, net: Money) -> Result<Money> {
        net.apply_rate(self.rate)
    }
}

/// All known tax policies, looked up by country code.
///
/// Resolution never fails: an unknown country gets the default country's
/// policy, and if that one is not registered either, the first policy in
/// registration order.
#[derive(Debug, Clone)]
pub struct TaxPolicyRegistry {
    policies: Vec<TaxPolicy>,
    by_country: HashMap<String, usize>,
    default_country: String,
}

impl TaxPolicyRegistry {
    pub fn new(default_country: &str, policies: Vec<TaxPolicy>) -> Result<Self> {
        if policies.is_empty() {
            return Err(ShopError::validation(
                "At least one tax policy must be registered",
            ));
        }

        let mut by_country = HashMap::with_capacity(policies.len());
        for (idx, policy) in policies.iter().enumerate() {
            // First registration wins for duplicate countries.
            by_country.entry(policy.country_code.clone()).or_insert(idx);
        }

        Ok(Self {
            policies,
            by_country,
            default_country: default_country.trim().to_uppercase(),
        })
    }

    /// Austria (20%) and Germany (19%), defaulting to Austria.
    pub fn standard() -> Self {
        let policies = vec![
            TaxPolicy {
                country_code: "AT".to_string(),
                rate: dec!(0.20),
            },
            TaxPolicy {
                country_code: "DE".to_string(),
                rate: dec!(0.19),
            },
        ];
        let by_country = HashMap::from([("AT".to_string(), 0), ("DE".to_string(), 1)]);
        Self {
            policies,
            by_country,
            default_country: DEFAULT_TAX_COUNTRY.to_string(),
        }
    }

    pub fn resolve(&self, country_code: &str) -> &TaxPolicy {
        let wanted = country_code.trim().to_uppercase();
        let idx = self
            .by_country
            .get(&wanted)
            .or_else(|| self.by_country.get(&self.default_country))
            .copied()
            .unwrap_or(0);
        &self.policies[idx]
    }

    pub fn policies(&self) -> &[TaxPolicy] {
        &self.policies
    }
}

impl Default for TaxPolicyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
