use crate::domain::pricing::ShippingRule;
use crate::domain::tax::DEFAULT_TAX_COUNTRY;
use crate::error::{Result, ShopError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for pricing and order placement.
///
/// Every field has a default, so a settings file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShopSettings {
    /// Country whose tax policy prices every order, whatever the shipping
    /// country is.
    pub tax_country: String,
    /// Registry fallback for unknown countries.
    pub default_tax_country: String,
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_rate: Decimal,
    /// Upper bound for the post-commit notification, in seconds.
    pub notification_timeout_secs: u64,
}

impl Default for ShopSettings {
    fn default() -> Self {
        Self {
            tax_country: DEFAULT_TAX_COUNTRY.to_string(),
            default_tax_country: DEFAULT_TAX_COUNTRY.to_string(),
            free_shipping_threshold: dec!(75.00),
            flat_shipping_rate: dec!(7.99),
            notification_timeout_secs: 5,
        }
    }
}

impl ShopSettings {
    /// Reads settings from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let settings: Self = serde_json::from_reader(file)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.free_shipping_threshold < Decimal::ZERO || self.flat_shipping_rate < Decimal::ZERO
        {
            return Err(ShopError::validation(
                "Shipping amounts must not be negative",
            ));
        }
        if self.tax_country.trim().is_empty() {
            return Err(ShopError::validation("Tax country must not be empty"));
        }
        Ok(())
    }

    pub fn shipping_rule(&self) -> ShippingRule {
        ShippingRule {
            free_shipping_threshold: self.free_shipping_threshold,
            flat_rate: self.flat_shipping_rate,
        }
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_secs(self.notification_timeout_secs)
    }
}
