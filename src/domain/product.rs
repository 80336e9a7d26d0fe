use super::money::Money;
use crate::error::ShopError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub Uuid);

impl ProductId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A stock-keeping unit in canonical form: trimmed and upper-cased.
///
/// Two SKUs that differ only in case or surrounding whitespace are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub fn parse(raw: &str) -> Result<Self, ShopError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(ShopError::validation("Item SKU is required"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Sku {
    type Error = ShopError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self {
        sku.0
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub net_price: Money,
    /// Derived from the inventory record; never set on its own.
    pub sold_out: bool,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub quantity: u32,
    pub updated_at: DateTime<Utc>,
}

/// A product together with the inventory record it owns.
///
/// The pair is the unit of storage and locking, so the sold-out flag and the
/// quantity can only change together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockedProduct {
    pub product: Product,
    pub inventory: InventoryRecord,
}

impl StockedProduct {
    pub fn new(
        sku: Sku,
        name: String,
        net_price: Money,
        category: Option<String>,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            product: Product {
                id: ProductId::new(),
                sku,
                name,
                net_price,
                sold_out: quantity == 0,
                category,
            },
            inventory: InventoryRecord {
                quantity,
                updated_at: now,
            },
        }
    }

    pub fn id(&self) -> ProductId {
        self.product.id
    }

    pub fn sku(&self) -> &Sku {
        &self.product.sku
    }

    pub fn available(&self) -> u32 {
        self.inventory.quantity
    }

    /// Overwrites the stock level and recomputes the sold-out flag.
    pub fn set_quantity(&mut self, quantity: u32, now: DateTime<Utc>) {
        self.inventory.quantity = quantity;
        self.inventory.updated_at = now;
        self.product.sold_out = quantity == 0;
    }

    /// Removes `quantity` units, or reports how many were available.
    pub fn take(&mut self, quantity: u32, now: DateTime<Utc>) -> Result<(), ShopError> {
        let available = self.inventory.quantity;
        match available.checked_sub(quantity) {
            Some(remaining) => {
                self.set_quantity(remaining, now);
                Ok(())
            }
            None => Err(ShopError::InsufficientStock {
                sku: self.product.sku.to_string(),
                requested: quantity,
                available,
            }),
        }
    }
}

/// One product row of a catalog import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub sku: String,
    pub name: String,
    pub net_price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub category: Option<String>,
}

impl CatalogEntry {
    /// Rejects rows that could never become a product.
    pub fn validate(self) -> Result<Self, ShopError> {
        Sku::parse(&self.sku)?;
        if self.name.trim().is_empty() {
            return Err(ShopError::validation(format!(
                "Product {} needs a name",
                self.sku.trim()
            )));
        }
        Money::unit_price(self.net_price)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn kibble(quantity: u32) -> StockedProduct {
        StockedProduct::new(
            Sku::parse("kb-1").unwrap(),
            "Kibble".to_string(),
            Money::new(dec!(10.00)),
            Some("Food".to_string()),
            quantity,
            Utc::now(),
        )
    }

    #[test]
    fn test_sku_normalization() {
        assert_eq!(Sku::parse("  kb-1 ").unwrap(), Sku::parse("KB-1").unwrap());
        assert_eq!(Sku::parse("kb-1").unwrap().as_str(), "KB-1");
        assert!(matches!(Sku::parse("   "), Err(ShopError::ValidationError(_))));
    }

    #[test]
    fn test_sku_deserializes_normalized() {
        let sku: Sku = serde_json::from_str("\" leash-red\"").unwrap();
        assert_eq!(sku.as_str(), "LEASH-RED");
        assert!(serde_json::from_str::<Sku>("\"\"").is_err());
    }

    #[test]
    fn test_new_product_sold_out_matches_quantity() {
        assert!(!kibble(2).product.sold_out);
        assert!(kibble(0).product.sold_out);
    }

    #[test]
    fn test_take_to_zero_flips_sold_out() {
        let mut stock = kibble(2);
        stock.take(2, Utc::now()).unwrap();
        assert_eq!(stock.available(), 0);
        assert!(stock.product.sold_out);
    }

    #[test]
    fn test_take_more_than_available() {
        let mut stock = kibble(1);
        let err = stock.take(2, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            ShopError::InsufficientStock {
                requested: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(stock.available(), 1);
        assert!(!stock.product.sold_out);
    }

    #[test]
    fn test_catalog_entry_validation() {
        let entry = CatalogEntry {
            sku: "kb-1".into(),
            name: "Kibble".into(),
            net_price: dec!(10.00),
            quantity: 2,
            category: None,
        };
        assert!(entry.clone().validate().is_ok());
        assert!(CatalogEntry { name: " ".into(), ..entry.clone() }.validate().is_err());
        assert!(CatalogEntry { sku: "".into(), ..entry.clone() }.validate().is_err());
        assert!(CatalogEntry { net_price: dec!(10.005), ..entry.clone() }.validate().is_err());
        assert!(CatalogEntry { net_price: dec!(-0.01), ..entry }.validate().is_err());
    }

    #[test]
    fn test_restock_clears_sold_out() {
        let mut stock = kibble(0);
        stock.set_quantity(5, Utc::now());
        assert!(!stock.product.sold_out);
    }
}
