use crate::domain::money::Quantity;
use crate::domain::ports::StoreTransaction;
use crate::domain::product::{ProductId, Sku, StockedProduct};
use crate::error::{Result, ShopError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Working set of stock levels for one unit of work.
///
/// Reservations only touch the in-memory copies held here. Nothing reaches
/// the store until [`InventoryLedger::flush`] writes the touched products into
/// the caller's transaction, so a failed reservation never leaves a partial
/// decrement behind.
#[derive(Debug, Clone, Default)]
pub struct InventoryLedger {
    entries: BTreeMap<ProductId, StockedProduct>,
    by_sku: BTreeMap<Sku, ProductId>,
    touched: BTreeSet<ProductId>,
}

impl InventoryLedger {
    /// Builds a ledger over already loaded products, e.g. for a read-only
    /// cart preview.
    pub fn from_products(products: Vec<StockedProduct>) -> Self {
        let mut ledger = Self::default();
        for product in products {
            ledger.by_sku.insert(product.sku().clone(), product.id());
            ledger.entries.insert(product.id(), product);
        }
        ledger
    }

    /// Loads and locks the products for `skus` inside `tx`.
    pub async fn load(tx: &mut dyn StoreTransaction, skus: &[Sku]) -> Result<Self> {
        let products = tx.lock_products(skus).await?;
        Ok(Self::from_products(products))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn product(&self, sku: &Sku) -> Option<&StockedProduct> {
        self.by_sku.get(sku).and_then(|id| self.entries.get(id))
    }

    pub fn available(&self, product_id: ProductId) -> Option<u32> {
        self.entries.get(&product_id).map(StockedProduct::available)
    }

    /// Takes `quantity` units of `product_id` if that many are available,
    /// updating quantity and sold-out flag together.
    pub fn try_reserve(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let entry = self
            .entries
            .get_mut(&product_id)
            .ok_or_else(|| ShopError::NotFound(format!("Product {product_id} is not in the ledger")))?;
        entry.take(quantity.get(), now)?;
        self.touched.insert(product_id);
        debug!(
            product_id = %product_id,
            sku = %entry.sku(),
            reserved = quantity.get(),
            remaining = entry.available(),
            "stock reserved"
        );
        Ok(())
    }

    /// Writes every product touched by a reservation into `tx`.
    pub async fn flush(self, tx: &mut dyn StoreTransaction) -> Result<()> {
        let Self {
            mut entries,
            touched,
            ..
        } = self;
        for id in touched {
            if let Some(product) = entries.remove(&id) {
                tx.put_product(product).await?;
            }
        }
        Ok(())
    }
}
