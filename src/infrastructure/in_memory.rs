use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{ShopStore, StoreTransaction};
use crate::domain::product::{ProductId, Sku, StockedProduct};
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

#[derive(Debug, Default)]
struct ShopState {
    products: HashMap<ProductId, StockedProduct>,
    skus: HashMap<Sku, ProductId>,
    orders: HashMap<OrderId, Order>,
}

impl ShopState {
    fn sort_orders(mut orders: Vec<Order>) -> Vec<Order> {
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        orders
    }
}

/// A thread-safe in-memory shop store.
///
/// Uses `Arc<RwLock<..>>` for shared concurrent access. A transaction holds
/// the write half of the lock from `begin` until it is committed or dropped,
/// so concurrent order transactions run one after the other.
#[derive(Default, Clone)]
pub struct InMemoryShopStore {
    state: Arc<RwLock<ShopState>>,
}

impl InMemoryShopStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShopStore for InMemoryShopStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().write_owned().await;
        Ok(Box::new(InMemoryTransaction {
            state: guard,
            products: HashMap::new(),
            orders: HashMap::new(),
        }))
    }

    async fn find_products(&self, skus: &[Sku]) -> Result<Vec<StockedProduct>> {
        let state = self.state.read().await;
        Ok(skus
            .iter()
            .filter_map(|sku| state.skus.get(sku))
            .filter_map(|id| state.products.get(id))
            .cloned()
            .collect())
    }

    async fn all_products(&self) -> Result<Vec<StockedProduct>> {
        let state = self.state.read().await;
        Ok(state.products.values().cloned().collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        Ok(ShopState::sort_orders(state.orders.values().cloned().collect()))
    }
}

/// Staged writes over an exclusively held [`ShopState`].
pub struct InMemoryTransaction {
    state: OwnedRwLockWriteGuard<ShopState>,
    products: HashMap<ProductId, StockedProduct>,
    orders: HashMap<OrderId, Order>,
}

impl InMemoryTransaction {
    fn product_by_sku(&self, sku: &Sku) -> Option<&StockedProduct> {
        if let Some(staged) = self.products.values().find(|p| p.sku() == sku) {
            return Some(staged);
        }
        let id = self.state.skus.get(sku)?;
        // A committed product whose SKU was changed in this transaction no
        // longer answers to the old SKU.
        if self.products.contains_key(id) {
            return None;
        }
        self.state.products.get(id)
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn lock_products(&mut self, skus: &[Sku]) -> Result<Vec<StockedProduct>> {
        Ok(skus
            .iter()
            .filter_map(|sku| self.product_by_sku(sku))
            .cloned()
            .collect())
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self
            .orders
            .get(&id)
            .or_else(|| self.state.orders.get(&id))
            .cloned())
    }

    async fn put_product(&mut self, product: StockedProduct) -> Result<()> {
        if let Some(owner) = self.product_by_sku(product.sku())
            && owner.id() != product.id()
        {
            return Err(ShopError::Conflict(format!(
                "SKU {} is already used by product {}",
                product.sku(),
                owner.id()
            )));
        }
        self.products.insert(product.id(), product);
        Ok(())
    }

    async fn put_order(&mut self, order: Order) -> Result<()> {
        self.orders.insert(order.id, order);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction {
            mut state,
            products,
            orders,
        } = *self;

        for (id, product) in products {
            if let Some(previous) = state.products.get(&id) {
                let old_sku = previous.sku().clone();
                state.skus.remove(&old_sku);
            }
            state.skus.insert(product.sku().clone(), id);
            state.products.insert(id, product);
        }
        state.orders.extend(orders);
        Ok(())
    }
}
