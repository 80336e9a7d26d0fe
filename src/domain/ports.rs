use super::order::{Order, OrderId};
use super::product::{Sku, StockedProduct};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Persistence for products, their inventory, and orders.
///
/// Reads on the store itself see committed state only. All writes go through
/// a [`StoreTransaction`].
#[async_trait]
pub trait ShopStore: Send + Sync {
    /// Opens a write transaction. Write transactions on one store are
    /// serialized: the next `begin` waits until the previous transaction is
    /// committed or dropped.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
    /// Products whose SKU is in `skus`. Unknown SKUs are simply absent.
    async fn find_products(&self, skus: &[Sku]) -> Result<Vec<StockedProduct>>;
    async fn all_products(&self) -> Result<Vec<StockedProduct>>;
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;
    async fn all_orders(&self) -> Result<Vec<Order>>;
}

/// A unit of work over a [`ShopStore`].
///
/// Writes are staged and become visible only on `commit`. Dropping the
/// transaction without committing discards them.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Products whose SKU is in `skus`, including writes staged in this
    /// transaction.
    async fn lock_products(&mut self, skus: &[Sku]) -> Result<Vec<StockedProduct>>;
    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>>;
    /// Inserts or replaces a product. Fails with a conflict when another
    /// product already owns the SKU.
    async fn put_product(&mut self, product: StockedProduct) -> Result<()>;
    async fn put_order(&mut self, order: Order) -> Result<()>;
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Receives finished orders after commit, e.g. to send a confirmation email.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn order_placed(&self, order: &Order) -> Result<()>;
}

pub type ShopStoreBox = Box<dyn ShopStore>;
pub type NotificationSinkRef = Arc<dyn NotificationSink>;
