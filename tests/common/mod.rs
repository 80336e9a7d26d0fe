#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use shopcore::application::engine::OrderEngine;
use shopcore::config::ShopSettings;
use shopcore::domain::order::{
    CartItemRequest, CreateOrderRequest, CustomerDetails, Order, OrderId, PaymentProvider,
};
use shopcore::domain::ports::{NotificationSink, NotificationSinkRef, ShopStore, StoreTransaction};
use shopcore::domain::product::{CatalogEntry, Sku, StockedProduct};
use shopcore::error::{Result, ShopError};
use shopcore::infrastructure::in_memory::InMemoryShopStore;
use shopcore::infrastructure::notification::LoggingNotifier;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub fn engine() -> OrderEngine {
    engine_with(Arc::new(LoggingNotifier::new()), ShopSettings::default())
}

pub fn engine_with(notifier: NotificationSinkRef, settings: ShopSettings) -> OrderEngine {
    OrderEngine::new(Box::new(InMemoryShopStore::new()), notifier, settings)
}

pub fn entry(sku: &str, net_price: Decimal, quantity: u32) -> CatalogEntry {
    CatalogEntry {
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        net_price,
        quantity,
        category: None,
    }
}

pub fn customer() -> CustomerDetails {
    CustomerDetails {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.org".into(),
        phone: Some("+43 1 234".into()),
        street: "Ringstrasse".into(),
        house_number: "1".into(),
        address_line2: None,
        city_name: "Vienna".into(),
        postal_code: "1010".into(),
        country_code: "at".into(),
    }
}

pub fn items(lines: &[(&str, i64)]) -> Vec<CartItemRequest> {
    lines
        .iter()
        .map(|(sku, quantity)| CartItemRequest {
            sku: sku.to_string(),
            quantity: *quantity,
        })
        .collect()
}

pub fn request(lines: &[(&str, i64)]) -> CreateOrderRequest {
    request_with(lines, PaymentProvider::Stripe)
}

pub fn request_with(lines: &[(&str, i64)], payment_provider: PaymentProvider) -> CreateOrderRequest {
    CreateOrderRequest {
        customer: customer(),
        items: items(lines),
        payment_provider,
    }
}

/// Available units of `sku` as currently committed.
pub async fn available(engine: &OrderEngine, sku: &str) -> u32 {
    engine
        .stock()
        .await
        .unwrap()
        .into_iter()
        .find(|p| p.sku().as_str() == sku)
        .map(|p| p.available())
        .unwrap()
}

/// Counts calls and optionally fails or stalls each one.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn stalling(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn order_placed(&self, _order: &Order) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ShopError::internal("mail server unreachable"));
        }
        Ok(())
    }
}

/// In-memory store whose transactions can be made to hang in `put_order`,
/// after stock has been written but before commit.
#[derive(Clone, Default)]
pub struct StallingStore {
    inner: InMemoryShopStore,
    pub stall: Arc<AtomicBool>,
    pub reached_put_order: Arc<Notify>,
}

#[async_trait]
impl ShopStore for StallingStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(StallingTransaction {
            inner: self.inner.begin().await?,
            stall: self.stall.clone(),
            reached_put_order: self.reached_put_order.clone(),
        }))
    }

    async fn find_products(&self, skus: &[Sku]) -> Result<Vec<StockedProduct>> {
        self.inner.find_products(skus).await
    }

    async fn all_products(&self) -> Result<Vec<StockedProduct>> {
        self.inner.all_products().await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        self.inner.get_order(id).await
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        self.inner.all_orders().await
    }
}

struct StallingTransaction {
    inner: Box<dyn StoreTransaction>,
    stall: Arc<AtomicBool>,
    reached_put_order: Arc<Notify>,
}

#[async_trait]
impl StoreTransaction for StallingTransaction {
    async fn lock_products(&mut self, skus: &[Sku]) -> Result<Vec<StockedProduct>> {
        self.inner.lock_products(skus).await
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        self.inner.get_order(id).await
    }

    async fn put_product(&mut self, product: StockedProduct) -> Result<()> {
        self.inner.put_product(product).await
    }

    async fn put_order(&mut self, order: Order) -> Result<()> {
        self.reached_put_order.notify_one();
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.inner.put_order(order).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }
}
