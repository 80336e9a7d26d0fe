use super::ledger::InventoryLedger;
use crate::config::ShopSettings;
use crate::domain::money::{Money, Quantity};
use crate::domain::order::{
    CartInfo, CartItemRequest, CartLine, CreateOrderRequest, Order, OrderId, OrderLine,
    OrderStatus,
};
use crate::domain::ports::{NotificationSinkRef, ShopStoreBox};
use crate::domain::pricing::{PriceSummary, PriceableItem, PricingEngine};
use crate::domain::product::{CatalogEntry, Sku, StockedProduct};
use crate::domain::tax::{TaxPolicy, TaxPolicyRegistry};
use crate::error::{Result, ShopError};
use chrono::Utc;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// A requested cart line after SKU normalization and quantity validation.
#[derive(Debug, Clone)]
struct CartLineRequest {
    sku: Sku,
    quantity: Quantity,
}

/// Validated cart: the lines in input order plus the distinct SKUs to load.
#[derive(Debug, Clone)]
struct ValidatedCart {
    lines: Vec<CartLineRequest>,
    distinct: Vec<Sku>,
}

impl ValidatedCart {
    fn parse(items: &[CartItemRequest]) -> Result<Self> {
        if items.is_empty() {
            return Err(ShopError::validation(
                "Order must contain at least one item",
            ));
        }

        let lines = items
            .iter()
            .map(|item| {
                Ok(CartLineRequest {
                    sku: Sku::parse(&item.sku)?,
                    quantity: Quantity::new(item.quantity)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let distinct = lines
            .iter()
            .map(|line| line.sku.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(Self { lines, distinct })
    }
}

/// A cart whose products are resolved, stock reserved in a ledger, and
/// amounts computed.
struct PricedCart {
    products: Vec<StockedProduct>,
    summary: PriceSummary,
}

/// Summary of a catalog import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
}

/// The entry point for order placement and order queries.
///
/// `OrderEngine` owns the store and the notification sink. Order creation
/// runs as one store transaction: the products are loaded and locked, stock
/// is reserved in an [`InventoryLedger`], totals are computed, and the stock
/// changes are committed together with the order. The notification is sent
/// only after that commit and cannot undo it.
pub struct OrderEngine {
    store: ShopStoreBox,
    notifier: NotificationSinkRef,
    tax_policies: TaxPolicyRegistry,
    pricing: PricingEngine,
    settings: ShopSettings,
}

impl OrderEngine {
    /// Creates a new `OrderEngine` with the standard tax policies.
    ///
    /// # Arguments
    ///
    /// * `store` - Persistence for products and orders.
    /// * `notifier` - Receives every order after it has been committed.
    /// * `settings` - Tax country, shipping rule and notification timeout.
    pub fn new(store: ShopStoreBox, notifier: NotificationSinkRef, settings: ShopSettings) -> Self {
        let tax_policies = TaxPolicyRegistry::new(
            &settings.default_tax_country,
            TaxPolicyRegistry::standard().policies().to_vec(),
        )
        .unwrap_or_default();
        Self::with_tax_policies(store, notifier, settings, tax_policies)
    }

    pub fn with_tax_policies(
        store: ShopStoreBox,
        notifier: NotificationSinkRef,
        settings: ShopSettings,
        tax_policies: TaxPolicyRegistry,
    ) -> Self {
        let pricing = PricingEngine::new(settings.shipping_rule());
        Self {
            store,
            notifier,
            tax_policies,
            pricing,
            settings,
        }
    }

    /// Tax policy applied to every order.
    ///
    /// Orders are taxed with the configured tax country regardless of the
    /// shipping country.
    pub fn tax_policy(&self) -> &TaxPolicy {
        self.tax_policies.resolve(&self.settings.tax_country)
    }

    /// Resolves products for the cart lines, reserves stock in `ledger` line
    /// by line, and prices the result.
    fn price_cart(&self, cart: &ValidatedCart, ledger: &mut InventoryLedger) -> Result<PricedCart> {
        if ledger.len() != cart.distinct.len() {
            return Err(ShopError::validation("One or more products do not exist"));
        }

        let now = Utc::now();
        let mut products = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let product = ledger
                .product(&line.sku)
                .cloned()
                .ok_or_else(|| ShopError::validation("One or more products do not exist"))?;
            ledger.try_reserve(product.id(), line.quantity, now)?;
            products.push(product);
        }

        let items = products
            .iter()
            .zip(&cart.lines)
            .map(|(product, line)| PriceableItem {
                unit_net_price: product.product.net_price,
                quantity: i64::from(line.quantity.get()),
            })
            .collect::<Vec<_>>();
        let summary = self.pricing.price(&items, self.tax_policy())?;

        Ok(PricedCart { products, summary })
    }

    /// Prices a cart without reserving stock or writing anything.
    pub async fn cart_info(&self, items: &[CartItemRequest]) -> Result<CartInfo> {
        let cart = ValidatedCart::parse(items)?;
        let products = self.store.find_products(&cart.distinct).await?;
        let mut ledger = InventoryLedger::from_products(products);
        let priced = self.price_cart(&cart, &mut ledger)?;

        let items = priced
            .products
            .iter()
            .zip(&priced.summary.lines)
            .map(|(stock, line)| CartLine {
                sku: stock.product.sku.clone(),
                name: stock.product.name.clone(),
                quantity: line.quantity,
                unit_net_price: line.unit_net_price,
                line_net: line.line_net,
                tax_amount: line.line_tax,
                line_total_gross: line.line_gross,
            })
            .collect();

        Ok(CartInfo {
            items,
            subtotal_net: priced.summary.subtotal_net,
            tax_amount: priced.summary.tax_amount,
            shipping_cost: priced.summary.shipping_cost,
            total_gross: priced.summary.total_gross,
        })
    }

    /// Places an order.
    ///
    /// Either the order, its lines and every stock decrement are committed
    /// together, or nothing is written. All request validation happens before
    /// the store transaction is opened.
    pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order> {
        let (customer, shipping_address) = request.customer.to_snapshots()?;
        let cart = ValidatedCart::parse(&request.items)?;

        let mut tx = self.store.begin().await?;
        let mut ledger = InventoryLedger::load(tx.as_mut(), &cart.distinct).await?;
        // Any early return from here on drops `tx` uncommitted.
        let priced = self.price_cart(&cart, &mut ledger)?;

        let items = priced
            .products
            .iter()
            .zip(&priced.summary.lines)
            .map(|(stock, line)| OrderLine {
                product_id: stock.id(),
                product_name: stock.product.name.clone(),
                sku: stock.product.sku.clone(),
                quantity: line.quantity,
                unit_net_price: line.unit_net_price,
                line_net: line.line_net,
                tax_amount: line.line_tax,
                line_total_gross: line.line_gross,
            })
            .collect();

        let order = Order {
            id: OrderId::new(),
            customer,
            shipping_address,
            items,
            status: request.payment_provider.initial_status(),
            payment_provider: request.payment_provider,
            subtotal_net: priced.summary.subtotal_net,
            tax_amount: priced.summary.tax_amount,
            shipping_cost: priced.summary.shipping_cost,
            total_gross: priced.summary.total_gross,
            created_at: Utc::now(),
        };

        ledger.flush(tx.as_mut()).await?;
        tx.put_order(order.clone()).await?;
        tx.commit().await?;

        info!(
            order_id = %order.id,
            status = %order.status,
            total_gross = %order.total_gross,
            "order created"
        );

        self.notify(&order).await;
        Ok(order)
    }

    /// Hands the order to the notification sink. Failures and timeouts are
    /// logged and otherwise ignored.
    async fn notify(&self, order: &Order) {
        let timeout = self.settings.notification_timeout();
        match tokio::time::timeout(timeout, self.notifier.order_placed(order)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(order_id = %order.id, error = %e, "failed to send order confirmation");
            }
            Err(_) => {
                warn!(
                    order_id = %order.id,
                    timeout_secs = timeout.as_secs(),
                    "order confirmation timed out"
                );
            }
        }
    }

    pub async fn order(&self, id: OrderId) -> Result<Order> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("Order {id} was not found")))
    }

    pub async fn orders(&self) -> Result<Vec<Order>> {
        self.store.all_orders().await
    }

    /// Sets the status of an existing order. Any status may follow any other.
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .get_order(id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("Order {id} was not found")))?;
        if order.status.is_terminal() && order.status != status {
            warn!(order_id = %id, from = %order.status, to = %status, "reopening settled order");
        }
        order.status = status;
        tx.put_order(order.clone()).await?;
        tx.commit().await?;

        info!(order_id = %id, status = %status, "order status updated");
        Ok(order)
    }

    /// Upserts catalog entries by SKU in one transaction.
    ///
    /// Existing products keep their id; name, price, category and stock level
    /// are replaced.
    pub async fn import_catalog(&self, entries: Vec<CatalogEntry>) -> Result<ImportReport> {
        let now = Utc::now();
        let mut report = ImportReport::default();
        let mut tx = self.store.begin().await?;

        for entry in entries {
            let sku = Sku::parse(&entry.sku)?;
            let name = entry.name.trim().to_string();
            if name.is_empty() {
                return Err(ShopError::validation(format!("Product {sku} needs a name")));
            }
            let net_price = Money::unit_price(entry.net_price)?;
            let category = entry
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());

            let existing = tx.lock_products(std::slice::from_ref(&sku)).await?;
            let stock = match existing.into_iter().next() {
                Some(mut stock) => {
                    stock.product.name = name;
                    stock.product.net_price = net_price;
                    stock.product.category = category;
                    stock.set_quantity(entry.quantity, now);
                    report.updated += 1;
                    stock
                }
                None => {
                    report.created += 1;
                    StockedProduct::new(sku, name, net_price, category, entry.quantity, now)
                }
            };
            tx.put_product(stock).await?;
        }

        tx.commit().await?;
        info!(
            created = report.created,
            updated = report.updated,
            "catalog imported"
        );
        Ok(report)
    }

    /// Current stock of every product, sorted by SKU.
    pub async fn stock(&self) -> Result<Vec<StockedProduct>> {
        let mut products = self.store.all_products().await?;
        products.sort_by(|a, b| a.sku().cmp(b.sku()));
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{CustomerDetails, PaymentProvider};
    use crate::infrastructure::in_memory::InMemoryShopStore;
    use crate::infrastructure::notification::LoggingNotifier;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn engine() -> OrderEngine {
        OrderEngine::new(
            Box::new(InMemoryShopStore::new()),
            Arc::new(LoggingNotifier::new()),
            ShopSettings::default(),
        )
    }

    fn entry(sku: &str, price: rust_decimal::Decimal, quantity: u32) -> CatalogEntry {
        CatalogEntry {
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            net_price: price,
            quantity,
            category: None,
        }
    }

    fn request(items: &[(&str, i64)]) -> CreateOrderRequest {
        CreateOrderRequest {
            customer: CustomerDetails {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.org".into(),
                phone: None,
                street: "Ringstrasse".into(),
                house_number: "1".into(),
                address_line2: None,
                city_name: "Vienna".into(),
                postal_code: "1010".into(),
                country_code: "AT".into(),
            },
            items: items
                .iter()
                .map(|(sku, quantity)| CartItemRequest {
                    sku: sku.to_string(),
                    quantity: *quantity,
                })
                .collect(),
            payment_provider: PaymentProvider::Stripe,
        }
    }

    #[tokio::test]
    async fn test_create_order_reserves_and_prices() {
        let engine = engine();
        engine
            .import_catalog(vec![entry("KB-1", dec!(10.00), 2)])
            .await
            .unwrap();

        let order = engine.create_order(request(&[("kb-1", 2)])).await.unwrap();
        assert_eq!(order.subtotal_net, Money::new(dec!(20.00)));
        assert_eq!(order.tax_amount, Money::new(dec!(4.00)));
        assert_eq!(order.total_gross, Money::new(dec!(31.99)));
        assert_eq!(order.status, OrderStatus::PaymentPending);

        let stock = engine.stock().await.unwrap();
        assert_eq!(stock[0].available(), 0);
        assert!(stock[0].product.sold_out);
    }

    #[tokio::test]
    async fn test_duplicate_skus_in_one_order_share_stock() {
        let engine = engine();
        engine
            .import_catalog(vec![entry("KB-1", dec!(10.00), 3)])
            .await
            .unwrap();

        let err = engine
            .create_order(request(&[("KB-1", 2), ("kb-1 ", 2)]))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { .. }));
        assert_eq!(engine.stock().await.unwrap()[0].available(), 3);

        let order = engine
            .create_order(request(&[("KB-1", 2), ("kb-1", 1)]))
            .await
            .unwrap();
        assert_eq!(order.items.len(), 2);
        assert_eq!(engine.stock().await.unwrap()[0].available(), 0);
    }

    #[tokio::test]
    async fn test_import_upserts_by_sku() {
        let engine = engine();
        let first = engine
            .import_catalog(vec![entry("kb-1", dec!(10.00), 2)])
            .await
            .unwrap();
        assert_eq!(first, ImportReport { created: 1, updated: 0 });
        let id = engine.stock().await.unwrap()[0].id();

        let second = engine
            .import_catalog(vec![entry("KB-1", dec!(12.50), 0)])
            .await
            .unwrap();
        assert_eq!(second, ImportReport { created: 0, updated: 1 });

        let stock = engine.stock().await.unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].id(), id);
        assert_eq!(stock[0].product.net_price, Money::new(dec!(12.50)));
        assert!(stock[0].product.sold_out);
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let engine = engine();
        let err = engine
            .import_catalog(vec![entry("A", dec!(1), 1), entry("B", dec!(-1), 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ValidationError(_)));
        assert!(engine.stock().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let engine = engine();
        let err = engine.order(OrderId::new()).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        let err = engine
            .update_status(OrderId::new(), OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }
}
