use crate::domain::order::{Order, OrderId};
use crate::domain::ports::{ShopStore, StoreTransaction};
use crate::domain::product::{ProductId, Sku, StockedProduct};
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Column Family for storing products with their inventory records.
pub const CF_PRODUCTS: &str = "products";
/// Column Family mapping normalized SKUs to product ids.
pub const CF_SKUS: &str = "skus";
/// Column Family for storing orders.
pub const CF_ORDERS: &str = "orders";

fn column_family<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name)
        .ok_or_else(|| ShopError::internal(format!("{name} column family not found")))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| {
        ShopError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        ShopError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

/// A persistent store implementation using RocksDB.
///
/// Products, the SKU index and orders live in separate Column Families. A
/// transaction stages its writes in memory and commits them as a single
/// `WriteBatch`, so either all of an order's writes land or none do.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>` and
/// the write gate that serializes transactions).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_gate: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_PRODUCTS, CF_SKUS, CF_ORDERS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_gate: Arc::new(Mutex::new(())),
        })
    }
}

fn read_product_by_sku(db: &DB, sku: &Sku) -> Result<Option<StockedProduct>> {
    let skus = column_family(db, CF_SKUS)?;
    let Some(id_bytes) = db.get_cf(&skus, sku.as_str().as_bytes())? else {
        return Ok(None);
    };
    let products = column_family(db, CF_PRODUCTS)?;
    match db.get_cf(&products, &id_bytes)? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn read_product(db: &DB, id: ProductId) -> Result<Option<StockedProduct>> {
    let products = column_family(db, CF_PRODUCTS)?;
    match db.get_cf(&products, id.0.as_bytes())? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn read_order(db: &DB, id: OrderId) -> Result<Option<Order>> {
    let orders = column_family(db, CF_ORDERS)?;
    match db.get_cf(&orders, id.0.as_bytes())? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn read_all<T: DeserializeOwned>(db: &DB, cf_name: &str) -> Result<Vec<T>> {
    let handle = column_family(db, cf_name)?;
    let mut values = Vec::new();
    for item in db.iterator_cf(handle, rocksdb::IteratorMode::Start) {
        let (_key, value) = item.map_err(|e| {
            ShopError::InternalError(Box::new(std::io::Error::other(format!(
                "RocksDB iteration error: {}",
                e
            ))))
        })?;
        values.push(decode(&value)?);
    }
    Ok(values)
}

#[async_trait]
impl ShopStore for RocksDBStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let gate = self.write_gate.clone().lock_owned().await;
        Ok(Box::new(RocksDBTransaction {
            db: self.db.clone(),
            _gate: gate,
            products: HashMap::new(),
            orders: HashMap::new(),
        }))
    }

    async fn find_products(&self, skus: &[Sku]) -> Result<Vec<StockedProduct>> {
        let mut found = Vec::with_capacity(skus.len());
        for sku in skus {
            if let Some(product) = read_product_by_sku(&self.db, sku)? {
                found.push(product);
            }
        }
        Ok(found)
    }

    async fn all_products(&self) -> Result<Vec<StockedProduct>> {
        read_all(&self.db, CF_PRODUCTS)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        read_order(&self.db, id)
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = read_all(&self.db, CF_ORDERS)?;
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(orders)
    }
}

/// Staged writes over a [`RocksDBStore`], flushed as one batch on commit.
pub struct RocksDBTransaction {
    db: Arc<DB>,
    _gate: OwnedMutexGuard<()>,
    products: HashMap<ProductId, StockedProduct>,
    orders: HashMap<OrderId, Order>,
}

impl RocksDBTransaction {
    fn product_by_sku(&self, sku: &Sku) -> Result<Option<StockedProduct>> {
        if let Some(staged) = self.products.values().find(|p| p.sku() == sku) {
            return Ok(Some(staged.clone()));
        }
        match read_product_by_sku(&self.db, sku)? {
            Some(committed) if self.products.contains_key(&committed.id()) => Ok(None),
            other => Ok(other),
        }
    }
}

#[async_trait]
impl StoreTransaction for RocksDBTransaction {
    async fn lock_products(&mut self, skus: &[Sku]) -> Result<Vec<StockedProduct>> {
        let mut found = Vec::with_capacity(skus.len());
        for sku in skus {
            if let Some(product) = self.product_by_sku(sku)? {
                found.push(product);
            }
        }
        Ok(found)
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        if let Some(staged) = self.orders.get(&id) {
            return Ok(Some(staged.clone()));
        }
        read_order(&self.db, id)
    }

    async fn put_product(&mut self, product: StockedProduct) -> Result<()> {
        if let Some(owner) = self.product_by_sku(product.sku())?
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
        let products_cf = column_family(&self.db, CF_PRODUCTS)?;
        let skus_cf = column_family(&self.db, CF_SKUS)?;
        let orders_cf = column_family(&self.db, CF_ORDERS)?;

        let mut batch = WriteBatch::default();
        for (id, product) in &self.products {
            if let Some(previous) = read_product(&self.db, *id)?
                && previous.sku() != product.sku()
            {
                batch.delete_cf(&skus_cf, previous.sku().as_str().as_bytes());
            }
            batch.put_cf(&skus_cf, product.sku().as_str().as_bytes(), id.0.as_bytes());
            batch.put_cf(&products_cf, id.0.as_bytes(), encode(product)?);
        }
        for (id, order) in &self.orders {
            batch.put_cf(&orders_cf, id.0.as_bytes(), encode(order)?);
        }

        self.db.write(batch)?;
        Ok(())
    }
}
