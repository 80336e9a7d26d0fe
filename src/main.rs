use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shopcore::application::engine::OrderEngine;
use shopcore::config::ShopSettings;
use shopcore::domain::order::{CartRequest, CreateOrderRequest, OrderId, OrderStatus};
use shopcore::domain::ports::ShopStoreBox;
use shopcore::infrastructure::in_memory::InMemoryShopStore;
use shopcore::infrastructure::notification::LoggingNotifier;
use shopcore::interfaces::csv::catalog_reader::CatalogReader;
use shopcore::interfaces::csv::stock_writer::StockWriter;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Catalog CSV (sku,name,net_price,quantity,category) to import first
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// JSON file overriding the default shop settings
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the stock of every product as CSV
    Stock,
    /// Price a cart without placing an order
    Cart {
        /// JSON with an `items` list; an order request works too
        request: PathBuf,
    },
    /// Place an order
    Order {
        /// Order request JSON
        request: PathBuf,
    },
    /// List all orders
    Orders,
    /// Show one order
    Show { order_id: OrderId },
    /// Set the status of an order
    Status {
        order_id: OrderId,
        status: OrderStatus,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}

fn open_store(db_path: Option<PathBuf>) -> Result<ShopStoreBox> {
    match db_path {
        Some(db_path) => persistent_store(db_path),
        None => Ok(Box::new(InMemoryShopStore::new())),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn persistent_store(db_path: PathBuf) -> Result<ShopStoreBox> {
    let store = shopcore::infrastructure::rocksdb::RocksDBStore::open(db_path).into_diagnostic()?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn persistent_store(db_path: PathBuf) -> Result<ShopStoreBox> {
    warn!(
        db_path = %db_path.display(),
        "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
    );
    Ok(Box::new(InMemoryShopStore::new()))
}

async fn import_catalog(engine: &OrderEngine, path: &Path) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    let mut entries = Vec::new();
    for (row, entry) in CatalogReader::new(file).entries().enumerate() {
        match entry {
            Ok(entry) => entries.push(entry),
            // Row 1 is the header.
            Err(e) => warn!(row = row + 2, error = %e, "skipping catalog row"),
        }
    }
    engine.import_catalog(entries).await.into_diagnostic()?;
    Ok(())
}

fn read_request<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).into_diagnostic()?;
    serde_json::from_reader(file).into_diagnostic()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).into_diagnostic()?;
    io::Write::write_all(&mut out, b"\n").into_diagnostic()
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => ShopSettings::from_file(path).into_diagnostic()?,
        None => ShopSettings::default(),
    };
    let store = open_store(cli.db_path)?;
    let engine = OrderEngine::new(store, Arc::new(LoggingNotifier::new()), settings);

    if let Some(catalog) = &cli.catalog {
        import_catalog(&engine, catalog).await?;
    }

    match cli.command {
        Command::Stock => {
            let products = engine.stock().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = StockWriter::new(stdout.lock());
            writer.write_stock(&products).into_diagnostic()?;
        }
        Command::Cart { request } => {
            let request: CartRequest = read_request(&request)?;
            let cart = engine.cart_info(&request.items).await.into_diagnostic()?;
            print_json(&cart)?;
        }
        Command::Order { request } => {
            let request: CreateOrderRequest = read_request(&request)?;
            let order = engine.create_order(request).await.into_diagnostic()?;
            print_json(&order)?;
        }
        Command::Orders => {
            let orders = engine.orders().await.into_diagnostic()?;
            print_json(&orders)?;
        }
        Command::Show { order_id } => {
            let order = engine.order(order_id).await.into_diagnostic()?;
            print_json(&order)?;
        }
        Command::Status { order_id, status } => {
            let order = engine
                .update_status(order_id, status)
                .await
                .into_diagnostic()?;
            print_json(&order)?;
        }
    }

    Ok(())
}
