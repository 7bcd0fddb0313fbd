//! SmartPOS Terminal
//!
//! Point-of-sale register for one checkout lane. Keeps a local product catalog,
//! sells from it, and shares newly entered products with every other terminal
//! on the LAN over UDP broadcast.

mod auth;
mod catalog_service;
mod config;
mod images;
mod printer;
mod product_entry;
mod replication;
mod shell;

use std::io::BufRead;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use smartpos_core::{
    storage, Catalog, CatalogStore, InstanceId, JsonCatalogStore, SalesLedger, REPLICATION_PORT,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::auth::CredentialStore;
use crate::catalog_service::CatalogService;
use crate::config::AppConfig;
use crate::images::ImageStore;
use crate::printer::SpoolPrinter;
use crate::product_entry::ProductEntry;
use crate::replication::{Broadcaster, Listener};
use crate::shell::{Shell, ShellSettings};

/// SmartPOS Terminal - point-of-sale register with LAN product sharing
#[derive(Parser, Debug)]
#[command(name = "smartpos")]
#[command(author = "SmartPOS Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Point-of-sale terminal with LAN catalog replication", long_about = None)]
struct Args {
    /// UDP port for product broadcasts
    #[arg(short, long, default_value_t = REPLICATION_PORT)]
    port: u16,

    /// Data directory (defaults to the platform data dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Cashier name recorded on sales until someone logs in
    #[arg(long, default_value = "Admin")]
    cashier: String,

    /// Sales tax percentage
    #[arg(long, default_value = "16")]
    tax_rate: Decimal,

    /// Store name printed on receipts
    #[arg(long, default_value = "SMARTPOS")]
    store_name: String,

    /// Do not receive products from other terminals
    #[arg(long, default_value = "false")]
    no_listen: bool,

    /// Destination address for product broadcasts
    #[arg(long, default_value = "255.255.255.255")]
    broadcast_addr: Ipv4Addr,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level)?;

    info!("Starting SmartPOS Terminal v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::new(args.data_dir, args.port).context("Failed to resolve data directory")?;
    config.broadcast_addr = args.broadcast_addr;
    config.tax_rate = args.tax_rate / Decimal::ONE_HUNDRED;
    config.cashier = args.cashier;
    config.listen = !args.no_listen;
    config.layout = config.layout.with_title(args.store_name);
    config
        .ensure_dirs()
        .with_context(|| format!("Failed to create {}", config.data_dir().display()))?;
    info!("Data directory: {}", config.data_dir().display());

    let instance_id = InstanceId::generate();
    info!("Instance id: {}", instance_id);

    // Catalog task owns the product list from here on
    let store = JsonCatalogStore::new(config.products_path());
    let catalog = load_catalog(&store);
    let images = ImageStore::new(config.data_dir())?;
    let (catalog_handle, catalog_task) =
        CatalogService::spawn(catalog, Box::new(store), images.clone(), instance_id);

    let cancel = CancellationToken::new();

    let listener_task = if config.listen {
        match Listener::bind(config.listen_addr(), catalog_handle.clone()).await {
            Ok(listener) => Some(listener.spawn(cancel.child_token())),
            Err(e) => {
                warn!("Replication listener unavailable: {}", e);
                println!("⚠️ Not receiving products from other terminals: {}", e);
                None
            }
        }
    } else {
        info!("Replication listener disabled");
        None
    };

    let entry = ProductEntry::new(
        catalog_handle.clone(),
        images,
        Broadcaster::new(config.broadcast_target()),
        instance_id,
    );
    let shell = Shell::new(
        catalog_handle.clone(),
        entry,
        SalesLedger::open(config.sales_path()),
        CredentialStore::open(config.cashiers_path()),
        Box::new(SpoolPrinter::new(config.receipts_dir())),
        ShellSettings {
            tax_rate: config.tax_rate,
            layout: config.layout.clone(),
            cashier: config.cashier.clone(),
        },
    );

    let arrivals = catalog_handle.subscribe();
    drop(catalog_handle);

    let mut shell_task = tokio::spawn(shell.run(spawn_stdin_reader(), arrivals, cancel.child_token()));

    let mut shell_finished = false;
    tokio::select! {
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down...");
        }
        result = &mut shell_task => {
            result.context("Shell task failed")?;
            shell_finished = true;
        }
    }

    cancel.cancel();
    if !shell_finished {
        shell_task.await.context("Shell task failed")?;
    }
    if let Some(task) = listener_task {
        task.await.context("Listener task failed")?;
    }
    // Every handle is gone now, so the catalog task drains and exits
    catalog_task.await.context("Catalog task failed")?;

    info!("Shutdown complete");
    Ok(())
}

/// Setup logging with tracing
fn setup_logging(level: &str) -> Result<()> {
    let log_level = level.parse::<Level>().unwrap_or(Level::INFO);

    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

/// Load the saved catalog, setting an unreadable file aside
fn load_catalog(store: &JsonCatalogStore) -> Catalog {
    match store.load() {
        Ok(products) => {
            info!("Loaded {} products", products.len());
            Catalog::from_products(products)
        }
        Err(e) => {
            warn!("Failed to load products, starting empty: {}", e);
            if let Err(e) = storage::set_aside(store.path()) {
                warn!("Failed to move unreadable catalog: {}", e);
            }
            Catalog::new()
        }
    }
}

/// Forward stdin lines to the shell
///
/// Blocking reads run on a plain thread so shutdown never waits on the console.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Resolve on Ctrl+C, or SIGTERM on Unix
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => warn!("Failed to setup SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
