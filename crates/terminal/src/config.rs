//! Terminal configuration and data directory layout
//!
//! ## Storage Location
//!
//! Defaults to the platform data directory unless `--data-dir` is given:
//!
//! - **macOS**: `~/Library/Application Support/smartpos/`
//! - **Linux**: `~/.local/share/smartpos/`
//! - **Windows**: `%LOCALAPPDATA%\smartpos\`
//!
//! ## Files
//!
//! - `products.json` - catalog
//! - `sales_data.json` - sales ledger
//! - `cashiers.json` - hashed cashier credentials
//! - `Images/` - product images, shared with peers by file name
//! - `receipts/` - spooled receipt text

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use smartpos_core::{CoreError, ReceiptLayout, Result, IMAGES_DIR};

/// Runtime settings resolved from the command line
#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    /// UDP port shared by broadcaster and listener
    pub port: u16,
    /// Destination address for product broadcasts
    pub broadcast_addr: Ipv4Addr,
    /// Sales tax as a fraction (`0.16`)
    pub tax_rate: Decimal,
    /// Name recorded on sales until someone logs in
    pub cashier: String,
    /// Run the replication listener
    pub listen: bool,
    pub layout: ReceiptLayout,
}

impl AppConfig {
    /// Resolve settings; `data_dir` of `None` means the platform default
    pub fn new(data_dir: Option<PathBuf>, port: u16) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => dirs::data_local_dir()
                .ok_or(CoreError::NoDataDir)?
                .join("smartpos"),
        };

        Ok(Self {
            data_dir,
            port,
            broadcast_addr: Ipv4Addr::BROADCAST,
            tax_rate: smartpos_core::default_tax_rate(),
            cashier: "Admin".to_string(),
            listen: true,
            layout: ReceiptLayout::default(),
        })
    }

    /// Create the data directory tree if missing
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.images_dir())?;
        fs::create_dir_all(self.receipts_dir())?;
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join("products.json")
    }

    pub fn sales_path(&self) -> PathBuf {
        self.data_dir.join("sales_data.json")
    }

    pub fn cashiers_path(&self) -> PathBuf {
        self.data_dir.join("cashiers.json")
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join(IMAGES_DIR)
    }

    pub fn receipts_dir(&self) -> PathBuf {
        self.data_dir.join("receipts")
    }

    /// Address the listener binds (all interfaces)
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Address broadcasts are sent to
    pub fn broadcast_target(&self) -> SocketAddr {
        SocketAddr::from((self.broadcast_addr, self.port))
    }
}
