//! Product catalog and its persistence
//!
//! # Catalog
//!
//! Ordered in-memory product list, unique by name.
//!
//! # CatalogStore
//!
//! Load/save boundary for the catalog. `JsonCatalogStore` keeps the whole list
//! as one pretty-printed JSON array and rewrites the file on every save. A missing
//! or empty file loads as an empty catalog.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::types::Product;

/// In-memory product list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a loaded list, dropping later records with an already-seen name
    pub fn from_products(products: Vec<Product>) -> Self {
        let mut catalog = Self::new();
        for product in products {
            catalog.insert_if_absent(product);
        }
        catalog
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    /// Exact barcode match; blank codes never match
    pub fn find_by_barcode(&self, code: &str) -> Option<&Product> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        self.products.iter().find(|p| p.barcode == code)
    }

    /// Case-insensitive substring match on name; a blank query returns everything
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.products.iter().collect();
        }
        self.products
            .iter()
            .filter(|p| p.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Append `product` unless its name is taken
    ///
    /// Returns true if inserted.
    pub fn insert_if_absent(&mut self, product: Product) -> bool {
        if self.contains(&product.name) {
            return false;
        }
        self.products.push(product);
        true
    }

    /// Undo an insert (used when persisting it failed)
    pub fn remove(&mut self, name: &str) -> Option<Product> {
        let idx = self.products.iter().position(|p| p.name == name)?;
        Some(self.products.remove(idx))
    }
}

/// Catalog persistence
pub trait CatalogStore: Send {
    /// Load every product, in stored order
    fn load(&self) -> Result<Vec<Product>>;

    /// Replace the stored list
    fn save(&self, products: &[Product]) -> Result<()>;

    /// Append one product unless its name is already stored
    ///
    /// Returns true if the product was added.
    fn add(&self, product: Product) -> Result<bool> {
        let mut products = self.load()?;
        if products.iter().any(|p| p.name == product.name) {
            return Ok(false);
        }
        products.push(product);
        self.save(&products)?;
        Ok(true)
    }
}

/// Catalog kept in a JSON file
#[derive(Debug, Clone)]
pub struct JsonCatalogStore {
    path: PathBuf,
}

impl JsonCatalogStore {
    /// Store at `path`; the file need not exist yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for JsonCatalogStore {
    fn load(&self) -> Result<Vec<Product>> {
        if !self.path.exists() {
            debug!("No catalog at {}, starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&self.path)?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&json).map_err(|e| {
            CoreError::Persistence(format!("Failed to load products from {}: {}", self.path.display(), e))
        })
    }

    fn save(&self, products: &[Product]) -> Result<()> {
        let json = serde_json::to_string_pretty(products)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json).map_err(|e| {
            CoreError::Persistence(format!("Failed to save products to {}: {}", self.path.display(), e))
        })
    }
}

/// Catalog kept in memory, for tests and diskless runs
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    products: Mutex<Vec<Product>>,
    fail_saves: bool,
}

impl MemoryCatalogStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `products`
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
            fail_saves: false,
        }
    }

    /// Store whose saves always fail
    pub fn failing() -> Self {
        Self {
            products: Mutex::new(Vec::new()),
            fail_saves: true,
        }
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn load(&self) -> Result<Vec<Product>> {
        let products = self
            .products
            .lock()
            .map_err(|_| CoreError::Persistence("catalog lock poisoned".into()))?;
        Ok(products.clone())
    }

    fn save(&self, products: &[Product]) -> Result<()> {
        if self.fail_saves {
            return Err(CoreError::Persistence("disk full".into()));
        }
        let mut stored = self
            .products
            .lock()
            .map_err(|_| CoreError::Persistence("catalog lock poisoned".into()))?;
        *stored = products.to_vec();
        Ok(())
    }
}
