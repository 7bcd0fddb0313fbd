//! Catalog product

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::DEFAULT_STOCK_QTY;

/// Product available for sale
///
/// `name` is the identity key: the catalog holds at most one product per name.
/// Field aliases accept catalog files written by older PascalCase builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Barcode")]
    pub barcode: String,
    #[serde(alias = "Price")]
    pub price: Decimal,
    /// Image location relative to the data directory (`Images/<file>`), empty if none
    #[serde(default, alias = "ImagePath")]
    pub image_path: String,
    #[serde(default = "default_stock_qty", alias = "StockQty")]
    pub stock_qty: u32,
}

fn default_stock_qty() -> u32 {
    DEFAULT_STOCK_QTY
}

impl Product {
    /// Create product with default stock and no barcode or image
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            barcode: String::new(),
            price,
            image_path: String::new(),
            stock_qty: DEFAULT_STOCK_QTY,
        }
    }

    /// Set barcode
    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = barcode.into();
        self
    }

    /// Set image path
    pub fn with_image_path(mut self, image_path: impl Into<String>) -> Self {
        self.image_path = image_path.into();
        self
    }

    /// Whether two records refer to the same catalog entry
    pub fn same_key(&self, other: &Product) -> bool {
        self.name == other.name
    }
}
